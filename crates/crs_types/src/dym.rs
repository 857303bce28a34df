//! "Did you mean?" suggestions for near-miss identifiers.
//!
//! Grounded on the original implementation's `dym.hpp`: find the known
//! string with the smallest Levenshtein edit distance to an unrecognized
//! one, for use in unknown-manifest-key and no-such-package/library errors.

/// Levenshtein edit distance between two strings, counted in `char`s.
pub fn lev_edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0usize; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        cur[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            cur[j + 1] = (prev[j + 1] + 1).min(cur[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// Returns the candidate closest to `given` by edit distance, or `None` if
/// `candidates` is empty.
pub fn did_you_mean<'a>(
    given: &str,
    candidates: impl IntoIterator<Item = &'a str>,
) -> Option<String> {
    candidates
        .into_iter()
        .min_by_key(|candidate| lev_edit_distance(candidate, given))
        .map(str::to_owned)
}
