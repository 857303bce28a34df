//! Maps a source file's path to its compilation kind by extension, with a
//! secondary `.test` / `.main` stem-suffix rule distinguishing translation
//! units that are tests, apps, or plain library sources.

use std::path::{Path, PathBuf};
use std::sync::Once;

/// What a recognised extension tells us about a file, before the
/// `.test`/`.main` stem rule is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExtensionKind {
    Header,
    HeaderImpl,
    TranslationUnit,
}

/// The fully resolved kind of a classified source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Header,
    HeaderImpl,
    /// A translation unit whose stem ends in `.test`.
    Test,
    /// A translation unit whose stem ends in `.main`.
    App,
    /// A translation unit that is neither a test nor an app entry point.
    Source,
}

/// Sorted (by extension, ascending) so lookup can binary-search; sortedness
/// is asserted once at first use rather than trusted.
const EXTENSION_TABLE: &[(&str, ExtensionKind)] = &[
    ("c", ExtensionKind::TranslationUnit),
    ("c++", ExtensionKind::TranslationUnit),
    ("cc", ExtensionKind::TranslationUnit),
    ("cpp", ExtensionKind::TranslationUnit),
    ("cxx", ExtensionKind::TranslationUnit),
    ("h", ExtensionKind::Header),
    ("h++", ExtensionKind::Header),
    ("hh", ExtensionKind::Header),
    ("hpp", ExtensionKind::Header),
    ("hxx", ExtensionKind::Header),
    ("inc", ExtensionKind::HeaderImpl),
    ("inl", ExtensionKind::HeaderImpl),
    ("ipp", ExtensionKind::HeaderImpl),
];

static SORT_CHECK: Once = Once::new();

fn ensure_table_sorted() {
    SORT_CHECK.call_once(|| {
        assert!(
            EXTENSION_TABLE.windows(2).all(|w| w[0].0 < w[1].0),
            "EXTENSION_TABLE must be sorted and free of duplicates"
        );
    });
}

fn lookup_extension(ext: &str) -> Option<ExtensionKind> {
    ensure_table_sorted();
    EXTENSION_TABLE
        .binary_search_by(|(candidate, _)| candidate.cmp(&ext))
        .ok()
        .map(|idx| EXTENSION_TABLE[idx].1)
}

/// Classifies a path by its extension (matched case-insensitively, so
/// uppercase variants like `.CPP` resolve the same as `.cpp`) and, for
/// translation units, its stem suffix. Returns `None` for unrecognised
/// extensions.
pub fn classify(path: &Path) -> Option<SourceKind> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match lookup_extension(&ext)? {
        ExtensionKind::Header => Some(SourceKind::Header),
        ExtensionKind::HeaderImpl => Some(SourceKind::HeaderImpl),
        ExtensionKind::TranslationUnit => {
            let stem = path.file_stem()?.to_str()?;
            if stem.ends_with(".test") {
                Some(SourceKind::Test)
            } else if stem.ends_with(".main") {
                Some(SourceKind::App)
            } else {
                Some(SourceKind::Source)
            }
        }
    }
}

/// A classified source file: its absolute path, the basis path it is
/// reported relative to (a library root, typically), and its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub absolute_path: PathBuf,
    pub basis_path: PathBuf,
    pub kind: SourceKind,
}

/// Classifies `absolute_path` and, if recognised, pairs it with
/// `basis_path` into a [`SourceFile`].
pub fn classify_file(absolute_path: impl Into<PathBuf>, basis_path: impl Into<PathBuf>) -> Option<SourceFile> {
    let absolute_path = absolute_path.into();
    let kind = classify(&absolute_path)?;
    Some(SourceFile {
        absolute_path,
        basis_path: basis_path.into(),
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("foo.h", Some(SourceKind::Header))]
    #[case("foo.HPP", Some(SourceKind::Header))]
    #[case("foo.inl", Some(SourceKind::HeaderImpl))]
    #[case("foo.cpp", Some(SourceKind::Source))]
    #[case("foo.test.cpp", Some(SourceKind::Test))]
    #[case("foo.main.cc", Some(SourceKind::App))]
    #[case("foo.test.main.cpp", Some(SourceKind::App))]
    #[case("foo.rs", None)]
    #[case("foo", None)]
    fn classifies_by_extension_and_stem(#[case] name: &str, #[case] expected: Option<SourceKind>) {
        assert_eq!(classify(Path::new(name)), expected);
    }

    #[test]
    fn extension_table_is_actually_sorted() {
        ensure_table_sorted();
    }

    #[test]
    fn classify_file_carries_basis_and_kind() {
        let sf = classify_file("/abs/src/foo.cpp", "src/foo.cpp").unwrap();
        assert_eq!(sf.kind, SourceKind::Source);
        assert_eq!(sf.basis_path, PathBuf::from("src/foo.cpp"));
    }

    #[test]
    fn unrecognised_extension_yields_no_source_file() {
        assert!(classify_file("/abs/src/foo.rs", "src/foo.rs").is_none());
    }
}
