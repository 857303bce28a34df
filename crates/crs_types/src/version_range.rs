use semver::Version;
use serde::{Deserialize, Serialize};

use crate::error::MetaError;

/// A single half-open interval `[low, high)` over semantic versions. `high
/// == None` means unbounded above.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub low: Version,
    pub high: Option<Version>,
}

impl Interval {
    fn contains(&self, v: &Version) -> bool {
        &self.low <= v && self.high.as_ref().map_or(true, |h| v < h)
    }

    fn overlaps_or_touches(&self, other: &Interval) -> bool {
        let self_starts_before_other_ends = match &other.high {
            Some(h) => &self.low < h,
            None => true,
        };
        let other_starts_before_self_ends = match &self.high {
            Some(h) => &other.low <= h,
            None => true,
        };
        self_starts_before_other_ends && other_starts_before_self_ends
    }

    fn merge(&self, other: &Interval) -> Interval {
        let low = self.low.clone().min(other.low.clone());
        let high = match (&self.high, &other.high) {
            (Some(a), Some(b)) => Some(a.clone().max(b.clone())),
            _ => None,
        };
        Interval { low, high }
    }

    fn intersect(&self, other: &Interval) -> Option<Interval> {
        let low = self.low.clone().max(other.low.clone());
        let high = match (&self.high, &other.high) {
            (Some(a), Some(b)) => Some(a.clone().min(b.clone())),
            (Some(a), None) => Some(a.clone()),
            (None, Some(b)) => Some(b.clone()),
            (None, None) => None,
        };
        if let Some(h) = &high {
            if *h <= low {
                return None;
            }
        }
        Some(Interval { low, high })
    }
}

/// A union of half-open version intervals.
///
/// The empty set (no intervals) is legal and means "unsatisfiable". Kept
/// normalized: intervals are sorted and any overlapping or touching
/// intervals are merged, so two equal sets always have equal
/// representations.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VersionRangeSet {
    intervals: Vec<Interval>,
}

impl VersionRangeSet {
    /// The empty (unsatisfiable) set.
    pub fn empty() -> Self {
        Self { intervals: vec![] }
    }

    /// A single interval `[low, high)`.
    pub fn single(low: Version, high: Option<Version>) -> Self {
        if let Some(h) = &high {
            if *h <= low {
                return Self::empty();
            }
        }
        Self {
            intervals: vec![Interval { low, high }],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn contains(&self, v: &Version) -> bool {
        self.intervals.iter().any(|iv| iv.contains(v))
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// If this set is exactly one interval, returns it.
    pub fn as_single_interval(&self) -> Option<&Interval> {
        match self.intervals.as_slice() {
            [single] => Some(single),
            _ => None,
        }
    }

    pub fn union(&self, other: &VersionRangeSet) -> VersionRangeSet {
        let mut all: Vec<Interval> = self
            .intervals
            .iter()
            .chain(other.intervals.iter())
            .cloned()
            .collect();
        all.sort_by(|a, b| a.low.cmp(&b.low));

        let mut merged: Vec<Interval> = Vec::with_capacity(all.len());
        for iv in all {
            match merged.last_mut() {
                Some(last) if last.overlaps_or_touches(&iv) => {
                    *last = last.merge(&iv);
                }
                _ => merged.push(iv),
            }
        }
        VersionRangeSet { intervals: merged }
    }

    pub fn intersection(&self, other: &VersionRangeSet) -> VersionRangeSet {
        let mut out = Vec::new();
        for a in &self.intervals {
            for b in &other.intervals {
                if let Some(iv) = a.intersect(b) {
                    out.push(iv);
                }
            }
        }
        out.sort_by(|a, b| a.low.cmp(&b.low));
        VersionRangeSet { intervals: out }
    }
}

/// The operators recognized by the dependency shorthand grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOp {
    /// `=`: exact patch-level match.
    Eq,
    /// `@`: normalizes to `^` before any further processing.
    At,
    /// `^`: compatible-with (same leftmost nonzero component).
    Caret,
    /// `~`: patch-compatible.
    Tilde,
    /// `+`: this version or greater, unbounded above.
    Plus,
}

impl RangeOp {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '=' => Some(Self::Eq),
            '@' => Some(Self::At),
            '^' => Some(Self::Caret),
            '~' => Some(Self::Tilde),
            '+' => Some(Self::Plus),
            _ => None,
        }
    }

    /// The canonical operator char after `@ -> ^` normalization.
    pub fn canonical_char(self) -> char {
        match self {
            Self::Eq => '=',
            Self::At | Self::Caret => '^',
            Self::Tilde => '~',
            Self::Plus => '+',
        }
    }
}

/// A version with 1-3 components, as accepted by the restricted range
/// grammar (`^1`, `^1.2`, `^1.2.3`, but not pre-release/build suffixes).
#[derive(Debug, Clone, Copy)]
pub struct PartialVersion {
    pub major: u64,
    pub minor: Option<u64>,
    pub patch: Option<u64>,
}

impl PartialVersion {
    pub fn parse(s: &str) -> Result<Self, MetaError> {
        let mut parts = s.split('.');
        let parse_component = |part: &str| -> Result<u64, MetaError> {
            part.parse::<u64>().map_err(|_| MetaError::InvalidDepShorthand {
                input: s.to_string(),
                reason: format!("'{part}' is not a non-negative integer version component"),
            })
        };
        let major_str = parts
            .next()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| MetaError::InvalidDepShorthand {
                input: s.to_string(),
                reason: "version must start with a numeric major component".to_string(),
            })?;
        let major = parse_component(major_str)?;
        let minor = parts.next().map(parse_component).transpose()?;
        let patch = parts.next().map(parse_component).transpose()?;
        if parts.next().is_some() {
            return Err(MetaError::InvalidDepShorthand {
                input: s.to_string(),
                reason: "version has too many dot-separated components".to_string(),
            });
        }
        Ok(Self {
            major,
            minor,
            patch,
        })
    }

    fn low(&self) -> Version {
        Version::new(self.major, self.minor.unwrap_or(0), self.patch.unwrap_or(0))
    }
}

/// Bumps the leftmost nonzero of `(major, minor, patch)` and zeroes
/// everything after it; `0.0.0` bumps the patch. This is the caret (`^`)
/// growth rule, and is also used as the fallback for `~`/`=` when only a
/// major component was given.
fn caret_bump(major: u64, minor: u64, patch: u64) -> Version {
    if major > 0 {
        Version::new(major + 1, 0, 0)
    } else if minor > 0 {
        Version::new(0, minor + 1, 0)
    } else {
        Version::new(0, 0, patch + 1)
    }
}

/// Expands a `(RangeOp, PartialVersion)` pair into the `VersionRangeSet` it
/// denotes, per the restricted-semver range grammar in §4.A.
pub fn expand_range(op: RangeOp, pv: &PartialVersion) -> VersionRangeSet {
    let low = pv.low();
    let (major, minor, patch) = major_minor_patch(&low);
    let high = match op {
        RangeOp::Eq => {
            if pv.patch.is_some() {
                Some(Version::new(major, minor, patch + 1))
            } else if pv.minor.is_some() {
                Some(Version::new(major, minor + 1, 0))
            } else {
                Some(Version::new(major + 1, 0, 0))
            }
        }
        RangeOp::At | RangeOp::Caret => Some(caret_bump(major, minor, patch)),
        RangeOp::Tilde => {
            if pv.minor.is_some() || pv.patch.is_some() {
                Some(Version::new(major, minor + 1, 0))
            } else {
                Some(Version::new(major + 1, 0, 0))
            }
        }
        RangeOp::Plus => None,
    };
    VersionRangeSet::single(low, high)
}

fn major_minor_patch(v: &Version) -> (u64, u64, u64) {
    (v.major, v.minor, v.patch)
}
