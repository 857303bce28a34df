use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use crs_types::{PackageInfo, VersionRangeSet};
use resolvo::VersionSet;

/// Wraps a [`VersionRangeSet`] so it can be used as a `resolvo` version
/// set. The lifetime ties it to the borrowed [`PackageInfo`] candidates it
/// is matched against, mirroring how a borrowed solver input is normally
/// threaded through a `resolvo` pool.
#[derive(Debug, Clone)]
pub struct DependencyRange<'a> {
    range: VersionRangeSet,
    _marker: PhantomData<&'a PackageInfo>,
}

impl<'a> DependencyRange<'a> {
    pub fn new(range: VersionRangeSet) -> Self {
        Self {
            range,
            _marker: PhantomData,
        }
    }
}

impl PartialEq for DependencyRange<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.range == other.range
    }
}
impl Eq for DependencyRange<'_> {}

impl Hash for DependencyRange<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for iv in self.range.intervals() {
            iv.low.to_string().hash(state);
            iv.high.as_ref().map(ToString::to_string).hash(state);
        }
    }
}

impl fmt::Display for DependencyRange<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.range.as_single_interval() {
            Some(iv) => match &iv.high {
                Some(high) => write!(f, "[{}, {})", iv.low, high),
                None => write!(f, ">={}", iv.low),
            },
            None => write!(f, "{:?}", self.range),
        }
    }
}

/// A candidate package version in the solver's pool: a [`PackageInfo`]
/// ordered by `(version, revision)`, the axes of the "higher version wins,
/// then higher revision" tie-break.
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct CandidateRecord<'a>(pub &'a PackageInfo);

impl Ord for CandidateRecord<'_> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0
            .id()
            .version
            .cmp(&other.0.id().version)
            .then_with(|| self.0.id().revision.cmp(&other.0.id().revision))
    }
}

impl PartialOrd for CandidateRecord<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for CandidateRecord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.id())
    }
}

impl<'a> VersionSet for DependencyRange<'a> {
    type V = CandidateRecord<'a>;

    fn contains(&self, v: &Self::V) -> bool {
        self.range.contains(&v.0.id().version)
    }
}
