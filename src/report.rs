//! Payload plus non-fatal advisories.
//!
//! Search operations report expected operational gaps (an empty swath for a
//! sounding, a refinement with no sounder data, ...) next to their payload instead
//! of failing the whole batch. Contract violations still surface as
//! [`RotcolError`](crate::rotcol_errors::RotcolError).

use std::fmt;

/// Category of a non-fatal advisory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdvisoryKind {
    /// No scan of the swath had its mid time inside the tolerance window of a sounding.
    NoCandidateScans,
    /// Refinement of a collocation found no sounder data around its time.
    NoSounderData,
    /// The search was called without any sounding.
    EmptyBatch,
}

/// One non-fatal remark attached to a [`Report`].
#[derive(Debug, Clone, PartialEq)]
pub struct Advisory {
    pub kind: AdvisoryKind,
    pub detail: String,
}

impl Advisory {
    pub fn new(kind: AdvisoryKind, detail: impl Into<String>) -> Self {
        Advisory {
            kind,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.detail)
    }
}

/// Successful result of a batch operation, with the advisories collected on the way.
#[derive(Debug, Clone)]
pub struct Report<T> {
    pub data: T,
    pub advisories: Vec<Advisory>,
}

impl<T> Report<T> {
    pub fn new(data: T) -> Self {
        Report {
            data,
            advisories: Vec::new(),
        }
    }

    pub fn with_advisories(data: T, advisories: Vec<Advisory>) -> Self {
        Report { data, advisories }
    }

    pub fn push(&mut self, kind: AdvisoryKind, detail: impl Into<String>) {
        self.advisories.push(Advisory::new(kind, detail));
    }

    /// Number of advisories of the given kind.
    pub fn count(&self, kind: AdvisoryKind) -> usize {
        self.advisories.iter().filter(|a| a.kind == kind).count()
    }

    pub fn into_data(self) -> T {
        self.data
    }
}
