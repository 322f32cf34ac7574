use std::fmt;

/// Why a package document was fetched but not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Any status other than 200, 304 and 404.
    Status(u16),
    ContentType,
    ChecksumMismatch,
    Undecodable,
    /// The document decoded but does not mention the package.
    MissingPackage,
}

/// Result of one per-package fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Applied to state; `refs` dist references were merged.
    Updated { refs: usize },
    NotModified,
    /// 404; the package is now in the not-found set.
    NotFound,
    Skipped(SkipReason),
    /// Transport failed on every attempt. Nothing changed.
    TransientFailure,
}

impl fmt::Display for FetchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchOutcome::Updated { refs } => write!(f, "updated ({refs} refs)"),
            FetchOutcome::NotModified => write!(f, "not modified"),
            FetchOutcome::NotFound => write!(f, "not found"),
            FetchOutcome::Skipped(SkipReason::Status(status)) => write!(f, "skipped (HTTP {status})"),
            FetchOutcome::Skipped(reason) => write!(f, "skipped ({reason:?})"),
            FetchOutcome::TransientFailure => write!(f, "transient failure"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
    pub updated:      usize,
    pub not_modified: usize,
    pub not_found:    usize,
    pub skipped:      usize,
    pub checksum:     usize,
    pub transient:    usize,
}

impl OutcomeCounts {
    pub fn record(&mut self, outcome: FetchOutcome) {
        match outcome {
            FetchOutcome::Updated { .. } => self.updated += 1,
            FetchOutcome::NotModified => self.not_modified += 1,
            FetchOutcome::NotFound => self.not_found += 1,
            FetchOutcome::Skipped(SkipReason::ChecksumMismatch) => self.checksum += 1,
            FetchOutcome::Skipped(_) => self.skipped += 1,
            FetchOutcome::TransientFailure => self.transient += 1,
        }
    }

    pub fn merge(&mut self, other: OutcomeCounts) {
        self.updated += other.updated;
        self.not_modified += other.not_modified;
        self.not_found += other.not_found;
        self.skipped += other.skipped;
        self.checksum += other.checksum;
        self.transient += other.transient;
    }

    pub fn total(&self) -> usize {
        self.updated
            + self.not_modified
            + self.not_found
            + self.skipped
            + self.checksum
            + self.transient
    }
}

impl FromIterator<FetchOutcome> for OutcomeCounts {
    fn from_iter<I: IntoIterator<Item = FetchOutcome>>(iter: I) -> Self {
        let mut counts = OutcomeCounts::default();
        for outcome in iter {
            counts.record(outcome);
        }
        counts
    }
}
