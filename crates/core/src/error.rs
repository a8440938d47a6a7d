use thiserror::Error;

pub type Result<T> = std::result::Result<T, ViewError>;

/// Errors raised while building or transitioning a view model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ViewError {
    /// A history record is missing required fields or its results sub-structure.
    #[error("Corrupt history record: {reason}")]
    CorruptRecord { reason: String },

    /// A fast result lacks the fields every view model requires.
    #[error("Incomplete fast result: {reason}")]
    IncompleteFastResult { reason: String },

    /// A deep scan was requested outside the one state that allows it.
    #[error("Deep scan not eligible: {0}")]
    NotEligible(Ineligibility),

    /// A produced view model broke one of the canonical invariants.
    #[error("View model invariant violated: {0}")]
    Invariant(String),
}

impl ViewError {
    pub fn corrupt(reason: impl Into<String>) -> Self {
        Self::CorruptRecord {
            reason: reason.into(),
        }
    }

    pub fn incomplete(reason: impl Into<String>) -> Self {
        Self::IncompleteFastResult {
            reason: reason.into(),
        }
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }

    pub fn is_not_eligible(&self) -> bool {
        matches!(self, Self::NotEligible(_))
    }
}

/// Why a deep scan request was rejected.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ineligibility {
    #[error("no analysis loaded")]
    NoData,

    #[error("fast result carried no correlation token")]
    MissingToken,

    #[error("deep metrics already unlocked")]
    AlreadyUnlocked,

    #[error("a deep scan is already in flight")]
    InFlight,
}
