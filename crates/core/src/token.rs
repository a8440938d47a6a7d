use convoq_protocol::{AnalysisId, DeepAnalysisRequest};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The `(cache_key, analysis_id)` pair returned by a fast analysis. It
/// authorizes exactly one deep analysis of that result and is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationToken {
    cache_key: String,
    analysis_id: AnalysisId,
}

impl CorrelationToken {
    /// Builds a token from the keys of a fast result. Both halves must be
    /// present and non-blank.
    pub fn from_parts(cache_key: Option<&str>, analysis_id: Option<&AnalysisId>) -> Option<Self> {
        let cache_key = cache_key.map(str::trim).filter(|key| !key.is_empty())?;
        let analysis_id = analysis_id.filter(|id| !id.as_str().trim().is_empty())?;
        Some(Self {
            cache_key: cache_key.to_string(),
            analysis_id: analysis_id.clone(),
        })
    }

    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    pub fn analysis_id(&self) -> &AnalysisId {
        &self.analysis_id
    }

    pub fn to_request(&self) -> DeepAnalysisRequest {
        DeepAnalysisRequest {
            cache_key: self.cache_key.clone(),
            analysis_id: self.analysis_id.clone(),
        }
    }
}

/// Monotonic lineage counter. A deep response tagged with an older generation
/// than the engine's current one is stale.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    JsonSchema,
)]
#[serde(transparent)]
pub struct Generation(u64);

impl Generation {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handed out by an accepted deep-scan request; the response must be delivered
/// back with the same generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeepTicket {
    pub token: CorrelationToken,
    pub generation: Generation,
}
