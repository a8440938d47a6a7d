//! Wire payloads exchanged with the Convoq analysis service.
//!
//! These types mirror what the service actually sends, including legacy and
//! partially populated shapes. They carry no behaviour beyond parsing; the
//! canonical view model lives in `convoq-core`.

use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub mod date_format;
pub mod usage;

pub use date_format::DateFormat;
pub use usage::{RateLimiting, TokenCounting, UsageStats};

pub const PROTOCOL_SCHEMA_VERSION: u32 = 1;

/// Opaque analysis identifier.
///
/// The service emits it either as a JSON string or as an integer row id; both
/// are carried as a string and sent back verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, JsonSchema)]
#[serde(transparent)]
pub struct AnalysisId(String);

impl AnalysisId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AnalysisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for AnalysisId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Signed(i64),
            Unsigned(u64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(text) => Self(text),
            Raw::Signed(n) => Self(n.to_string()),
            Raw::Unsigned(n) => Self(n.to_string()),
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct RawToxicity {
    #[serde(default)]
    pub toxicity_rate: Option<f64>,
    /// `"normal"` or `"locked"`; absent on older service builds.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toxic_count: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct RawSentimentPoint {
    pub date: String,
    pub avg_sentiment: f64,
}

/// Sentiment section as stored over time: newer records nest the timeline,
/// older ones store the list directly.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
#[serde(untagged)]
pub enum RawSentiment {
    Nested {
        #[serde(default)]
        timeline: Vec<RawSentimentPoint>,
    },
    Flat(Vec<RawSentimentPoint>),
}

impl RawSentiment {
    pub fn into_points(self) -> Vec<RawSentimentPoint> {
        match self {
            Self::Nested { timeline } => timeline,
            Self::Flat(points) => points,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct RawReplyGap {
    pub minutes: f64,
    #[serde(default)]
    pub from: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct RawPeakHour {
    pub hour: i64,
    pub count: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default, JsonSchema)]
pub struct RawReplyTimes {
    #[serde(default)]
    pub avg_reply_time: BTreeMap<String, f64>,
    #[serde(default)]
    pub fastest_reply: Option<RawReplyGap>,
    #[serde(default)]
    pub longest_ghosting: Option<RawReplyGap>,
    #[serde(default)]
    pub peak_hours: Vec<RawPeakHour>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct RawSemanticEvent {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub sentiment_score: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default, JsonSchema)]
pub struct RawSemanticAnalysis {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub events: Vec<RawSemanticEvent>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default, JsonSchema)]
pub struct RawTrendAnalysis {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub decision: Option<String>,
    #[serde(default)]
    pub decision_color: Option<String>,
    #[serde(default)]
    pub reasons: Vec<String>,
    #[serde(default)]
    pub metrics_delta: BTreeMap<String, f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default, JsonSchema)]
pub struct RawDecisionAdvice {
    #[serde(default)]
    pub advice: Vec<String>,
    #[serde(default)]
    pub reply_suggestions: Vec<String>,
}

/// The analysis body shared by fast results and the `full_data` /
/// `analysis_results` sub-structures of history records. Every field is
/// optional on the wire.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default, JsonSchema)]
pub struct AnalysisBody {
    #[serde(default)]
    pub total_messages: Option<u64>,
    #[serde(default)]
    pub health_score: Option<f64>,
    #[serde(default)]
    pub persona_tag: Option<String>,
    #[serde(default)]
    pub toxicity: Option<RawToxicity>,
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default)]
    pub initiations: BTreeMap<String, u64>,
    #[serde(default)]
    pub features: BTreeMap<String, f64>,
    #[serde(default)]
    pub sentiment: Option<RawSentiment>,
    /// Legacy flat location of the sentiment timeline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment_timeline: Option<Vec<RawSentimentPoint>>,
    #[serde(default)]
    pub reply_times: Option<RawReplyTimes>,
    #[serde(default)]
    pub coach_summary: Option<String>,
    #[serde(default)]
    pub semantic_analysis: Option<RawSemanticAnalysis>,
    #[serde(default)]
    pub trend_analysis: Option<RawTrendAnalysis>,
    #[serde(default)]
    pub decision_advice: Option<RawDecisionAdvice>,
    #[serde(default)]
    pub analysis_status: Option<String>,
}

/// Response of `POST /analyze/fast`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct FastResult {
    #[serde(flatten)]
    pub body: AnalysisBody,
    #[serde(default)]
    pub cache_key: Option<String>,
    #[serde(default)]
    pub analysis_id: Option<AnalysisId>,
}

/// Response of `POST /analyze/deep`: a subset of the view model fields.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default, JsonSchema)]
pub struct DeepMergeResult {
    #[serde(default)]
    pub health_score: Option<f64>,
    #[serde(default)]
    pub persona_tag: Option<String>,
    #[serde(default)]
    pub toxicity: Option<RawToxicity>,
    #[serde(default)]
    pub features: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    pub coach_summary: Option<String>,
    #[serde(default)]
    pub semantic_analysis: Option<RawSemanticAnalysis>,
    #[serde(default)]
    pub trend_analysis: Option<RawTrendAnalysis>,
    #[serde(default)]
    pub decision_advice: Option<RawDecisionAdvice>,
}

/// Body of `POST /analyze/deep`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct DeepAnalysisRequest {
    pub cache_key: String,
    pub analysis_id: AnalysisId,
}

/// One entry of `GET /history`.
///
/// The embedded sub-structures are kept as raw JSON so a single malformed
/// record does not poison the whole listing; they are decoded when the record
/// is selected.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default, JsonSchema)]
pub struct HistoricalRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<AnalysisId>,
    #[serde(default)]
    pub total_messages: Option<u64>,
    #[serde(default)]
    pub health_score: Option<f64>,
    #[serde(default)]
    pub persona_tag: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub full_data: Option<serde_json::Value>,
    #[serde(default)]
    pub analysis_results: Option<serde_json::Value>,
}

/// Error body produced by the service on non-2xx responses.
#[derive(Debug, Serialize, Deserialize, Clone, Default, JsonSchema)]
pub struct ServiceErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ServiceErrorBody {
    pub fn message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            serde_json::Value::String(text) => Some(text.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

pub fn serialize_json_pretty<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(Into::into)
}
