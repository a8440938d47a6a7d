use crate::error::{Result, ViewError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Whether the deep tier has been folded into a view model.
///
/// Ordered so that a lineage can only move forward: `PendingDeep < Complete`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    PendingDeep,
    Complete,
}

impl AnalysisStatus {
    /// Moves toward `next` without ever going backwards.
    #[must_use]
    pub fn advance(self, next: AnalysisStatus) -> AnalysisStatus {
        self.max(next)
    }
}

/// Toxicity section. The rate is only meaningful while `normal`; a locked
/// section carries no number at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Toxicity {
    Normal { toxicity_rate: f64 },
    Locked,
}

impl Toxicity {
    pub fn rate(&self) -> Option<f64> {
        match self {
            Self::Normal { toxicity_rate } => Some(*toxicity_rate),
            Self::Locked => None,
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Locked)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SentimentPoint {
    pub date: String,
    pub avg_sentiment: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Sentiment {
    pub timeline: Vec<SentimentPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReplyGap {
    pub minutes: f64,
    pub from: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PeakHour {
    pub hour: u8,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ReplyTimes {
    pub avg_reply_time: BTreeMap<String, f64>,
    pub fastest_reply: Option<ReplyGap>,
    pub longest_ghosting: Option<ReplyGap>,
    pub peak_hours: Vec<PeakHour>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SemanticEvent {
    pub timestamp: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub summary: Option<String>,
    pub sentiment_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct SemanticAnalysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub events: Vec<SemanticEvent>,
}

/// Trend section. `Locked` means the deep tier has not produced it yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrendAnalysis {
    Locked,
    Ready {
        decision: String,
        decision_color: String,
        reasons: Vec<String>,
        #[serde(default)]
        metrics_delta: BTreeMap<String, f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct DecisionAdvice {
    pub advice: Vec<String>,
    pub reply_suggestions: Vec<String>,
}

/// The canonical view model every payload is reconciled into.
///
/// Instances are never edited in place by the engine: a transition produces a
/// new value and swaps it in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisViewModel {
    pub total_messages: u64,
    pub health_score: f64,
    pub persona_tag: Option<String>,
    pub toxicity: Toxicity,
    /// Display order is significant and preserved from the source payload.
    pub participants: Vec<String>,
    pub initiations: BTreeMap<String, u64>,
    pub features: BTreeMap<String, f64>,
    pub sentiment: Sentiment,
    pub reply_times: ReplyTimes,
    pub coach_summary: String,
    pub semantic_analysis: SemanticAnalysis,
    pub trend_analysis: Option<TrendAnalysis>,
    pub decision_advice: Option<DecisionAdvice>,
    pub analysis_status: AnalysisStatus,
}

impl AnalysisViewModel {
    pub fn is_complete(&self) -> bool {
        self.analysis_status == AnalysisStatus::Complete
    }

    /// Checks the canonical invariants. The normalizer repairs service data
    /// before calling this, so a failure here is a bug rather than bad input.
    pub fn check_invariants(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.participants.len());
        for name in &self.participants {
            if !seen.insert(name.as_str()) {
                return Err(ViewError::invariant(format!(
                    "participant '{name}' listed twice"
                )));
            }
        }

        if let Some(key) = self.initiations.keys().find(|k| !seen.contains(k.as_str())) {
            return Err(ViewError::invariant(format!(
                "initiations key '{key}' is not a participant"
            )));
        }
        if let Some(key) = self
            .reply_times
            .avg_reply_time
            .keys()
            .find(|k| !seen.contains(k.as_str()))
        {
            return Err(ViewError::invariant(format!(
                "avg_reply_time key '{key}' is not a participant"
            )));
        }

        if !(0.0..=100.0).contains(&self.health_score) {
            return Err(ViewError::invariant(format!(
                "health_score {} outside [0, 100]",
                self.health_score
            )));
        }
        if let Some(rate) = self.toxicity.rate() {
            if !(0.0..=1.0).contains(&rate) {
                return Err(ViewError::invariant(format!(
                    "toxicity_rate {rate} outside [0, 1]"
                )));
            }
        }
        if let Some((name, score)) = self
            .features
            .iter()
            .find(|(_, score)| !(0.0..=1.0).contains(*score))
        {
            return Err(ViewError::invariant(format!(
                "feature '{name}' score {score} outside [0, 1]"
            )));
        }

        for pair in self.sentiment.timeline.windows(2) {
            if pair[0].date >= pair[1].date {
                return Err(ViewError::invariant(format!(
                    "sentiment timeline not strictly ascending at '{}'",
                    pair[1].date
                )));
            }
        }

        if let Some(peak) = self.reply_times.peak_hours.iter().find(|p| p.hour > 23) {
            return Err(ViewError::invariant(format!(
                "peak hour {} outside 0-23",
                peak.hour
            )));
        }

        Ok(())
    }
}
