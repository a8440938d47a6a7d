//! Read-only derivations the dashboard panels render from a view model.

use crate::schema::{AnalysisStatus, AnalysisViewModel, TrendAnalysis};
use convoq_protocol::{RateLimiting, TokenCounting, UsageStats};
use serde::Serialize;

const NOT_ENOUGH_DATA: &str = "Not Enough Data";
const TOXICITY_FLAG_RATE: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionColor {
    Green,
    Yellow,
    Red,
}

impl DecisionColor {
    /// Unknown colours render as green.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "yellow" => Self::Yellow,
            "red" => Self::Red,
            _ => Self::Green,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionPanel {
    pub decision: String,
    pub color: DecisionColor,
    pub reasons: Vec<String>,
    pub advice: Vec<String>,
    pub reply_suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "panel", rename_all = "snake_case")]
pub enum TrendPanel {
    Locked,
    NotEnoughData,
    Decision(DecisionPanel),
}

impl TrendPanel {
    pub fn from_view(view: &AnalysisViewModel) -> Self {
        if view.analysis_status == AnalysisStatus::PendingDeep {
            return Self::Locked;
        }
        match &view.trend_analysis {
            Some(TrendAnalysis::Locked) => Self::Locked,
            None => Self::NotEnoughData,
            Some(TrendAnalysis::Ready { decision, .. }) if decision == NOT_ENOUGH_DATA => {
                Self::NotEnoughData
            }
            Some(TrendAnalysis::Ready {
                decision,
                decision_color,
                reasons,
                ..
            }) => {
                let advice = view.decision_advice.clone().unwrap_or_default();
                Self::Decision(DecisionPanel {
                    decision: decision.clone(),
                    color: DecisionColor::parse(decision_color),
                    reasons: reasons.clone(),
                    advice: advice.advice,
                    reply_suggestions: advice.reply_suggestions,
                })
            }
        }
    }
}

/// Category of a semantic tension event, derived from its free-form type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Conflict,
    Banter,
    Vent,
    Intense,
}

impl EventKind {
    pub fn classify(kind: Option<&str>) -> Self {
        match kind.map(|k| k.trim().to_ascii_lowercase()).as_deref() {
            Some("quarrel" | "conflict") => Self::Conflict,
            Some("banter" | "joking") => Self::Banter,
            Some("vent") => Self::Vent,
            _ => Self::Intense,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Conflict => "Possible conflict",
            Self::Banter => "Playful roasting",
            Self::Vent => "Venting",
            Self::Intense => "Intense moment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverviewFlags {
    /// `None` while toxicity is locked.
    pub toxicity_percent: Option<f64>,
    pub toxicity_flagged: bool,
}

impl OverviewFlags {
    pub fn from_view(view: &AnalysisViewModel) -> Self {
        let rate = view.toxicity.rate();
        Self {
            toxicity_percent: rate.map(|r| r * 100.0),
            toxicity_flagged: rate.is_some_and(|r| r > TOXICITY_FLAG_RATE),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaLevel {
    Ok,
    Warning,
    Exhausted,
}

impl QuotaLevel {
    pub fn for_requests(limits: &RateLimiting) -> Self {
        if limits.requests_this_minute >= limits.minute_limit {
            Self::Exhausted
        } else if (limits.requests_today as f64) >= (limits.daily_limit as f64) * 0.85 {
            Self::Warning
        } else {
            Self::Ok
        }
    }

    pub fn for_tokens(tokens: &TokenCounting) -> Self {
        if tokens.usage_percentage > 85.0 {
            Self::Exhausted
        } else if tokens.usage_percentage > 70.0 {
            Self::Warning
        } else {
            Self::Ok
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaPanel {
    pub requests: QuotaLevel,
    pub tokens: QuotaLevel,
}

impl QuotaPanel {
    pub fn from_usage(usage: &UsageStats) -> Self {
        Self {
            requests: QuotaLevel::for_requests(&usage.rate_limiting),
            tokens: QuotaLevel::for_tokens(&usage.token_counting),
        }
    }
}
