use crate::disclosure::DisclosureEngine;
use crate::error::Result;
use crate::normalize::normalize_history;
use crate::schema::AnalysisViewModel;
use convoq_protocol::HistoricalRecord;
use serde::Serialize;

impl DisclosureEngine {
    /// Replaces the current view with a stored analysis. History is always
    /// complete, so the engine goes straight to `DeepUnlocked` and any live
    /// token is discarded. A corrupt record leaves the engine untouched.
    pub fn select_history(&mut self, record: &HistoricalRecord) -> Result<&AnalysisViewModel> {
        let view = match normalize_history(record) {
            Ok(view) => view,
            Err(err) => {
                log::warn!(
                    "history record {} rejected: {err}",
                    record
                        .id
                        .as_ref()
                        .map_or_else(|| "<unknown>".to_string(), ToString::to_string)
                );
                return Err(err);
            }
        };
        Ok(self.install_unlocked(view))
    }
}

/// A row of the history listing, read straight from the stored summary
/// fields without decoding the embedded results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub id: Option<String>,
    pub created_at: Option<String>,
    pub persona_tag: Option<String>,
    pub total_messages: Option<u64>,
    pub health_score: Option<f64>,
}

impl HistoryEntry {
    pub fn from_record(record: &HistoricalRecord) -> Self {
        Self {
            id: record.id.as_ref().map(ToString::to_string),
            created_at: record.created_at.clone(),
            persona_tag: record.persona_tag.clone(),
            total_messages: record.total_messages,
            health_score: record.health_score,
        }
    }

    /// Calendar date of `created_at` (the part before any `T` or space).
    pub fn created_date(&self) -> Option<&str> {
        let raw = self.created_at.as_deref()?.trim();
        let date = raw.split(['T', ' ']).next().unwrap_or(raw);
        (!date.is_empty()).then_some(date)
    }
}
