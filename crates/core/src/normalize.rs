//! Payload normalizer: one function per wire shape, each producing an
//! [`AnalysisViewModel`] that satisfies the canonical invariants.

use crate::error::{Result, ViewError};
use crate::schema::{
    AnalysisStatus, AnalysisViewModel, DecisionAdvice, PeakHour, ReplyGap, ReplyTimes,
    SemanticAnalysis, SemanticEvent, Sentiment, SentimentPoint, Toxicity, TrendAnalysis,
};
use crate::token::CorrelationToken;
use convoq_protocol::{
    AnalysisBody, FastResult, HistoricalRecord, RawDecisionAdvice, RawReplyGap, RawReplyTimes,
    RawSemanticAnalysis, RawSentimentPoint, RawToxicity, RawTrendAnalysis,
};
use std::collections::{BTreeMap, HashSet};

/// The payload shapes the normalizer accepts. Deep results are not here: they
/// only ever overlay an existing view model (see [`crate::merge`]).
#[derive(Debug, Clone, Copy)]
pub enum RawPayload<'a> {
    Fast(&'a FastResult),
    History(&'a HistoricalRecord),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub view: AnalysisViewModel,
    /// Present only for fast results that carried both keys.
    pub token: Option<CorrelationToken>,
}

pub fn normalize(raw: RawPayload<'_>) -> Result<Normalized> {
    match raw {
        RawPayload::Fast(fast) => normalize_fast(fast),
        RawPayload::History(record) => Ok(Normalized {
            view: normalize_history(record)?,
            token: None,
        }),
    }
}

/// A fast result is by construction not yet deep-scanned, so its status is
/// `pending_deep` whatever the payload claims.
pub fn normalize_fast(fast: &FastResult) -> Result<Normalized> {
    let body = &fast.body;
    let total_messages = body
        .total_messages
        .ok_or_else(|| ViewError::incomplete("missing total_messages"))?;

    let view = build_view(
        body,
        Summary {
            total_messages,
            health_score: body.health_score,
            persona_tag: body.persona_tag.clone(),
        },
        AnalysisStatus::PendingDeep,
    )?;

    let token = CorrelationToken::from_parts(fast.cache_key.as_deref(), fast.analysis_id.as_ref());
    if token.is_none() {
        log::debug!("fast result carried no correlation token; deep scan unavailable");
    }

    Ok(Normalized { view, token })
}

/// History is always fully materialized. `full_data` wins over the legacy
/// `analysis_results`, and the record's top-level summary fields win over
/// anything nested.
pub fn normalize_history(record: &HistoricalRecord) -> Result<AnalysisViewModel> {
    let total_messages = record
        .total_messages
        .ok_or_else(|| ViewError::corrupt("missing total_messages"))?;
    let body = locate_body(record)?;

    build_view(
        &body,
        Summary {
            total_messages,
            health_score: record.health_score.or(body.health_score),
            persona_tag: record
                .persona_tag
                .clone()
                .or_else(|| body.persona_tag.clone()),
        },
        AnalysisStatus::Complete,
    )
}

fn locate_body(record: &HistoricalRecord) -> Result<AnalysisBody> {
    let present = |value: &Option<serde_json::Value>| {
        value.as_ref().filter(|v| !v.is_null()).cloned()
    };

    let (source, value) = match (present(&record.full_data), present(&record.analysis_results)) {
        (Some(value), _) => ("full_data", value),
        (None, Some(value)) => ("analysis_results", value),
        (None, None) => {
            return Err(ViewError::corrupt(
                "neither full_data nor analysis_results present",
            ))
        }
    };

    if !value.is_object() {
        return Err(ViewError::corrupt(format!("{source} is not an object")));
    }
    serde_json::from_value(value).map_err(|err| ViewError::corrupt(format!("{source}: {err}")))
}

struct Summary {
    total_messages: u64,
    health_score: Option<f64>,
    persona_tag: Option<String>,
}

fn build_view(
    body: &AnalysisBody,
    summary: Summary,
    status: AnalysisStatus,
) -> Result<AnalysisViewModel> {
    let participants = unique_participants(&body.participants);
    let known: HashSet<&str> = participants.iter().map(String::as_str).collect();

    let timeline_points = body
        .sentiment
        .clone()
        .map(|sentiment| sentiment.into_points())
        .or_else(|| body.sentiment_timeline.clone())
        .unwrap_or_default();

    let view = AnalysisViewModel {
        total_messages: summary.total_messages,
        health_score: clamp_health(summary.health_score.unwrap_or(0.0)),
        persona_tag: summary.persona_tag,
        toxicity: toxicity_from_raw(body.toxicity.as_ref()),
        initiations: restrict_to_participants(&body.initiations, &known, "initiations"),
        features: features_from_raw(&body.features),
        sentiment: Sentiment {
            timeline: timeline_from_raw(timeline_points),
        },
        reply_times: reply_times_from_raw(body.reply_times.as_ref(), &known),
        coach_summary: body.coach_summary.clone().unwrap_or_default(),
        semantic_analysis: semantic_from_raw(body.semantic_analysis.as_ref()),
        trend_analysis: body.trend_analysis.as_ref().map(trend_from_raw),
        decision_advice: body.decision_advice.as_ref().map(advice_from_raw),
        analysis_status: status,
        participants,
    };

    view.check_invariants()?;
    Ok(view)
}

fn unique_participants(raw: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(raw.len());
    let mut out = Vec::with_capacity(raw.len());
    for name in raw {
        if name.trim().is_empty() {
            log::warn!("dropping blank participant name");
            continue;
        }
        if seen.insert(name.as_str()) {
            out.push(name.clone());
        } else {
            log::warn!("dropping duplicate participant '{name}'");
        }
    }
    out
}

fn restrict_to_participants<V: Clone>(
    map: &BTreeMap<String, V>,
    known: &HashSet<&str>,
    section: &str,
) -> BTreeMap<String, V> {
    map.iter()
        .filter(|(name, _)| {
            let keep = known.contains(name.as_str());
            if !keep {
                log::warn!("dropping {section} entry for unknown participant '{name}'");
            }
            keep
        })
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

pub(crate) fn clamp_health(score: f64) -> f64 {
    if !score.is_finite() {
        log::warn!("health_score {score} is not finite, using 0");
        return 0.0;
    }
    let clamped = score.clamp(0.0, 100.0);
    if clamped != score {
        log::warn!("health_score {score} clamped to {clamped}");
    }
    clamped
}

fn clamp_unit(score: f64, what: &str) -> f64 {
    if !score.is_finite() {
        log::warn!("{what} {score} is not finite, using 0");
        return 0.0;
    }
    let clamped = score.clamp(0.0, 1.0);
    if clamped != score {
        log::warn!("{what} {score} clamped to {clamped}");
    }
    clamped
}

/// Absent toxicity is treated as locked: there is no number to trust.
pub(crate) fn toxicity_from_raw(raw: Option<&RawToxicity>) -> Toxicity {
    let Some(raw) = raw else {
        return Toxicity::Locked;
    };
    if is_locked(raw.status.as_deref()) {
        return Toxicity::Locked;
    }
    Toxicity::Normal {
        toxicity_rate: clamp_unit(raw.toxicity_rate.unwrap_or(0.0), "toxicity_rate"),
    }
}

pub(crate) fn features_from_raw(raw: &BTreeMap<String, f64>) -> BTreeMap<String, f64> {
    raw.iter()
        .map(|(name, score)| (name.clone(), clamp_unit(*score, name)))
        .collect()
}

fn timeline_from_raw(mut points: Vec<RawSentimentPoint>) -> Vec<SentimentPoint> {
    points.retain(|point| point.avg_sentiment.is_finite() && !point.date.trim().is_empty());
    points.sort_by(|a, b| a.date.cmp(&b.date));
    let before = points.len();
    points.dedup_by(|next, prev| next.date == prev.date);
    if points.len() != before {
        log::warn!(
            "collapsed {} duplicate sentiment timeline dates",
            before - points.len()
        );
    }
    points
        .into_iter()
        .map(|point| SentimentPoint {
            date: point.date,
            avg_sentiment: point.avg_sentiment,
        })
        .collect()
}

fn reply_gap_from_raw(raw: &RawReplyGap) -> ReplyGap {
    ReplyGap {
        minutes: raw.minutes,
        from: raw.from.clone(),
    }
}

fn reply_times_from_raw(raw: Option<&RawReplyTimes>, known: &HashSet<&str>) -> ReplyTimes {
    let Some(raw) = raw else {
        return ReplyTimes::default();
    };
    ReplyTimes {
        avg_reply_time: restrict_to_participants(&raw.avg_reply_time, known, "avg_reply_time"),
        fastest_reply: raw.fastest_reply.as_ref().map(reply_gap_from_raw),
        longest_ghosting: raw.longest_ghosting.as_ref().map(reply_gap_from_raw),
        peak_hours: raw
            .peak_hours
            .iter()
            .filter_map(|peak| match u8::try_from(peak.hour) {
                Ok(hour) if hour <= 23 => Some(PeakHour {
                    hour,
                    count: peak.count,
                }),
                _ => {
                    log::warn!("dropping peak hour {} outside 0-23", peak.hour);
                    None
                }
            })
            .collect(),
    }
}

pub(crate) fn semantic_from_raw(raw: Option<&RawSemanticAnalysis>) -> SemanticAnalysis {
    let Some(raw) = raw else {
        return SemanticAnalysis::default();
    };
    SemanticAnalysis {
        status: raw.status.clone(),
        events: raw
            .events
            .iter()
            .map(|event| SemanticEvent {
                timestamp: event.timestamp.clone(),
                kind: event.kind.clone(),
                summary: event.summary.clone(),
                sentiment_score: event.sentiment_score,
            })
            .collect(),
    }
}

pub(crate) fn trend_from_raw(raw: &RawTrendAnalysis) -> TrendAnalysis {
    if is_locked(raw.status.as_deref()) {
        return TrendAnalysis::Locked;
    }
    TrendAnalysis::Ready {
        decision: raw.decision.clone().unwrap_or_default(),
        decision_color: raw.decision_color.clone().unwrap_or_default(),
        reasons: raw.reasons.clone(),
        metrics_delta: raw.metrics_delta.clone(),
    }
}

pub(crate) fn advice_from_raw(raw: &RawDecisionAdvice) -> DecisionAdvice {
    DecisionAdvice {
        advice: raw.advice.clone(),
        reply_suggestions: raw.reply_suggestions.clone(),
    }
}

fn is_locked(status: Option<&str>) -> bool {
    status.is_some_and(|s| s.trim().eq_ignore_ascii_case("locked"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn fast(value: serde_json::Value) -> FastResult {
        serde_json::from_value(value).unwrap()
    }

    fn record(value: serde_json::Value) -> HistoricalRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn fast_status_is_always_pending_deep() {
        let out = normalize_fast(&fast(json!({
            "total_messages": 4,
            "analysis_status": "complete"
        })))
        .unwrap();
        assert_eq!(out.view.analysis_status, AnalysisStatus::PendingDeep);
        assert_eq!(out.token, None);
    }

    #[test]
    fn fast_without_total_messages_is_incomplete() {
        let err = normalize_fast(&fast(json!({"participants": ["Alex"]}))).unwrap_err();
        assert!(matches!(err, ViewError::IncompleteFastResult { .. }));
    }

    #[test]
    fn participants_keep_order_and_drop_duplicates() {
        let out = normalize_fast(&fast(json!({
            "total_messages": 4,
            "participants": ["Sam", "Alex", "Sam", ""],
            "initiations": {"Sam": 3, "Alex": 1, "Jordan": 9},
            "reply_times": {"avg_reply_time": {"Alex": 2.5, "Ghost": 1.0}}
        })))
        .unwrap();
        assert_eq!(out.view.participants, vec!["Sam", "Alex"]);
        assert_eq!(
            out.view.initiations.keys().collect::<Vec<_>>(),
            vec!["Alex", "Sam"]
        );
        assert_eq!(
            out.view.reply_times.avg_reply_time.keys().collect::<Vec<_>>(),
            vec!["Alex"]
        );
    }

    #[test]
    fn blank_participants_are_dropped_with_their_entries() {
        let out = normalize_fast(&fast(json!({
            "total_messages": 4,
            "participants": ["Robin", "  ", "Kai", ""],
            "initiations": {"Robin": 2, "  ": 5, "": 1},
            "reply_times": {"avg_reply_time": {"Kai": 4.0, "  ": 9.0}}
        })))
        .unwrap();
        assert_eq!(out.view.participants, vec!["Robin", "Kai"]);
        assert_eq!(
            out.view.initiations.keys().collect::<Vec<_>>(),
            vec!["Robin"]
        );
        assert_eq!(
            out.view.reply_times.avg_reply_time.keys().collect::<Vec<_>>(),
            vec!["Kai"]
        );
    }

    #[test]
    fn out_of_range_scores_are_clamped() {
        let out = normalize_fast(&fast(json!({
            "total_messages": 4,
            "health_score": 140.0,
            "toxicity": {"toxicity_rate": 12.5, "status": "normal"},
            "features": {"reply_time_balance": 1.4, "emoji_density": -0.2}
        })))
        .unwrap();
        assert_eq!(out.view.health_score, 100.0);
        assert_eq!(out.view.toxicity, Toxicity::Normal { toxicity_rate: 1.0 });
        assert_eq!(out.view.features["reply_time_balance"], 1.0);
        assert_eq!(out.view.features["emoji_density"], 0.0);
    }

    #[test]
    fn locked_and_missing_toxicity_carry_no_rate() {
        let locked = normalize_fast(&fast(json!({
            "total_messages": 1,
            "toxicity": {"toxicity_rate": 0, "status": "locked"}
        })))
        .unwrap();
        assert_eq!(locked.view.toxicity, Toxicity::Locked);

        let missing = normalize_fast(&fast(json!({"total_messages": 1}))).unwrap();
        assert_eq!(missing.view.toxicity, Toxicity::Locked);

        let legacy = normalize_fast(&fast(json!({
            "total_messages": 1,
            "toxicity": {"toxicity_rate": 0.2}
        })))
        .unwrap();
        assert_eq!(legacy.view.toxicity.rate(), Some(0.2));
    }

    #[test]
    fn timeline_is_sorted_and_deduplicated() {
        let out = normalize_fast(&fast(json!({
            "total_messages": 4,
            "sentiment": {"timeline": [
                {"date": "2024-03-02", "avg_sentiment": 0.5},
                {"date": "2024-03-01", "avg_sentiment": 0.1},
                {"date": "2024-03-02", "avg_sentiment": -0.9}
            ]}
        })))
        .unwrap();
        let dates: Vec<_> = out
            .view
            .sentiment
            .timeline
            .iter()
            .map(|p| (p.date.as_str(), p.avg_sentiment))
            .collect();
        assert_eq!(dates, vec![("2024-03-01", 0.1), ("2024-03-02", 0.5)]);
    }

    #[test]
    fn peak_hours_outside_day_are_dropped() {
        let out = normalize_fast(&fast(json!({
            "total_messages": 4,
            "reply_times": {"peak_hours": [
                {"hour": 22, "count": 5},
                {"hour": 24, "count": 2},
                {"hour": -1, "count": 1}
            ]}
        })))
        .unwrap();
        assert_eq!(
            out.view.reply_times.peak_hours,
            vec![PeakHour { hour: 22, count: 5 }]
        );
    }

    #[test]
    fn history_prefers_full_data_and_top_level_summary() {
        let view = normalize_history(&record(json!({
            "total_messages": 300,
            "health_score": 71.0,
            "persona_tag": "Besties",
            "full_data": {
                "total_messages": 1,
                "health_score": 5.0,
                "persona_tag": "Stale",
                "participants": ["A", "B"],
                "coach_summary": "rich"
            },
            "analysis_results": {
                "participants": ["Legacy"],
                "coach_summary": "legacy"
            }
        })))
        .unwrap();
        assert_eq!(view.total_messages, 300);
        assert_eq!(view.health_score, 71.0);
        assert_eq!(view.persona_tag.as_deref(), Some("Besties"));
        assert_eq!(view.participants, vec!["A", "B"]);
        assert_eq!(view.coach_summary, "rich");
        assert_eq!(view.analysis_status, AnalysisStatus::Complete);
    }

    #[test]
    fn history_falls_back_to_legacy_structure_with_defaults() {
        let view = normalize_history(&record(json!({
            "total_messages": 12,
            "analysis_results": {
                "participants": ["A"],
                "sentiment": [{"date": "2023-05-01", "avg_sentiment": 0.3}]
            }
        })))
        .unwrap();
        assert_eq!(view.coach_summary, "");
        assert_eq!(view.semantic_analysis, SemanticAnalysis::default());
        assert_eq!(view.sentiment.timeline.len(), 1);
        assert_eq!(view.health_score, 0.0);
    }

    #[test]
    fn history_reads_sibling_sentiment_timeline() {
        let view = normalize_history(&record(json!({
            "total_messages": 12,
            "full_data": {
                "sentiment_timeline": [{"date": "2023-05-01", "avg_sentiment": 0.3}]
            }
        })))
        .unwrap();
        assert_eq!(view.sentiment.timeline[0].date, "2023-05-01");
    }

    #[test]
    fn history_without_substructure_is_corrupt() {
        let err = normalize_history(&record(json!({
            "total_messages": 12,
            "full_data": null
        })))
        .unwrap_err();
        assert!(matches!(err, ViewError::CorruptRecord { .. }));

        let err = normalize_history(&record(json!({
            "total_messages": 12,
            "full_data": ["not", "an", "object"]
        })))
        .unwrap_err();
        assert!(matches!(err, ViewError::CorruptRecord { .. }));
    }

    #[test]
    fn locked_trend_becomes_locked_variant() {
        let out = normalize_fast(&fast(json!({
            "total_messages": 4,
            "trend_analysis": {"status": "locked", "decision": "?"}
        })))
        .unwrap();
        assert_eq!(out.view.trend_analysis, Some(TrendAnalysis::Locked));
    }

    #[test]
    fn dispatch_routes_each_variant() {
        let f = fast(json!({"total_messages": 2, "cache_key": "k", "analysis_id": 9}));
        let normalized = normalize(RawPayload::Fast(&f)).unwrap();
        assert_eq!(normalized.token.unwrap().analysis_id().as_str(), "9");

        let r = record(json!({"total_messages": 2, "full_data": {}}));
        let normalized = normalize(RawPayload::History(&r)).unwrap();
        assert!(normalized.token.is_none());
        assert!(normalized.view.is_complete());
    }
}
