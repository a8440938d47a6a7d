use crate::normalize::{
    advice_from_raw, clamp_health, features_from_raw, semantic_from_raw, toxicity_from_raw,
    trend_from_raw,
};
use crate::schema::{AnalysisStatus, AnalysisViewModel};
use crate::token::Generation;
use convoq_protocol::DeepMergeResult;

#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    Merged(AnalysisViewModel),
    /// The response belongs to a lineage that has since been reset or replaced.
    Discarded {
        request_generation: Generation,
        current_generation: Generation,
    },
}

/// Overlays a deep result onto `current`, producing a new view model.
///
/// Every section present in `deep` replaces the prior one wholesale; absent
/// sections are kept. Nothing is appended, so merging the same result twice
/// yields the same shape.
pub fn merge(
    current: &AnalysisViewModel,
    deep: &DeepMergeResult,
    request_generation: Generation,
    current_generation: Generation,
) -> MergeOutcome {
    if request_generation != current_generation {
        return MergeOutcome::Discarded {
            request_generation,
            current_generation,
        };
    }

    let mut next = current.clone();
    if let Some(score) = deep.health_score {
        next.health_score = clamp_health(score);
    }
    if let Some(tag) = &deep.persona_tag {
        next.persona_tag = Some(tag.clone());
    }
    if let Some(toxicity) = &deep.toxicity {
        next.toxicity = toxicity_from_raw(Some(toxicity));
    }
    if let Some(features) = &deep.features {
        next.features = features_from_raw(features);
    }
    if let Some(summary) = &deep.coach_summary {
        next.coach_summary = summary.clone();
    }
    if let Some(semantic) = &deep.semantic_analysis {
        next.semantic_analysis = semantic_from_raw(Some(semantic));
    }
    if let Some(trend) = &deep.trend_analysis {
        next.trend_analysis = Some(trend_from_raw(trend));
    }
    if let Some(advice) = &deep.decision_advice {
        next.decision_advice = Some(advice_from_raw(advice));
    }
    next.analysis_status = next.analysis_status.advance(AnalysisStatus::Complete);

    MergeOutcome::Merged(next)
}
