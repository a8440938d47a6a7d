use crate::error::{Ineligibility, Result, ViewError};
use crate::merge::{merge, MergeOutcome};
use crate::normalize::normalize_fast;
use crate::schema::AnalysisViewModel;
use crate::token::{CorrelationToken, DeepTicket, Generation};
use convoq_protocol::{DeepMergeResult, FastResult};

/// Whether deep metrics are locked, unlocked, or there is nothing to show.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Disclosure {
    #[default]
    NoData,
    /// Fast metrics only. `token` is `None` when the service did not hand out
    /// correlation keys, in which case a deep scan can never be requested.
    FastOnly { token: Option<CorrelationToken> },
    DeepUnlocked,
}

impl Disclosure {
    pub fn name(&self) -> &'static str {
        match self {
            Self::NoData => "no_data",
            Self::FastOnly { .. } => "fast_only",
            Self::DeepUnlocked => "deep_unlocked",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeepOutcome {
    Applied,
    /// Stale response: it was dropped and nothing changed.
    Discarded,
}

/// Owns the disclosure state, the live correlation token, the generation
/// counter, the in-flight marker and the current view model.
///
/// Every transition computes its result before touching `self`, so a failed
/// transition leaves the engine exactly as it was.
#[derive(Debug, Clone, Default)]
pub struct DisclosureEngine {
    state: Disclosure,
    view: Option<AnalysisViewModel>,
    generation: Generation,
    /// Generation recorded when the outstanding deep request was accepted.
    in_flight: Option<Generation>,
}

impl DisclosureEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &Disclosure {
        &self.state
    }

    pub fn view(&self) -> Option<&AnalysisViewModel> {
        self.view.as_ref()
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn deep_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn token(&self) -> Option<&CorrelationToken> {
        match &self.state {
            Disclosure::FastOnly { token } => token.as_ref(),
            _ => None,
        }
    }

    /// Whether the deep-scan trigger should be enabled right now.
    pub fn deep_scan_enabled(&self) -> bool {
        self.eligibility().is_ok()
    }

    /// Installs a fresh fast result. Any previous lineage (and any deep request
    /// still outstanding for it) is superseded.
    pub fn apply_fast(&mut self, fast: &FastResult) -> Result<&AnalysisViewModel> {
        let normalized = normalize_fast(fast)?;
        self.begin_lineage();
        log::debug!(
            "apply_fast: generation={} token={}",
            self.generation,
            normalized.token.is_some()
        );
        self.state = Disclosure::FastOnly {
            token: normalized.token,
        };
        Ok(self.view.insert(normalized.view))
    }

    /// Accepts a deep-scan request only from `FastOnly` with a live token and
    /// nothing already in flight.
    pub fn request_deep(&mut self) -> Result<DeepTicket> {
        let token = self.eligibility().map_err(ViewError::NotEligible)?.clone();
        self.in_flight = Some(self.generation);
        log::debug!("request_deep: generation={}", self.generation);
        Ok(DeepTicket {
            token,
            generation: self.generation,
        })
    }

    /// Delivers a deep response tagged with the generation it was requested
    /// under. Stale responses are dropped silently.
    pub fn apply_deep(&mut self, generation: Generation, deep: &DeepMergeResult) -> DeepOutcome {
        let Some(current) = self.view.as_ref() else {
            log::info!(
                "discarding deep response for generation {generation}: no view model loaded"
            );
            return DeepOutcome::Discarded;
        };

        match merge(current, deep, generation, self.generation) {
            MergeOutcome::Merged(next) => {
                self.view = Some(next);
                self.state = Disclosure::DeepUnlocked;
                self.in_flight = None;
                log::debug!("apply_deep: generation={generation} unlocked");
                DeepOutcome::Applied
            }
            MergeOutcome::Discarded {
                request_generation,
                current_generation,
            } => {
                log::info!(
                    "discarding stale deep response (requested at generation {request_generation}, now {current_generation})"
                );
                DeepOutcome::Discarded
            }
        }
    }

    /// Records a failed deep request so it can be retried. Fast data and the
    /// `FastOnly` state are kept. Returns `false` when the failure belongs to a
    /// superseded generation.
    pub fn deep_failed(&mut self, generation: Generation) -> bool {
        if self.in_flight != Some(generation) {
            return false;
        }
        self.in_flight = None;
        log::debug!("deep_failed: generation={generation}, retry allowed");
        true
    }

    /// Drops the view model and any live token, and invalidates whatever deep
    /// request is still outstanding.
    pub fn reset(&mut self) {
        self.generation = self.generation.next();
        self.state = Disclosure::NoData;
        self.view = None;
        self.in_flight = None;
        log::debug!("reset: generation={}", self.generation);
    }

    /// Installs an already complete view model (history selection).
    pub(crate) fn install_unlocked(&mut self, view: AnalysisViewModel) -> &AnalysisViewModel {
        self.begin_lineage();
        self.state = Disclosure::DeepUnlocked;
        log::debug!("install_unlocked: generation={}", self.generation);
        self.view.insert(view)
    }

    fn begin_lineage(&mut self) {
        if self.view.is_some() || self.in_flight.is_some() {
            self.generation = self.generation.next();
        }
        self.in_flight = None;
    }

    fn eligibility(&self) -> std::result::Result<&CorrelationToken, Ineligibility> {
        match &self.state {
            Disclosure::NoData => Err(Ineligibility::NoData),
            Disclosure::DeepUnlocked => Err(Ineligibility::AlreadyUnlocked),
            Disclosure::FastOnly { token: None } => Err(Ineligibility::MissingToken),
            Disclosure::FastOnly { token: Some(_) } if self.in_flight.is_some() => {
                Err(Ineligibility::InFlight)
            }
            Disclosure::FastOnly { token: Some(token) } => Ok(token),
        }
    }
}
