//! # Convoq Core
//!
//! Reconciles the three result payloads of the Convoq analysis service into a
//! single canonical view model and gates access to the deep-tier metrics.
//!
//! ## Architecture
//!
//! ```text
//! FastResult ──────┐
//!                  ├──> Normalizer ──> AnalysisViewModel (+ CorrelationToken)
//! HistoricalRecord ┘                          │
//!                                             ▼
//!                                   DisclosureEngine
//!                                     NoData
//!                                       │ apply_fast
//!                                     FastOnly(token) ── request_deep ──> DeepTicket
//!                                       │                                    │
//!                                       │ apply_deep(ticket.generation) <────┘
//!                                       ▼          (Merge Engine, stale check)
//!                                     DeepUnlocked <── select_history
//! ```
//!
//! Everything here is synchronous and free of I/O: network completions are
//! delivered to the engine by the caller, and late responses are recognised by
//! their [`Generation`].
//!
//! ## Example
//!
//! ```rust
//! use convoq_core::{DeepOutcome, DisclosureEngine};
//! use convoq_protocol::{DeepMergeResult, FastResult};
//!
//! let fast: FastResult = serde_json::from_value(serde_json::json!({
//!     "total_messages": 12,
//!     "participants": ["Alex", "Sam"],
//!     "cache_key": "abc123",
//!     "analysis_id": "a1"
//! }))
//! .unwrap();
//!
//! let mut engine = DisclosureEngine::new();
//! engine.apply_fast(&fast).unwrap();
//! let ticket = engine.request_deep().unwrap();
//!
//! let outcome = engine.apply_deep(ticket.generation, &DeepMergeResult::default());
//! assert_eq!(outcome, DeepOutcome::Applied);
//! ```

mod disclosure;
mod error;
mod history;
mod merge;
mod normalize;
mod panels;
mod schema;
mod token;

pub use disclosure::{DeepOutcome, Disclosure, DisclosureEngine};
pub use error::{Ineligibility, Result, ViewError};
pub use history::HistoryEntry;
pub use merge::{merge, MergeOutcome};
pub use normalize::{normalize, normalize_fast, normalize_history, Normalized, RawPayload};
pub use panels::{
    DecisionColor, DecisionPanel, EventKind, OverviewFlags, QuotaLevel, QuotaPanel, TrendPanel,
};
pub use schema::{
    AnalysisStatus, AnalysisViewModel, DecisionAdvice, PeakHour, ReplyGap, ReplyTimes,
    SemanticAnalysis, SemanticEvent, Sentiment, SentimentPoint, Toxicity, TrendAnalysis,
};
pub use token::{CorrelationToken, DeepTicket, Generation};
