//! # Convoq Client
//!
//! Talks to the Convoq analysis service and drives a [`convoq_core`]
//! disclosure engine from the network completions.
//!
//! ```text
//! Dashboard ──upload──> AnalysisService::analyze_fast ──> engine.apply_fast
//!     │
//!     ├──begin_deep──> engine.request_deep ──> DeepTicket
//!     │                                           │
//!     │          AnalysisService::analyze_deep <──┘ (no engine access while pending)
//!     │                                           │
//!     └──finish_deep <────────────────────────────┘ apply / discard stale / deep_failed
//! ```
//!
//! The split between `begin_deep`, `fetch_deep` and `finish_deep` is what lets
//! a caller reset or select history while a deep request is outstanding.

mod config;
mod error;
mod http;
mod service;
mod session;

pub use config::{
    AuthToken, ClientConfig, API_URL_ENV, AUTH_TOKEN_ENV, DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS,
    TIMEOUT_ENV,
};
pub use error::{ClientError, Result};
pub use http::HttpAnalysisService;
pub use service::{AnalysisService, ChatUpload};
pub use session::Dashboard;
