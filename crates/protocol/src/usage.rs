use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Response of `GET /usage`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct UsageStats {
    pub rate_limiting: RateLimiting,
    pub token_counting: TokenCounting,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct RateLimiting {
    pub requests_this_minute: u64,
    pub minute_limit: u64,
    pub requests_today: u64,
    pub daily_limit: u64,
    #[serde(default)]
    pub remaining_requests_today: u64,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct TokenCounting {
    pub tokens_used_today: u64,
    pub daily_limit: u64,
    #[serde(default)]
    pub tokens_remaining: u64,
    pub usage_percentage: f64,
    #[serde(default)]
    pub status: String,
}
