// ==================================
// crates/backend-lib/src/metrics.rs
// ==================================
//! Central place for Prometheus metric keys
pub const LOGIN_SUCCEEDED: &str = "auth.login.succeeded";
pub const LOGIN_FAILED: &str = "auth.login.failed";
pub const LOGIN_RATE_LIMITED: &str = "auth.login.rate_limited";
pub const TOKEN_ISSUED: &str = "auth.token.issued";
pub const TOKEN_REJECTED: &str = "auth.token.rejected";
pub const REFRESH_SUCCEEDED: &str = "auth.refresh.succeeded";
pub const RATE_LIMIT_TRACKED_KEYS: &str = "auth.rate_limit.tracked_keys";
