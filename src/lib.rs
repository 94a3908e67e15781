//! Authguard - rate limiting and audit logging for authentication endpoints
//!
//! This crate decides whether a request to a login or registration endpoint
//! may proceed, using an in-process fixed-window limiter keyed by client
//! identifier. It also resolves client IPs from proxy headers and writes
//! structured authentication audit events.

pub mod audit;
pub mod client_ip;
pub mod config;
pub mod error;
pub mod guard;
pub mod ratelimit;

pub use audit::{log_auth_event, AuthEvent, AuthLogger};
pub use client_ip::get_client_ip;
pub use guard::{AuthGuard, Decision};
pub use ratelimit::{LimitConfig, RateLimiter};
