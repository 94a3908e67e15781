//! Request-level guard combining IP resolution, rate limiting and auditing.

use std::collections::HashMap;
use std::sync::Arc;

use http::HeaderMap;
use serde_json::json;
use tracing::{debug, instrument};

use crate::audit::{event_types, AuthEvent, AuthLogger};
use crate::client_ip::get_client_ip;
use crate::config::AuthGuardConfig;
use crate::ratelimit::{Clock, LimitConfig, RateLimiter, SystemClock};

/// Outcome of [`AuthGuard::check_request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Rate limit scope used, `<action>:<ip>`
    pub identifier: String,
    pub client_ip: String,
}

/// Guards authentication endpoints against bursts from one client.
pub struct AuthGuard<C: Clock = SystemClock> {
    limiter: Arc<RateLimiter<C>>,
    logger: AuthLogger,
    action_limits: HashMap<String, LimitConfig>,
}

impl AuthGuard<SystemClock> {
    /// Build a guard from configuration, logging through `tracing`.
    pub fn from_config(config: &AuthGuardConfig) -> Self {
        let limiter = RateLimiter::with_default_limit(config.rate_limiting.default_limit.into());
        let mut guard = Self::new(Arc::new(limiter), AuthLogger::default());
        for action in config.rate_limiting.actions.keys() {
            let limit = config.limit_for(action);
            guard = guard.with_action_limit(action.as_str(), limit);
        }
        guard
    }
}

impl<C: Clock> AuthGuard<C> {
    pub fn new(limiter: Arc<RateLimiter<C>>, logger: AuthLogger) -> Self {
        Self {
            limiter,
            logger,
            action_limits: HashMap::new(),
        }
    }

    /// Use `limit` for requests to `action` instead of the limiter default.
    pub fn with_action_limit(mut self, action: impl Into<String>, limit: LimitConfig) -> Self {
        self.action_limits.insert(action.into(), limit);
        self
    }

    /// Limit applied to `action`.
    pub fn limit_for(&self, action: &str) -> &LimitConfig {
        self.action_limits
            .get(action)
            .unwrap_or_else(|| self.limiter.default_limit())
    }

    /// Decide whether a request to `action` with `headers` may proceed.
    ///
    /// Denials are recorded as `RATE_LIMITED` audit events.
    #[instrument(skip(self, headers))]
    pub fn check_request(&self, action: &str, headers: &HeaderMap) -> Decision {
        let client_ip = get_client_ip(headers);
        let identifier = format!("{}:{}", action, client_ip);
        let limit = self.limit_for(action);

        let allowed = self.limiter.check_rate_limit(&identifier, limit);

        if !allowed {
            debug!(identifier = %identifier, "Request rejected");
            self.logger.log_auth_event(
                &AuthEvent::new(event_types::RATE_LIMITED)
                    .with_ip_address(client_ip.as_str())
                    .with_details(json!({
                        "action": action,
                        "identifier": identifier,
                        "maxRequests": limit.max_requests,
                        "windowMs": limit.window.as_millis() as u64,
                    })),
            );
        }

        Decision {
            allowed,
            identifier,
            client_ip,
        }
    }

    /// Get the shared limiter.
    pub fn limiter(&self) -> &Arc<RateLimiter<C>> {
        &self.limiter
    }

    /// Get the audit logger.
    pub fn logger(&self) -> &AuthLogger {
        &self.logger
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemorySink;
    use crate::ratelimit::MockClock;
    use http::HeaderValue;
    use serde_json::Value;
    use std::time::Duration;

    fn guard_with_sink() -> (AuthGuard<MockClock>, MemorySink, MockClock) {
        let clock = MockClock::default();
        let sink = MemorySink::default();
        let limiter = Arc::new(RateLimiter::with_clock(clock.clone(), LimitConfig::default()));
        let guard = AuthGuard::new(limiter, AuthLogger::new(sink.clone()))
            .with_action_limit("login", LimitConfig::new(2, Duration::from_secs(60)));
        (guard, sink, clock)
    }

    fn forwarded(ip: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static(ip));
        headers
    }

    #[test]
    fn test_identifier_combines_action_and_ip() {
        let (guard, _sink, _clock) = guard_with_sink();

        let decision = guard.check_request("login", &forwarded("1.2.3.4, 10.0.0.1"));

        assert!(decision.allowed);
        assert_eq!(decision.identifier, "login:1.2.3.4");
        assert_eq!(decision.client_ip, "1.2.3.4");
    }

    #[test]
    fn test_denial_is_logged() {
        let (guard, sink, _clock) = guard_with_sink();
        let headers = forwarded("1.2.3.4");

        assert!(guard.check_request("login", &headers).allowed);
        assert!(guard.check_request("login", &headers).allowed);
        assert!(sink.records().is_empty());

        assert!(!guard.check_request("login", &headers).allowed);

        let records = sink.records();
        assert_eq!(records.len(), 1);
        let value: Value = serde_json::from_str(&records[0]).unwrap();
        assert_eq!(value["type"], "RATE_LIMITED");
        assert_eq!(value["ip"], "1.2.3.4");
        assert_eq!(value["details"]["identifier"], "login:1.2.3.4");
        assert_eq!(value["details"]["maxRequests"], 2);
    }

    #[test]
    fn test_actions_are_scoped_separately() {
        let (guard, _sink, _clock) = guard_with_sink();
        let headers = forwarded("1.2.3.4");

        for _ in 0..2 {
            guard.check_request("login", &headers);
        }
        assert!(!guard.check_request("login", &headers).allowed);

        // Falls back to the default limit of 10
        for _ in 0..10 {
            assert!(guard.check_request("register", &headers).allowed);
        }
        assert!(!guard.check_request("register", &headers).allowed);
    }

    #[test]
    fn test_unknown_clients_share_a_scope() {
        let (guard, _sink, _clock) = guard_with_sink();

        let decision = guard.check_request("login", &HeaderMap::new());
        assert_eq!(decision.identifier, "login:unknown");
    }

    #[test]
    fn test_window_reset_readmits() {
        let (guard, _sink, clock) = guard_with_sink();
        let headers = forwarded("5.5.5.5");

        guard.check_request("login", &headers);
        guard.check_request("login", &headers);
        assert!(!guard.check_request("login", &headers).allowed);

        clock.advance(Duration::from_secs(60));
        assert!(guard.check_request("login", &headers).allowed);
    }

    #[test]
    fn test_from_config() {
        let config = AuthGuardConfig::from_yaml(
            r#"
rate_limiting:
  actions:
    login:
      max_requests: 1
      window_ms: 1000
"#,
        )
        .unwrap();
        let guard = AuthGuard::from_config(&config);

        assert_eq!(guard.limit_for("login").max_requests, 1);
        assert_eq!(guard.limit_for("other").max_requests, 10);

        let headers = forwarded("7.7.7.7");
        assert!(guard.check_request("login", &headers).allowed);
        assert!(!guard.check_request("login", &headers).allowed);
    }

    #[test]
    fn test_from_config_matches_config_limits() {
        let config = AuthGuardConfig::from_yaml(
            r#"
rate_limiting:
  default_limit:
    max_requests: 7
    window_ms: 5000
  actions:
    login:
      max_requests: 5
      window_ms: 900000
    register:
      max_requests: 3
"#,
        )
        .unwrap();
        let guard = AuthGuard::from_config(&config);

        for action in ["login", "register", "reset_password"] {
            assert_eq!(*guard.limit_for(action), config.limit_for(action));
        }
        assert_eq!(
            *guard.limit_for("register"),
            LimitConfig::new(3, Duration::from_secs(60))
        );
        assert_eq!(
            *guard.limit_for("reset_password"),
            LimitConfig::new(7, Duration::from_secs(5))
        );
    }
}
