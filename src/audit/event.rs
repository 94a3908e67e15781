//! Authentication events and their logged form.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

/// Well-known event types.
pub mod event_types {
    pub const LOGIN_SUCCESS: &str = "LOGIN_SUCCESS";
    pub const LOGIN_FAILURE: &str = "LOGIN_FAILURE";
    pub const REGISTER_SUCCESS: &str = "REGISTER_SUCCESS";
    pub const REGISTER_FAILURE: &str = "REGISTER_FAILURE";
    pub const RATE_LIMITED: &str = "RATE_LIMITED";
    pub const LOGOUT: &str = "LOGOUT";
}

/// An authentication event reported by request-handling code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthEvent {
    /// Event type, e.g. [`event_types::LOGIN_FAILURE`]
    pub event_type: String,
    pub email: Option<String>,
    pub user_id: Option<String>,
    pub ip_address: Option<String>,
    /// Free-form context
    pub details: Option<Value>,
}

impl AuthEvent {
    /// Create an event with only a type set.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            ..Self::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_ip_address(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// The record appended to the log sink for an [`AuthEvent`].
///
/// `ip_address` is renamed to `ip` and a UTC timestamp is attached. Absent
/// optional fields are left out of the serialized form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthLogRecord<'a> {
    #[serde(rename = "type")]
    pub event_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<&'a Value>,
    /// ISO-8601, millisecond precision, `Z` suffix
    pub timestamp: String,
}

impl<'a> AuthLogRecord<'a> {
    /// Derive the log record for `event` as of `at`.
    pub fn from_event(event: &'a AuthEvent, at: DateTime<Utc>) -> Self {
        Self {
            event_type: &event.event_type,
            email: event.email.as_deref(),
            user_id: event.user_id.as_deref(),
            ip: event.ip_address.as_deref(),
            details: event.details.as_ref(),
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}
