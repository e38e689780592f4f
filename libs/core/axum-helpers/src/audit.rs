//! Audit trail for security-relevant actions.
//!
//! Events go to the `audit` tracing target so they can be routed apart from
//! application logs (the production filter keeps `audit=info`).
//!
//! ```ignore
//! AuditEvent::new(Some(admin.id.to_string()), "user.status.update", Some(format!("user:{id}")), AuditOutcome::Success)
//!     .with_client(&client)
//!     .with_details(json!({ "status": 1 }))
//!     .log();
//! ```

use crate::extractors::ClientContext;
use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Proxy headers consulted for the caller address, in priority order.
const IP_HEADERS: [&str; 6] = [
    "x-forwarded-for",
    "proxy-client-ip",
    "wl-proxy-client-ip",
    "http_client_ip",
    "http_x_forwarded_for",
    "x-real-ip",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    Success,
    Failure,
    /// Rejected by an authorization rule.
    Denied,
}

/// One audited action.
#[derive(Debug, Serialize)]
pub struct AuditEvent {
    /// Acting user id, `None` for anonymous callers.
    pub user_id: Option<String>,
    /// Dotted action name, e.g. `user.delete`.
    pub action: String,
    /// Affected resource, e.g. `user:42`.
    pub resource: Option<String>,
    pub outcome: AuditOutcome,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
    pub details: Option<serde_json::Value>,
}

impl AuditEvent {
    pub fn new(
        user_id: Option<String>,
        action: impl Into<String>,
        resource: Option<String>,
        outcome: AuditOutcome,
    ) -> Self {
        Self {
            user_id,
            action: action.into(),
            resource,
            outcome,
            ip_address: None,
            user_agent: None,
            timestamp: Utc::now(),
            details: None,
        }
    }

    pub fn with_ip(mut self, ip: Option<String>) -> Self {
        self.ip_address = ip;
        self
    }

    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    /// Copies address and user agent from the request's [`ClientContext`].
    pub fn with_client(self, client: &ClientContext) -> Self {
        self.with_ip(client.ip.clone())
            .with_user_agent(client.user_agent.clone())
    }

    pub fn with_details(mut self, details: impl Serialize) -> Self {
        self.details = serde_json::to_value(details).ok();
        self
    }

    pub fn log(self) {
        tracing::info!(
            target: "audit",
            user_id = self.user_id,
            action = %self.action,
            resource = self.resource,
            outcome = ?self.outcome,
            ip = self.ip_address,
            user_agent = self.user_agent,
            timestamp = %self.timestamp,
            details = ?self.details,
            "{}",
            serde_json::to_string(&self).unwrap_or_else(|_| "unserializable audit event".to_string())
        );
    }
}

/// Resolves the caller IP from proxy headers.
///
/// Empty values and the literal `unknown` are skipped. When a header carries a
/// comma-separated chain the first hop wins.
pub fn extract_ip_from_headers(headers: &HeaderMap) -> Option<String> {
    IP_HEADERS.iter().find_map(|name| {
        let value = headers.get(*name)?.to_str().ok()?.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("unknown") {
            return None;
        }
        value
            .split(',')
            .next()
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .map(str::to_string)
    })
}

pub fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_first_forwarded_hop_wins() {
        let map = headers(&[("x-forwarded-for", "198.51.100.4, 10.0.0.2")]);
        assert_eq!(extract_ip_from_headers(&map).as_deref(), Some("198.51.100.4"));
    }

    #[test]
    fn test_unknown_values_are_skipped() {
        let map = headers(&[
            ("x-forwarded-for", "unknown"),
            ("proxy-client-ip", ""),
            ("wl-proxy-client-ip", "10.1.1.1"),
            ("x-real-ip", "10.9.9.9"),
        ]);
        assert_eq!(extract_ip_from_headers(&map).as_deref(), Some("10.1.1.1"));
    }

    #[test]
    fn test_real_ip_is_last_resort() {
        let map = headers(&[("x-real-ip", "10.9.9.9")]);
        assert_eq!(extract_ip_from_headers(&map).as_deref(), Some("10.9.9.9"));
        assert_eq!(extract_ip_from_headers(&HeaderMap::new()), None);
    }

    #[test]
    fn test_event_serializes_outcome_lowercase() {
        let event = AuditEvent::new(Some("7".into()), "user.delete", Some("user:9".into()), AuditOutcome::Denied);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["outcome"], "denied");
        assert_eq!(json["resource"], "user:9");
    }
}
