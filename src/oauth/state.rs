// ABOUTME: Self-contained OAuth state token carried through the provider redirect
// ABOUTME: Versioned JSON payload, base64url-encoded, decoded strictly as untrusted input
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OAuth state encoding.
//!
//! The state parameter round-trips through the third-party redirect and
//! comes back as untrusted input, so decoding is strict: unknown fields,
//! wrong versions, bad base64, and stale timestamps are all rejected with
//! `InvalidState` before any token exchange is attempted. Return locations
//! are validated against a scheme allow list to prevent open redirects.

use crate::errors::{EngineError, EngineResult};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

/// Current state payload version
const STATE_VERSION: u8 = 1;

/// A consent attempt older than this is rejected
const MAX_STATE_AGE_SECS: i64 = 600;

/// Schemes a caller-supplied return location may use
const ALLOWED_RETURN_SCHEMES: &[&str] = &["https://", "http://localhost", "cadence://", "exp://"];

fn scheme_allowed(url: &str) -> bool {
    ALLOWED_RETURN_SCHEMES.iter().any(|s| url.starts_with(s))
}

/// Opaque state token carried through the provider redirect.
///
/// Created per authorization attempt and consumed exactly once at callback
/// time; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OAuthState {
    /// Payload version tag
    pub v: u8,
    /// Initiating user
    pub uid: Uuid,
    /// Issue timestamp, unix seconds
    pub ts: i64,
    /// Optional caller-supplied return location
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_to: Option<String>,
}

impl OAuthState {
    /// Build a fresh state token for `user_id`.
    ///
    /// A `return_to` with a disallowed scheme is dropped with a warning
    /// rather than failing the flow.
    #[must_use]
    pub fn new(user_id: Uuid, return_to: Option<String>) -> Self {
        let return_to = return_to.filter(|url| {
            let allowed = scheme_allowed(url);
            if !allowed {
                warn!("dropping return location with disallowed scheme: {url}");
            }
            allowed
        });
        Self {
            v: STATE_VERSION,
            uid: user_id,
            ts: Utc::now().timestamp(),
            return_to,
        }
    }

    /// Encode as base64url JSON for use as the `state` query parameter
    #[must_use]
    pub fn encode(&self) -> String {
        // Serialization of this plain struct cannot fail
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    /// Strictly decode an incoming `state` parameter.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` for bad base64, malformed or unknown-shaped
    /// JSON, a version mismatch, a state older than ten minutes, or a
    /// `return_to` with a disallowed scheme. The state is unsigned, so the
    /// allow list must hold on decode too: a legitimately issued state
    /// never carries a disallowed scheme, and one that does is forged.
    pub fn decode(raw: &str) -> EngineResult<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(raw)
            .map_err(|_| EngineError::InvalidState)?;
        let state: Self =
            serde_json::from_slice(&bytes).map_err(|_| EngineError::InvalidState)?;

        if state.v != STATE_VERSION {
            warn!(version = state.v, "rejecting OAuth state with unknown version");
            return Err(EngineError::InvalidState);
        }

        let age = Utc::now().timestamp() - state.ts;
        if !(0..=MAX_STATE_AGE_SECS).contains(&age) {
            warn!(age_secs = age, "rejecting stale or future-dated OAuth state");
            return Err(EngineError::InvalidState);
        }

        if let Some(return_to) = &state.return_to {
            if !scheme_allowed(return_to) {
                warn!("rejecting OAuth state with disallowed return scheme");
                return Err(EngineError::InvalidState);
            }
        }

        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_encoding() {
        let state = OAuthState::new(Uuid::new_v4(), Some("https://app.example/done".to_owned()));
        let decoded = OAuthState::decode(&state.encode()).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn rejects_non_base64() {
        assert!(matches!(
            OAuthState::decode("not!valid!base64!"),
            Err(EngineError::InvalidState)
        ));
    }

    #[test]
    fn rejects_non_json_payload() {
        let raw = URL_SAFE_NO_PAD.encode(b"just some text");
        assert!(matches!(
            OAuthState::decode(&raw),
            Err(EngineError::InvalidState)
        ));
    }

    #[test]
    fn rejects_unknown_fields() {
        let json = format!(
            r#"{{"v":1,"uid":"{}","ts":{},"extra":true}}"#,
            Uuid::new_v4(),
            Utc::now().timestamp()
        );
        let raw = URL_SAFE_NO_PAD.encode(json);
        assert!(matches!(
            OAuthState::decode(&raw),
            Err(EngineError::InvalidState)
        ));
    }

    #[test]
    fn rejects_wrong_version() {
        let json = format!(
            r#"{{"v":2,"uid":"{}","ts":{}}}"#,
            Uuid::new_v4(),
            Utc::now().timestamp()
        );
        let raw = URL_SAFE_NO_PAD.encode(json);
        assert!(matches!(
            OAuthState::decode(&raw),
            Err(EngineError::InvalidState)
        ));
    }

    #[test]
    fn rejects_stale_state() {
        let json = format!(
            r#"{{"v":1,"uid":"{}","ts":{}}}"#,
            Uuid::new_v4(),
            Utc::now().timestamp() - MAX_STATE_AGE_SECS - 1
        );
        let raw = URL_SAFE_NO_PAD.encode(json);
        assert!(matches!(
            OAuthState::decode(&raw),
            Err(EngineError::InvalidState)
        ));
    }

    #[test]
    fn rejects_forged_state_with_disallowed_return_scheme() {
        // The state is unsigned JSON anyone can mint; a disallowed scheme
        // arriving at decode can only be forged and must not survive to
        // the post-callback redirect.
        let json = format!(
            r#"{{"v":1,"uid":"{}","ts":{},"return_to":"javascript:alert(1)"}}"#,
            Uuid::new_v4(),
            Utc::now().timestamp()
        );
        let raw = URL_SAFE_NO_PAD.encode(json);
        assert!(matches!(
            OAuthState::decode(&raw),
            Err(EngineError::InvalidState)
        ));
    }

    #[test]
    fn decode_keeps_allowed_return_locations() {
        let state = OAuthState::new(Uuid::new_v4(), Some("https://app.example/done".to_owned()));
        let decoded = OAuthState::decode(&state.encode()).unwrap();
        assert_eq!(decoded.return_to.as_deref(), Some("https://app.example/done"));
    }

    #[test]
    fn drops_disallowed_return_scheme() {
        let state = OAuthState::new(Uuid::new_v4(), Some("javascript:alert(1)".to_owned()));
        assert!(state.return_to.is_none());
    }

    #[test]
    fn keeps_allowed_return_schemes() {
        for url in ["https://app.example/x", "http://localhost:3000/x", "cadence://done"] {
            let state = OAuthState::new(Uuid::new_v4(), Some(url.to_owned()));
            assert_eq!(state.return_to.as_deref(), Some(url));
        }
    }
}
