//! Identity and session types shared by providers, the store, and the guard.
//!
//! DESIGN
//! ======
//! These mirror what the hosted identity service hands back: an `Identity`
//! (the provider's user record) and a `Session` proving that identity is
//! currently authenticated. `SessionChange` is the payload fanned out to
//! change subscribers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// IDENTITY
// =============================================================================

/// Provider-issued user record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    /// Free-form metadata attached at sign-up (holds `username`).
    #[serde(default, rename = "user_metadata")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Identity {
    #[must_use]
    pub fn new(id: Uuid, email: impl Into<String>) -> Self {
        Self { id, email: email.into(), metadata: serde_json::Map::new() }
    }

    /// Username from metadata, if one was attached at sign-up.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.metadata.get("username").and_then(serde_json::Value::as_str)
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// Proof that an identity is currently authenticated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(rename = "user")]
    pub identity: Identity,
}

// =============================================================================
// CHANGE EVENTS
// =============================================================================

/// Why the provider emitted a session change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// Notification delivered to every change subscriber.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionChange {
    pub event: AuthEvent,
    pub session: Option<Session>,
}

impl SessionChange {
    #[must_use]
    pub fn signed_in(session: Session) -> Self {
        Self { event: AuthEvent::SignedIn, session: Some(session) }
    }

    #[must_use]
    pub fn signed_out() -> Self {
        Self { event: AuthEvent::SignedOut, session: None }
    }

    /// Identity carried by the change, if any.
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.session.as_ref().map(|s| &s.identity)
    }
}

#[cfg(test)]
#[path = "identity_test.rs"]
mod tests;
