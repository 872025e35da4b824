//! Identity provider seam.
//!
//! ARCHITECTURE
//! ============
//! The hosted identity service is an external collaborator. The session
//! store only sees the two traits below: `IdentityProvider` for credentials
//! and session changes, `ProfileStore` for the application's "profiles"
//! collection. `MemoryProvider` backs tests and the offline CLI mode;
//! `SupabaseClient` talks to the hosted service over HTTP.

pub mod hub;
pub mod memory;
pub mod supabase;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::identity::{Identity, Session};

pub use hub::{ChangeHub, Subscription, SubscriptionGuard};
pub use memory::MemoryProvider;
pub use supabase::SupabaseClient;

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The provider rejected the request (bad credentials, duplicate user, ...).
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("profile store error: {0}")]
    Profiles(String),
}

impl ProviderError {
    /// Human-readable reason, suitable for a toast.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Rejected { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

// =============================================================================
// SIGN-UP WIRE TYPES
// =============================================================================

/// Options attached to an account-creation request.
#[derive(Debug, Clone, Default)]
pub struct SignUpOptions {
    pub metadata: serde_json::Map<String, serde_json::Value>,
    /// Where the confirmation link sends the user.
    pub redirect_to: Option<String>,
}

/// Result of account creation. `session` is `None` when the provider
/// requires email confirmation before the account is usable.
#[derive(Debug, Clone)]
pub struct SignUpResponse {
    pub identity: Identity,
    pub session: Option<Session>,
}

// =============================================================================
// PROFILE RECORD
// =============================================================================

/// Application-level row kept 1:1 with an identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

// =============================================================================
// TRAITS
// =============================================================================

/// Credential and session operations offered by the identity service.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Session the provider currently considers active, if any.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] if the provider cannot be reached.
    async fn current_session(&self) -> Result<Option<Session>, ProviderError>;

    /// Register for session-change notifications. The returned handle
    /// unsubscribes when dropped.
    fn on_session_change(&self) -> Subscription;

    /// # Errors
    ///
    /// Returns [`ProviderError::Rejected`] for invalid credentials.
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<(), ProviderError>;

    /// # Errors
    ///
    /// Returns a [`ProviderError`] if the provider refuses the account.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        options: SignUpOptions,
    ) -> Result<SignUpResponse, ProviderError>;

    /// # Errors
    ///
    /// Returns a [`ProviderError`] if the provider fails to end the session.
    async fn sign_out(&self) -> Result<(), ProviderError>;
}

/// The "profiles" collection, keyed by identity id.
#[async_trait::async_trait]
pub trait ProfileStore: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ProviderError::Profiles`] if the lookup fails.
    async fn find_by_email(&self, email: &str) -> Result<Option<Profile>, ProviderError>;

    /// # Errors
    ///
    /// Returns [`ProviderError::Profiles`] if the insert is refused.
    async fn insert(&self, profile: Profile) -> Result<(), ProviderError>;
}
