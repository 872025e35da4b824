//! In-process identity provider.
//!
//! DESIGN
//! ======
//! Holds accounts, the active session, and profile rows in memory and
//! emits change notifications through a `ChangeHub`, the same way the
//! hosted client does after each successful call. Used by tests and by
//! the CLI when no hosted service is configured.
//!
//! Failure knobs (`require_confirmation`, `fail_profile_insert`,
//! `fail_sign_out`, `hold_session_fetch`) let callers drive the edge
//! cases of the session store deterministically.

use std::collections::HashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use rand::Rng;
use sha2::{Digest, Sha256};
use tokio::sync::oneshot;
use uuid::Uuid;

use super::{
    ChangeHub, IdentityProvider, Profile, ProfileStore, ProviderError, SignUpOptions, SignUpResponse, Subscription,
};
use crate::identity::{Identity, Session, SessionChange};

const INVALID_CREDENTIALS: &str = "Invalid login credentials";
const EMAIL_NOT_CONFIRMED: &str = "Email not confirmed";
const ALREADY_REGISTERED: &str = "User already registered";

fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Random 32-byte hex access token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes_to_hex(&bytes)
}

/// Salted SHA-256 digest of a password; the email is the salt.
#[must_use]
pub fn password_digest(email: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(email.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    bytes_to_hex(&hasher.finalize())
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Account {
    identity: Identity,
    password_digest: String,
    confirmed: bool,
}

/// Releases a held `current_session` call.
pub struct FetchGate(oneshot::Sender<()>);

impl FetchGate {
    pub fn release(self) {
        let _ = self.0.send(());
    }
}

// =============================================================================
// PROVIDER
// =============================================================================

#[derive(Default)]
pub struct MemoryProvider {
    hub: ChangeHub,
    accounts: Mutex<HashMap<String, Account>>,
    current: Mutex<Option<Session>>,
    profiles: Mutex<Vec<Profile>>,
    require_confirmation: AtomicBool,
    profile_insert_failure: Mutex<Option<String>>,
    sign_out_failure: Mutex<Option<String>>,
    fetch_gate: Mutex<Option<oneshot::Receiver<()>>>,
    sign_up_calls: AtomicUsize,
}

impl MemoryProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a confirmed account without emitting any change.
    #[must_use]
    pub fn with_account(self, email: &str, password: &str, username: &str) -> Self {
        let mut identity = Identity::new(Uuid::new_v4(), email);
        identity.metadata.insert("username".into(), serde_json::json!(username));
        lock(&self.accounts).insert(
            email.to_owned(),
            Account { identity, password_digest: password_digest(email, password), confirmed: true },
        );
        self
    }

    /// Seed a profile row.
    #[must_use]
    pub fn with_profile(self, profile: Profile) -> Self {
        lock(&self.profiles).push(profile);
        self
    }

    /// Seed an already-active session, as if restored from provider storage.
    #[must_use]
    pub fn with_session(self, session: Session) -> Self {
        *lock(&self.current) = Some(session);
        self
    }

    /// When set, sign-up creates an unconfirmed account and returns no session.
    pub fn require_confirmation(&self, required: bool) {
        self.require_confirmation.store(required, Ordering::SeqCst);
    }

    pub fn fail_profile_insert(&self, message: impl Into<String>) {
        *lock(&self.profile_insert_failure) = Some(message.into());
    }

    pub fn fail_sign_out(&self, message: impl Into<String>) {
        *lock(&self.sign_out_failure) = Some(message.into());
    }

    /// Make the next `current_session` call wait until the gate is released.
    #[must_use]
    pub fn hold_session_fetch(&self) -> FetchGate {
        let (tx, rx) = oneshot::channel();
        *lock(&self.fetch_gate) = Some(rx);
        FetchGate(tx)
    }

    /// End the active session from the provider side (expiry, revocation).
    pub fn expire_session(&self) {
        *lock(&self.current) = None;
        self.hub.emit(&SessionChange::signed_out());
    }

    /// Push an arbitrary change to subscribers.
    pub fn emit(&self, change: &SessionChange) {
        self.hub.emit(change);
    }

    #[must_use]
    pub fn sign_up_calls(&self) -> usize {
        self.sign_up_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn profiles(&self) -> Vec<Profile> {
        lock(&self.profiles).clone()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.hub.subscriber_count()
    }

    fn open_session(&self, identity: Identity) -> Session {
        let session = Session { access_token: generate_token(), refresh_token: Some(generate_token()), identity };
        *lock(&self.current) = Some(session.clone());
        session
    }
}

#[async_trait::async_trait]
impl IdentityProvider for MemoryProvider {
    async fn current_session(&self) -> Result<Option<Session>, ProviderError> {
        let gate = lock(&self.fetch_gate).take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        Ok(lock(&self.current).clone())
    }

    fn on_session_change(&self) -> Subscription {
        self.hub.subscribe()
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<(), ProviderError> {
        let identity = {
            let accounts = lock(&self.accounts);
            let account = accounts
                .get(email)
                .filter(|a| a.password_digest == password_digest(email, password))
                .ok_or_else(|| ProviderError::Rejected { status: 400, message: INVALID_CREDENTIALS.into() })?;
            if !account.confirmed {
                return Err(ProviderError::Rejected { status: 400, message: EMAIL_NOT_CONFIRMED.into() });
            }
            account.identity.clone()
        };

        let session = self.open_session(identity);
        self.hub.emit(&SessionChange::signed_in(session));
        Ok(())
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        options: SignUpOptions,
    ) -> Result<SignUpResponse, ProviderError> {
        self.sign_up_calls.fetch_add(1, Ordering::SeqCst);
        let confirmed = !self.require_confirmation.load(Ordering::SeqCst);

        let identity = {
            let mut accounts = lock(&self.accounts);
            if accounts.contains_key(email) {
                return Err(ProviderError::Rejected { status: 422, message: ALREADY_REGISTERED.into() });
            }
            let identity = Identity { id: Uuid::new_v4(), email: email.to_owned(), metadata: options.metadata };
            accounts.insert(
                email.to_owned(),
                Account { identity: identity.clone(), password_digest: password_digest(email, password), confirmed },
            );
            identity
        };

        if !confirmed {
            tracing::debug!(%email, redirect_to = ?options.redirect_to, "confirmation required");
            return Ok(SignUpResponse { identity, session: None });
        }

        let session = self.open_session(identity.clone());
        self.hub.emit(&SessionChange::signed_in(session.clone()));
        Ok(SignUpResponse { identity, session: Some(session) })
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        if let Some(message) = lock(&self.sign_out_failure).clone() {
            return Err(ProviderError::Rejected { status: 500, message });
        }
        *lock(&self.current) = None;
        self.hub.emit(&SessionChange::signed_out());
        Ok(())
    }
}

#[async_trait::async_trait]
impl ProfileStore for MemoryProvider {
    async fn find_by_email(&self, email: &str) -> Result<Option<Profile>, ProviderError> {
        Ok(lock(&self.profiles).iter().find(|p| p.email == email).cloned())
    }

    async fn insert(&self, profile: Profile) -> Result<(), ProviderError> {
        if let Some(message) = lock(&self.profile_insert_failure).clone() {
            return Err(ProviderError::Profiles(message));
        }
        let mut profiles = lock(&self.profiles);
        if profiles.iter().any(|p| p.id == profile.id) {
            return Err(ProviderError::Profiles(format!("duplicate profile id {}", profile.id)));
        }
        profiles.push(profile);
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
