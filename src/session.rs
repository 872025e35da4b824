//! Session store — who is logged in right now.
//!
//! DESIGN
//! ======
//! The store owns a `watch` channel holding `SessionState`. Observers (the
//! route guard, screens) hold receivers and re-render on change; only the
//! store's two update handlers ever write to it.
//!
//! `initialize` subscribes to the provider's change stream and, in
//! parallel, fetches the current session. Whichever lands first clears
//! `is_loading`; that flag never comes back. Change notifications are
//! authoritative for `identity` from then on, so a fetch response that
//! arrives after a notification is discarded.
//!
//! `sign_in`/`sign_up`/`sign_out` never write `identity` themselves. The
//! provider's notification is the single path by which a new session
//! reaches the state, so every transition is applied exactly once.
//!
//! LIFECYCLE
//! =========
//! One subscription per store. `dispose` (also run on drop) releases the
//! subscription guard and aborts the listener and fetch tasks, so nothing
//! writes state after teardown.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use time::OffsetDateTime;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::AuthError;
use crate::identity::Identity;
use crate::notify::Notifier;
use crate::provider::{IdentityProvider, Profile, ProfileStore, SignUpOptions, SubscriptionGuard};
use crate::registration::{RegistrationRequest, SignUpOutcome, normalize_email};

// =============================================================================
// STATE
// =============================================================================

/// Observable snapshot of the session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub identity: Option<Identity>,
    pub is_loading: bool,
}

impl SessionState {
    #[must_use]
    pub fn resolving() -> Self {
        Self { identity: None, is_loading: true }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        if self.is_loading { Phase::Resolving } else { Phase::Resolved }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        !self.is_loading && self.identity.is_some()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::resolving()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Resolving,
    Resolved,
}

/// Apply the initial fetch result. Ignored once resolved.
fn apply_fetch(state: &watch::Sender<SessionState>, identity: Option<Identity>) -> bool {
    state.send_if_modified(|s| {
        if !s.is_loading {
            return false;
        }
        s.identity = identity;
        s.is_loading = false;
        true
    })
}

/// Apply a provider change notification. Always authoritative.
fn apply_change(state: &watch::Sender<SessionState>, identity: Option<Identity>) -> bool {
    state.send_if_modified(|s| {
        let modified = s.is_loading || s.identity != identity;
        s.identity = identity;
        s.is_loading = false;
        modified
    })
}

// =============================================================================
// STORE
// =============================================================================

#[derive(Default)]
struct Lifecycle {
    initialized: bool,
    subscription: Option<SubscriptionGuard>,
    tasks: Vec<JoinHandle<()>>,
}

pub struct SessionStore {
    provider: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileStore>,
    notifier: Arc<dyn Notifier>,
    redirect_to: Option<String>,
    state: Arc<watch::Sender<SessionState>>,
    lifecycle: Mutex<Lifecycle>,
}

impl SessionStore {
    #[must_use]
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::resolving());
        Self {
            provider,
            profiles,
            notifier,
            redirect_to: None,
            state: Arc::new(state),
            lifecycle: Mutex::new(Lifecycle::default()),
        }
    }

    /// Where sign-up confirmation links should land.
    #[must_use]
    pub fn with_redirect_target(mut self, target: impl Into<String>) -> Self {
        self.redirect_to = Some(target.into());
        self
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe to provider changes and resolve the initial session.
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AlreadyInitialized`] on any call after the first.
    pub fn initialize(&self) -> Result<(), AuthError> {
        let mut lifecycle = self.lifecycle();
        if lifecycle.initialized {
            return Err(AuthError::AlreadyInitialized);
        }
        lifecycle.initialized = true;

        let (guard, mut events) = self.provider.on_session_change().into_parts();
        lifecycle.subscription = Some(guard);

        let state = self.state.clone();
        let listener = tokio::spawn(async move {
            while let Some(change) = events.recv().await {
                let identity = change.session.map(|s| s.identity);
                let applied = apply_change(&state, identity);
                tracing::debug!(event = ?change.event, applied, "session change");
            }
        });

        let state = self.state.clone();
        let provider = self.provider.clone();
        let fetch = tokio::spawn(async move {
            let identity = match provider.current_session().await {
                Ok(session) => session.map(|s| s.identity),
                Err(e) => {
                    tracing::warn!(error = %e, "initial session fetch failed");
                    None
                }
            };
            let signed_in = identity.is_some();
            if apply_fetch(&state, identity) {
                tracing::info!(signed_in, "session resolved");
            } else {
                tracing::debug!("late session fetch ignored");
            }
        });

        lifecycle.tasks.push(listener);
        lifecycle.tasks.push(fetch);
        Ok(())
    }

    /// Release the subscription and stop background tasks. Idempotent.
    pub fn dispose(&self) {
        let mut lifecycle = self.lifecycle();
        if let Some(mut guard) = lifecycle.subscription.take() {
            guard.unsubscribe();
            tracing::debug!("session store disposed");
        }
        for task in lifecycle.tasks.drain(..) {
            task.abort();
        }
    }

    // -------------------------------------------------------------------------
    // observation
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.state.borrow().phase()
    }

    #[must_use]
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Wait until the initial resolution has happened.
    pub async fn resolved(&self) -> SessionState {
        let mut rx = self.watch();
        let resolved = rx.wait_for(|s| !s.is_loading).await.map(|s| (*s).clone());
        // The sender lives as long as `self`, so the wait cannot fail.
        resolved.unwrap_or_else(|_| self.state())
    }

    // -------------------------------------------------------------------------
    // operations
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns [`AuthError::Authentication`] with the provider's message after
    /// showing it to the user.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), AuthError> {
        // Accounts are created under the normalized address.
        let email = normalize_email(email).unwrap_or_else(|| email.trim().to_owned());
        tracing::debug!(%email, "sign-in requested");
        match self.provider.sign_in_with_password(&email, password).await {
            Ok(()) => {
                tracing::info!("sign-in accepted");
                Ok(())
            }
            Err(e) => {
                let message = e.message();
                tracing::warn!(error = %e, "sign-in failed");
                self.notifier.error(&message);
                Err(AuthError::Authentication(message))
            }
        }
    }

    /// # Errors
    ///
    /// Returns [`AuthError::Authentication`] with the provider's message after
    /// showing it to the user.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        match self.provider.sign_out().await {
            Ok(()) => {
                tracing::info!("sign-out accepted");
                Ok(())
            }
            Err(e) => {
                let message = e.message();
                tracing::warn!(error = %e, "sign-out failed");
                self.notifier.error(&message);
                Err(AuthError::Authentication(message))
            }
        }
    }

    /// Register a new account. Every outcome, including failures, is
    /// reported through the returned [`SignUpOutcome`].
    pub async fn sign_up(&self, email: &str, password: &str, username: &str) -> SignUpOutcome {
        match self.try_sign_up(email, password, username).await {
            Ok(outcome) => outcome,
            Err(AuthError::RegistrationConflict) => {
                tracing::debug!(%email, "sign-up refused: email already registered");
                SignUpOutcome::from_error(&AuthError::RegistrationConflict)
            }
            Err(e) => {
                tracing::error!(error = %e, "sign-up failed");
                SignUpOutcome::from_error(&e)
            }
        }
    }

    async fn try_sign_up(&self, email: &str, password: &str, username: &str) -> Result<SignUpOutcome, AuthError> {
        let request = RegistrationRequest::new(email, password, username)?;

        match self.profiles.find_by_email(&request.email).await {
            Ok(Some(_)) => return Err(AuthError::RegistrationConflict),
            Ok(None) => {}
            // The provider still refuses duplicate accounts on its side.
            Err(e) => {
                tracing::warn!(error = %e, "profile lookup failed; continuing sign-up");
            }
        }

        let mut metadata = serde_json::Map::new();
        metadata.insert("username".into(), serde_json::json!(request.username));
        let options = SignUpOptions { metadata, redirect_to: self.redirect_to.clone() };

        let created = self
            .provider
            .sign_up(&request.email, &request.password, options)
            .await
            .map_err(|e| AuthError::Registration(e.message()))?;

        if created.session.is_none() {
            // Known gap: the account exists upstream with no profile row until
            // something creates it after confirmation.
            tracing::warn!(identity = %created.identity.id, "confirmation required; profile not created");
            return Ok(SignUpOutcome::confirmation_required());
        }

        let profile = Profile {
            id: created.identity.id,
            username: request.username,
            email: request.email,
            created_at: OffsetDateTime::now_utc(),
        };
        self.profiles
            .insert(profile)
            .await
            .map_err(|e| AuthError::Registration(e.message()))?;

        tracing::info!(identity = %created.identity.id, "account registered");
        Ok(SignUpOutcome::registered())
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
