//! Hosted identity service client.
//!
//! Thin HTTP wrapper over the service's auth endpoints (`/auth/v1/*`) and
//! its REST table endpoint for profiles (`/rest/v1/profiles`). Like the
//! service's own browser client, it keeps the active session in memory and
//! emits a change notification after every call that alters it. Response
//! parsing lives in free functions so it can be tested without a server.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Deserialize;

use super::{
    ChangeHub, IdentityProvider, Profile, ProfileStore, ProviderError, SignUpOptions, SignUpResponse, Subscription,
};
use crate::config::SupabaseConfig;
use crate::identity::{Identity, Session, SessionChange};

const CONNECT_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// CLIENT
// =============================================================================

pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    current: Mutex<Option<Session>>,
    /// Token handed over from a previous run, verified on first fetch.
    stored: Mutex<Option<StoredToken>>,
    hub: ChangeHub,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct StoredToken {
    access_token: String,
    refresh_token: Option<String>,
}

impl SupabaseClient {
    /// # Errors
    ///
    /// Returns [`ProviderError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: &SupabaseConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        let stored = config.access_token.clone().map(|access_token| StoredToken {
            access_token,
            refresh_token: config.refresh_token.clone(),
        });
        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_owned(),
            anon_key: config.anon_key.clone(),
            current: Mutex::new(None),
            stored: Mutex::new(stored),
            hub: ChangeHub::new(),
        })
    }

    fn lock_current(&self) -> MutexGuard<'_, Option<Session>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_stored(&self) -> MutexGuard<'_, Option<StoredToken>> {
        self.stored.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Token to verify: the live session's, else the stored one.
    fn active_token(&self) -> Option<StoredToken> {
        let live = self.lock_current().as_ref().map(|s| StoredToken {
            access_token: s.access_token.clone(),
            refresh_token: s.refresh_token.clone(),
        });
        live.or_else(|| self.lock_stored().clone())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Bearer for table requests: the user's token when signed in, else the anon key.
    fn bearer(&self) -> String {
        self.active_token()
            .map_or_else(|| self.anon_key.clone(), |t| t.access_token)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<(u16, String), ProviderError> {
        let response = request
            .header("apikey", &self.anon_key)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        if !(200..300).contains(&status) {
            return Err(parse_error(status, &body));
        }
        Ok((status, body))
    }

    fn adopt(&self, session: Session) {
        *self.lock_current() = Some(session.clone());
        self.hub.emit(&SessionChange::signed_in(session));
    }
}

#[async_trait::async_trait]
impl IdentityProvider for SupabaseClient {
    async fn current_session(&self) -> Result<Option<Session>, ProviderError> {
        let Some(token) = self.active_token() else {
            return Ok(None);
        };

        let request = self
            .http
            .get(self.url("/auth/v1/user"))
            .bearer_auth(&token.access_token);
        match self.send(request).await {
            Ok((_, body)) => {
                let identity = parse_identity(&body)?;
                let session =
                    Session { access_token: token.access_token, refresh_token: token.refresh_token, identity };
                *self.lock_current() = Some(session.clone());
                *self.lock_stored() = None;
                Ok(Some(session))
            }
            Err(ProviderError::Rejected { status: 401 | 403, .. }) => {
                tracing::info!("stored session no longer valid");
                *self.lock_current() = None;
                *self.lock_stored() = None;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn on_session_change(&self) -> Subscription {
        self.hub.subscribe()
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<(), ProviderError> {
        let request = self
            .http
            .post(self.url("/auth/v1/token"))
            .query(&[("grant_type", "password")])
            .json(&serde_json::json!({ "email": email, "password": password }));
        let (_, body) = self.send(request).await?;
        let session: Session = serde_json::from_str(&body).map_err(|e| ProviderError::Decode(e.to_string()))?;
        self.adopt(session);
        Ok(())
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        options: SignUpOptions,
    ) -> Result<SignUpResponse, ProviderError> {
        let mut request = self.http.post(self.url("/auth/v1/signup")).json(&serde_json::json!({
            "email": email,
            "password": password,
            "data": options.metadata,
        }));
        if let Some(redirect_to) = &options.redirect_to {
            request = request.query(&[("redirect_to", redirect_to.as_str())]);
        }
        let (_, body) = self.send(request).await?;
        let response = parse_sign_up(&body)?;
        if let Some(session) = &response.session {
            self.adopt(session.clone());
        }
        Ok(response)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        if let Some(token) = self.active_token() {
            let request = self.http.post(self.url("/auth/v1/logout")).bearer_auth(token.access_token);
            self.send(request).await?;
        }
        *self.lock_current() = None;
        *self.lock_stored() = None;
        self.hub.emit(&SessionChange::signed_out());
        Ok(())
    }
}

#[async_trait::async_trait]
impl ProfileStore for SupabaseClient {
    async fn find_by_email(&self, email: &str) -> Result<Option<Profile>, ProviderError> {
        let request = self
            .http
            .get(self.url("/rest/v1/profiles"))
            .query(&[("select", "*".to_owned()), ("email", format!("eq.{email}"))])
            .bearer_auth(self.bearer());
        let (_, body) = self.send(request).await.map_err(into_profiles_error)?;
        parse_profiles(&body).map(|rows| rows.into_iter().next())
    }

    async fn insert(&self, profile: Profile) -> Result<(), ProviderError> {
        let request = self
            .http
            .post(self.url("/rest/v1/profiles"))
            .header("Prefer", "return=minimal")
            .bearer_auth(self.bearer())
            .json(&[profile]);
        self.send(request).await.map_err(into_profiles_error)?;
        Ok(())
    }
}

fn into_profiles_error(e: ProviderError) -> ProviderError {
    match e {
        ProviderError::Rejected { message, .. } => ProviderError::Profiles(message),
        other => other,
    }
}

// =============================================================================
// RESPONSE PARSING
// =============================================================================

#[derive(Deserialize)]
struct ErrorBody {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

/// Build a rejection from a non-2xx response, preferring the service's own wording.
#[must_use]
pub fn parse_error(status: u16, body: &str) -> ProviderError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error_description.or(b.msg).or(b.message).or(b.error))
        .unwrap_or_else(|| if body.trim().is_empty() { format!("HTTP {status}") } else { body.trim().to_owned() });
    ProviderError::Rejected { status, message }
}

/// Parse a bare user object, or one nested under `user`.
///
/// # Errors
///
/// Returns [`ProviderError::Decode`] if neither shape matches.
pub fn parse_identity(body: &str) -> Result<Identity, ProviderError> {
    let value: serde_json::Value = serde_json::from_str(body).map_err(|e| ProviderError::Decode(e.to_string()))?;
    let user = value.get("user").cloned().unwrap_or(value);
    serde_json::from_value(user).map_err(|e| ProviderError::Decode(e.to_string()))
}

/// Sign-up answers with a full session when the account is usable right
/// away, and with just the user when confirmation is pending.
///
/// # Errors
///
/// Returns [`ProviderError::Decode`] if the body is neither shape.
pub fn parse_sign_up(body: &str) -> Result<SignUpResponse, ProviderError> {
    let value: serde_json::Value = serde_json::from_str(body).map_err(|e| ProviderError::Decode(e.to_string()))?;
    if value.get("access_token").is_some_and(|t| !t.is_null()) {
        let session: Session = serde_json::from_value(value).map_err(|e| ProviderError::Decode(e.to_string()))?;
        return Ok(SignUpResponse { identity: session.identity.clone(), session: Some(session) });
    }
    let identity = parse_identity(body)?;
    Ok(SignUpResponse { identity, session: None })
}

/// # Errors
///
/// Returns [`ProviderError::Profiles`] if the rows cannot be decoded.
pub fn parse_profiles(body: &str) -> Result<Vec<Profile>, ProviderError> {
    serde_json::from_str(body).map_err(|e| ProviderError::Profiles(format!("bad profile rows: {e}")))
}

#[cfg(test)]
#[path = "supabase_test.rs"]
mod tests;
