//! Sign-up request and outcome types.

use serde::Serialize;

use crate::error::AuthError;

pub const MSG_CHECK_EMAIL: &str = "Registration successful! Please check your email for verification.";
pub const MSG_REGISTERED: &str = "Registration successful! You can now log in.";
pub const MSG_FALLBACK: &str = "An error occurred during registration.";

/// Lower-case and trim an email; `None` unless it looks like `local@domain`.
#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    let (local, domain) = normalized.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return None;
    }
    Some(normalized)
}

/// Transient sign-up input; never stored.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    pub email: String,
    pub password: String,
    pub username: String,
}

impl RegistrationRequest {
    /// Validate and normalize the raw form input.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Registration`] for a malformed email or an
    /// empty username or password.
    pub fn new(email: &str, password: &str, username: &str) -> Result<Self, AuthError> {
        let email = normalize_email(email).ok_or_else(|| AuthError::Registration("Invalid email address.".into()))?;
        if password.is_empty() {
            return Err(AuthError::Registration("Password is required.".into()));
        }
        let username = username.trim();
        if username.is_empty() {
            return Err(AuthError::Registration("Username is required.".into()));
        }
        Ok(Self { email, password: password.to_owned(), username: username.to_owned() })
    }
}

/// Which way a sign-up ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignUpStatus {
    Registered,
    ConfirmationRequired,
    AlreadyRegistered,
    Failed,
}

/// Discriminated sign-up result. Sign-up reports every outcome this way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignUpOutcome {
    pub success: bool,
    pub message: String,
    #[serde(skip)]
    pub status: SignUpStatus,
}

impl SignUpOutcome {
    #[must_use]
    pub fn registered() -> Self {
        Self { success: true, message: MSG_REGISTERED.into(), status: SignUpStatus::Registered }
    }

    #[must_use]
    pub fn confirmation_required() -> Self {
        Self { success: true, message: MSG_CHECK_EMAIL.into(), status: SignUpStatus::ConfirmationRequired }
    }

    /// Downgrade an error to a failure result.
    #[must_use]
    pub fn from_error(err: &AuthError) -> Self {
        let status = match err {
            AuthError::RegistrationConflict => SignUpStatus::AlreadyRegistered,
            _ => SignUpStatus::Failed,
        };
        let mut message = err.to_string();
        if message.trim().is_empty() {
            message = MSG_FALLBACK.into();
        }
        Self { success: false, message, status }
    }
}

#[cfg(test)]
#[path = "registration_test.rs"]
mod tests;
