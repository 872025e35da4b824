//! Session-store error taxonomy.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Sign-in or sign-out refused by the provider. Carries its message.
    #[error("{0}")]
    Authentication(String),
    /// Email already has a profile record.
    #[error("This email is already registered. Please try logging in instead.")]
    RegistrationConflict,
    /// Any other sign-up failure.
    #[error("{0}")]
    Registration(String),
    #[error("session store already initialized")]
    AlreadyInitialized,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_displays_provider_message() {
        let err = AuthError::Authentication("Invalid login credentials".into());
        assert_eq!(err.to_string(), "Invalid login credentials");
    }

    #[test]
    fn conflict_mentions_already_registered() {
        assert!(AuthError::RegistrationConflict.to_string().contains("already registered"));
    }

    #[test]
    fn already_initialized_display() {
        assert!(AuthError::AlreadyInitialized.to_string().contains("initialized"));
    }
}
