//! Application wiring.
//!
//! DESIGN
//! ======
//! `AppContext` is what the view layer receives: the shared session store
//! and the toast channel. Screens and guards take it by injection instead
//! of reaching for globals. Clone is cheap, everything inside is shared.
//!
//! Without a view layer (the CLI) nothing reads the channel, so
//! `with_notifier` routes toasts somewhere else, usually the log.

use std::sync::Arc;

use crate::config::{AppConfig, ProviderKind};
use crate::guard::RouteGuard;
use crate::notify::{Notifier, ToastChannel};
use crate::provider::{MemoryProvider, ProviderError, SupabaseClient};
use crate::session::SessionStore;

pub const DEMO_EMAIL: &str = "demo@scavenger.app";
pub const DEMO_PASSWORD: &str = "treasure";
const DEMO_USERNAME: &str = "demo";

#[derive(Clone)]
pub struct AppContext {
    pub session: Arc<SessionStore>,
    pub toasts: ToastChannel,
}

impl AppContext {
    /// Build the provider named by `config` and a store around it.
    /// The in-memory provider is seeded with one demo account.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] if the HTTP client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderError> {
        let toasts = ToastChannel::new();
        Self::with_notifier(config, Arc::new(toasts.clone()), toasts)
    }

    /// Like [`AppContext::from_config`], but toasts go to `notifier`
    /// instead of `toasts`.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] if the HTTP client cannot be built.
    pub fn with_notifier(
        config: &AppConfig,
        notifier: Arc<dyn Notifier>,
        toasts: ToastChannel,
    ) -> Result<Self, ProviderError> {
        let store = match &config.provider {
            ProviderKind::Memory => {
                tracing::info!(email = DEMO_EMAIL, "using in-memory identity provider");
                let provider = Arc::new(MemoryProvider::new().with_account(DEMO_EMAIL, DEMO_PASSWORD, DEMO_USERNAME));
                SessionStore::new(provider.clone(), provider, notifier)
            }
            ProviderKind::Supabase(sb) => {
                tracing::info!(url = %sb.url, "using hosted identity provider");
                if sb.access_token.is_some() {
                    tracing::debug!("restoring session from SUPABASE_ACCESS_TOKEN");
                }
                let provider = Arc::new(SupabaseClient::new(sb)?);
                SessionStore::new(provider.clone(), provider, notifier)
            }
        };
        let store = store.with_redirect_target(config.redirect_target());
        Ok(Self { session: Arc::new(store), toasts })
    }

    /// Guard for `path`, bound to this context's session.
    #[must_use]
    pub fn guard(&self, path: &str) -> RouteGuard {
        RouteGuard::new(self.session.watch(), path)
    }
}
