//! Environment configuration.
//!
//! Values come from the process environment; the binary loads a `.env`
//! file first with `dotenvy`. Absent hosted-service settings fall back to
//! the in-memory provider rather than failing.

const DEFAULT_SITE_URL: &str = "http://localhost:5173";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const LOGIN_PATH: &str = "/login";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown SCAVENGER_PROVIDER: {0}")]
    UnknownProvider(String),
    #[error("missing required env var {0}")]
    Missing(&'static str),
    #[error("invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

// =============================================================================
// HOSTED SERVICE
// =============================================================================

/// Hosted identity service settings.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
    pub timeout_secs: u64,
    /// Session handed over from an earlier sign-in; verified on first fetch.
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl SupabaseConfig {
    /// Load from `SUPABASE_URL`, `SUPABASE_ANON_KEY`, `HTTP_TIMEOUT_SECS`,
    /// and the optional `SUPABASE_ACCESS_TOKEN` / `SUPABASE_REFRESH_TOKEN`.
    /// Returns `None` if the URL or key is missing.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("SUPABASE_URL").ok()?;
        let anon_key = std::env::var("SUPABASE_ANON_KEY").ok()?;
        let timeout_secs = std::env::var("HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        let access_token = non_empty_var("SUPABASE_ACCESS_TOKEN");
        let refresh_token = non_empty_var("SUPABASE_REFRESH_TOKEN");
        Some(Self { url, anon_key, timeout_secs, access_token, refresh_token })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

// =============================================================================
// APP CONFIG
// =============================================================================

#[derive(Debug, Clone)]
pub enum ProviderKind {
    Memory,
    Supabase(SupabaseConfig),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub provider: ProviderKind,
    /// Origin the app is served from; confirmation links land on `<site>/login`.
    pub site_url: String,
}

impl AppConfig {
    /// Read `SCAVENGER_PROVIDER` (`memory` or `supabase`; default: `supabase`
    /// when its settings are present, else `memory`) and `SITE_URL`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for an unknown provider, for `supabase`
    /// without its settings, or for a malformed `SITE_URL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let site_url = std::env::var("SITE_URL").unwrap_or_else(|_| DEFAULT_SITE_URL.into());
        if !(site_url.starts_with("http://") || site_url.starts_with("https://")) {
            return Err(ConfigError::Invalid { var: "SITE_URL", value: site_url });
        }

        let provider = match std::env::var("SCAVENGER_PROVIDER").ok().as_deref().map(str::trim) {
            None | Some("") => SupabaseConfig::from_env().map_or(ProviderKind::Memory, ProviderKind::Supabase),
            Some("memory") => ProviderKind::Memory,
            Some("supabase") => {
                ProviderKind::Supabase(SupabaseConfig::from_env().ok_or(ConfigError::Missing("SUPABASE_URL"))?)
            }
            Some(other) => return Err(ConfigError::UnknownProvider(other.to_owned())),
        };

        Ok(Self { provider, site_url })
    }

    /// Post-confirmation redirect target.
    #[must_use]
    pub fn redirect_target(&self) -> String {
        format!("{}{LOGIN_PATH}", self.site_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
