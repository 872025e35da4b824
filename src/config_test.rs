use super::*;

// =============================================================================
// from_env — env manipulation requires unsafe in edition 2024.
// All env-touching assertions live in one test so they cannot race.
// =============================================================================

/// # Safety
/// Only called from the single env-driven test below.
unsafe fn clear_env() {
    unsafe {
        for var in [
            "SCAVENGER_PROVIDER", "SUPABASE_URL", "SUPABASE_ANON_KEY", "HTTP_TIMEOUT_SECS", "SITE_URL",
            "SUPABASE_ACCESS_TOKEN",
            "SUPABASE_REFRESH_TOKEN",
        ] {
            std::env::remove_var(var);
        }
    }
}

#[test]
fn from_env_selects_provider() {
    unsafe { clear_env() };
    let config = AppConfig::from_env().unwrap();
    assert!(matches!(config.provider, ProviderKind::Memory));
    assert_eq!(config.site_url, "http://localhost:5173");

    unsafe {
        std::env::set_var("SUPABASE_URL", "https://proj.supabase.co");
        std::env::set_var("SUPABASE_ANON_KEY", "anon");
        std::env::set_var("HTTP_TIMEOUT_SECS", "7");
    }
    match AppConfig::from_env().unwrap().provider {
        ProviderKind::Supabase(sb) => {
            assert_eq!(sb.url, "https://proj.supabase.co");
            assert_eq!(sb.anon_key, "anon");
            assert_eq!(sb.timeout_secs, 7);
            assert_eq!(sb.access_token, None);
        }
        ProviderKind::Memory => panic!("expected supabase provider"),
    }

    unsafe {
        std::env::set_var("SUPABASE_ACCESS_TOKEN", " user-token ");
        std::env::set_var("SUPABASE_REFRESH_TOKEN", "");
    }
    match AppConfig::from_env().unwrap().provider {
        ProviderKind::Supabase(sb) => {
            assert_eq!(sb.access_token.as_deref(), Some("user-token"));
            assert_eq!(sb.refresh_token, None);
        }
        ProviderKind::Memory => panic!("expected supabase provider"),
    }

    unsafe { std::env::set_var("SCAVENGER_PROVIDER", "memory") };
    assert!(matches!(AppConfig::from_env().unwrap().provider, ProviderKind::Memory));

    unsafe { std::env::set_var("SCAVENGER_PROVIDER", "firebase") };
    assert!(matches!(AppConfig::from_env(), Err(ConfigError::UnknownProvider(p)) if p == "firebase"));

    unsafe {
        clear_env();
        std::env::set_var("SCAVENGER_PROVIDER", "supabase");
    }
    assert!(matches!(AppConfig::from_env(), Err(ConfigError::Missing("SUPABASE_URL"))));

    unsafe {
        clear_env();
        std::env::set_var("SITE_URL", "localhost:3000");
    }
    assert!(matches!(AppConfig::from_env(), Err(ConfigError::Invalid { var: "SITE_URL", .. })));

    unsafe { clear_env() };
}

// =============================================================================
// redirect_target
// =============================================================================

#[test]
fn redirect_target_appends_login() {
    let config = AppConfig { provider: ProviderKind::Memory, site_url: "https://hunt.example.com".into() };
    assert_eq!(config.redirect_target(), "https://hunt.example.com/login");
}

#[test]
fn redirect_target_trims_trailing_slash() {
    let config = AppConfig { provider: ProviderKind::Memory, site_url: "https://hunt.example.com/".into() };
    assert_eq!(config.redirect_target(), "https://hunt.example.com/login");
}

#[test]
fn config_error_display() {
    assert!(ConfigError::Missing("SUPABASE_URL").to_string().contains("SUPABASE_URL"));
    assert!(ConfigError::UnknownProvider("x".into()).to_string().contains("x"));
}
