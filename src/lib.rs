//! Session and route-guard core for the scavenger hunt app.
//!
//! ARCHITECTURE
//! ============
//! provider (external identity service) → session store → route guard.
//! The provider emits session changes; the store turns them into a single
//! observable `SessionState`; guards and screens re-evaluate from it.

pub mod app;
pub mod config;
pub mod error;
pub mod guard;
pub mod identity;
pub mod notify;
pub mod provider;
pub mod registration;
pub mod session;

pub use app::AppContext;
pub use error::AuthError;
pub use guard::{Route, RouteDecision, RouteGuard};
pub use identity::{AuthEvent, Identity, Session, SessionChange};
pub use notify::{Notifier, Toast, ToastChannel, ToastLevel};
pub use provider::{IdentityProvider, ProfileStore, ProviderError};
pub use registration::{SignUpOutcome, SignUpStatus};
pub use session::{Phase, SessionState, SessionStore};
