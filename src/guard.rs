//! Route guard — render, redirect, or wait, based on the session.
//!
//! DESIGN
//! ======
//! `decide` is a pure function of `(SessionState, Route)`. `RouteGuard`
//! wraps a `watch` receiver so its decision is recomputed from the latest
//! state every time the store publishes one, never from a cached snapshot.
//!
//! Protected routes render only when resolved and signed in. Public entry
//! points (`/login`, `/signup`) send signed-in users home. Anything unknown
//! redirects to `/`, which is then guarded like any protected route.

use std::fmt;

use tokio::sync::watch;

use crate::session::SessionState;

/// Redirect chains are at most catch-all → home → login.
const MAX_REDIRECTS: usize = 4;

// =============================================================================
// ROUTES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    SignUp,
    Dashboard,
    Challenges,
    Calendar,
    News,
    Profile,
}

impl Route {
    /// Protected screens in bottom-navigation order.
    pub const NAVIGATION: [Route; 5] = [Route::Dashboard, Route::Challenges, Route::Calendar, Route::News, Route::Profile];

    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::SignUp => "/signup",
            Self::Dashboard => "/",
            Self::Challenges => "/challenges",
            Self::Calendar => "/calendar",
            Self::News => "/news",
            Self::Profile => "/profile",
        }
    }

    /// Navigation label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Login => "Log in",
            Self::SignUp => "Sign up",
            Self::Dashboard => "Home",
            Self::Challenges => "Challenges",
            Self::Calendar => "Calendar",
            Self::News => "News",
            Self::Profile => "Profile",
        }
    }

    #[must_use]
    pub fn is_public(self) -> bool {
        matches!(self, Self::Login | Self::SignUp)
    }

    /// Exact route for a path. Query strings, fragments, and a trailing
    /// slash are ignored.
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        let path = if trimmed.is_empty() { "/" } else { trimmed };
        [Self::Login, Self::SignUp]
            .into_iter()
            .chain(Self::NAVIGATION)
            .find(|r| r.path() == path)
    }

    /// Route a guard lands on for `path`: the exact match, else the
    /// catch-all target (home).
    #[must_use]
    pub fn resolve(path: &str) -> Self {
        Self::from_path(path).unwrap_or_else(|| {
            tracing::debug!(path, "unknown path, redirecting home");
            Self::Dashboard
        })
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

// =============================================================================
// DECISION
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Session not resolved yet; show a neutral loader.
    Loading,
    Render(Route),
    Redirect(Route),
}

/// Guard decision for a known route.
#[must_use]
pub fn decide(state: &SessionState, route: Route) -> RouteDecision {
    if state.is_loading {
        return RouteDecision::Loading;
    }
    match (route.is_public(), state.identity.is_some()) {
        (true, true) => RouteDecision::Redirect(Route::Dashboard),
        (false, false) => RouteDecision::Redirect(Route::Login),
        _ => RouteDecision::Render(route),
    }
}

// =============================================================================
// GUARD
// =============================================================================

/// Live guard for one requested location.
pub struct RouteGuard {
    session: watch::Receiver<SessionState>,
    route: Route,
}

impl RouteGuard {
    /// Guard `path`, following the catch-all redirect immediately.
    #[must_use]
    pub fn new(session: watch::Receiver<SessionState>, path: &str) -> Self {
        let route = Route::resolve(path);
        Self { session, route }
    }

    #[must_use]
    pub fn route(&self) -> Route {
        self.route
    }

    /// Decision for the current route against the latest state.
    #[must_use]
    pub fn decision(&self) -> RouteDecision {
        decide(&self.session.borrow(), self.route)
    }

    /// Follow redirects until the guard renders or waits. Returns the
    /// final decision; the guard's route is updated along the way.
    pub fn settle(&mut self) -> RouteDecision {
        let state = self.session.borrow_and_update().clone();
        let mut decision = decide(&state, self.route);
        for _ in 0..MAX_REDIRECTS {
            let RouteDecision::Redirect(next) = decision else {
                break;
            };
            tracing::debug!(from = %self.route, to = %next, "guard redirect");
            self.route = next;
            decision = decide(&state, next);
        }
        decision
    }

    /// Wait for the next session change and re-settle. Returns `None`
    /// once the session store is gone.
    pub async fn changed(&mut self) -> Option<RouteDecision> {
        self.session.changed().await.ok()?;
        Some(self.settle())
    }

    /// Move to a new location within the app.
    pub fn navigate(&mut self, path: &str) -> RouteDecision {
        self.route = Route::resolve(path);
        self.settle()
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
