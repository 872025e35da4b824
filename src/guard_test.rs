use super::*;
use crate::identity::Identity;
use uuid::Uuid;

fn state(is_loading: bool, signed_in: bool) -> SessionState {
    let identity = signed_in.then(|| Identity::new(Uuid::new_v4(), "a@b.com"));
    SessionState { identity, is_loading }
}

// =============================================================
// Route table
// =============================================================

#[test]
fn from_path_matches_every_route() {
    for route in [Route::Login, Route::SignUp].into_iter().chain(Route::NAVIGATION) {
        assert_eq!(Route::from_path(route.path()), Some(route));
    }
}

#[test]
fn from_path_ignores_query_fragment_and_trailing_slash() {
    assert_eq!(Route::from_path("/calendar/"), Some(Route::Calendar));
    assert_eq!(Route::from_path("/news?page=2"), Some(Route::News));
    assert_eq!(Route::from_path("/profile#posts"), Some(Route::Profile));
    assert_eq!(Route::from_path(""), Some(Route::Dashboard));
}

#[test]
fn from_path_unknown_is_none() {
    assert_eq!(Route::from_path("/admin"), None);
    assert_eq!(Route::from_path("/calendar/2024"), None);
}

#[test]
fn navigation_order_and_labels() {
    let labels: Vec<_> = Route::NAVIGATION.iter().map(|r| r.label()).collect();
    assert_eq!(labels, ["Home", "Challenges", "Calendar", "News", "Profile"]);
    assert!(Route::NAVIGATION.iter().all(|r| !r.is_public()));
}

// =============================================================
// decide: protected routes, all four combinations
// =============================================================

#[test]
fn protected_loading_signed_out_waits() {
    assert_eq!(decide(&state(true, false), Route::Challenges), RouteDecision::Loading);
}

#[test]
fn protected_loading_signed_in_waits() {
    assert_eq!(decide(&state(true, true), Route::Challenges), RouteDecision::Loading);
}

#[test]
fn protected_resolved_signed_out_redirects_to_login() {
    assert_eq!(decide(&state(false, false), Route::Challenges), RouteDecision::Redirect(Route::Login));
}

#[test]
fn protected_resolved_signed_in_renders() {
    assert_eq!(decide(&state(false, true), Route::Challenges), RouteDecision::Render(Route::Challenges));
}

#[test]
fn protected_renders_iff_resolved_and_signed_in() {
    for is_loading in [false, true] {
        for signed_in in [false, true] {
            let rendered = decide(&state(is_loading, signed_in), Route::Profile) == RouteDecision::Render(Route::Profile);
            assert_eq!(rendered, !is_loading && signed_in, "is_loading={is_loading} signed_in={signed_in}");
        }
    }
}

// =============================================================
// decide: public routes
// =============================================================

#[test]
fn public_route_signed_in_redirects_home() {
    assert_eq!(decide(&state(false, true), Route::Login), RouteDecision::Redirect(Route::Dashboard));
    assert_eq!(decide(&state(false, true), Route::SignUp), RouteDecision::Redirect(Route::Dashboard));
}

#[test]
fn public_route_signed_out_renders() {
    assert_eq!(decide(&state(false, false), Route::SignUp), RouteDecision::Render(Route::SignUp));
}

#[test]
fn public_route_waits_while_loading() {
    assert_eq!(decide(&state(true, false), Route::Login), RouteDecision::Loading);
}

#[test]
fn resolve_sends_unknown_paths_home() {
    assert_eq!(Route::resolve("/nowhere"), Route::Dashboard);
    assert_eq!(Route::resolve("/calendar/2024"), Route::Dashboard);
    assert_eq!(Route::resolve("/news?page=2"), Route::News);
}

// =============================================================
// RouteGuard
// =============================================================

#[test]
fn settle_follows_redirect_chain() {
    let (_tx, rx) = watch::channel(state(false, false));
    let mut guard = RouteGuard::new(rx, "/unknown");
    assert_eq!(guard.route(), Route::Dashboard);
    assert_eq!(guard.settle(), RouteDecision::Render(Route::Login));
    assert_eq!(guard.route(), Route::Login);
}

#[test]
fn navigate_to_login_when_signed_in_lands_home() {
    let (_tx, rx) = watch::channel(state(false, true));
    let mut guard = RouteGuard::new(rx, "/calendar");
    assert_eq!(guard.navigate("/login"), RouteDecision::Render(Route::Dashboard));
}

#[test]
fn navigate_to_unknown_path_lands_home() {
    let (_tx, rx) = watch::channel(state(false, true));
    let mut guard = RouteGuard::new(rx, "/news");
    assert_eq!(guard.navigate("/admin"), RouteDecision::Render(Route::Dashboard));
    assert_eq!(guard.route(), Route::Dashboard);
}

#[tokio::test]
async fn guard_reevaluates_on_every_change() {
    let (tx, rx) = watch::channel(SessionState::resolving());
    let mut guard = RouteGuard::new(rx, "/challenges");
    assert_eq!(guard.settle(), RouteDecision::Loading);

    tx.send(state(false, true)).unwrap();
    assert_eq!(guard.changed().await, Some(RouteDecision::Render(Route::Challenges)));

    tx.send(state(false, false)).unwrap();
    assert_eq!(guard.changed().await, Some(RouteDecision::Render(Route::Login)));

    tx.send(state(false, true)).unwrap();
    assert_eq!(guard.changed().await, Some(RouteDecision::Render(Route::Dashboard)));
}

#[tokio::test]
async fn decision_reads_latest_state_without_waiting() {
    let (tx, rx) = watch::channel(SessionState::resolving());
    let guard = RouteGuard::new(rx, "/news");
    assert_eq!(guard.decision(), RouteDecision::Loading);
    tx.send(state(false, false)).unwrap();
    assert_eq!(guard.decision(), RouteDecision::Redirect(Route::Login));
}

#[tokio::test]
async fn changed_returns_none_when_store_gone() {
    let (tx, rx) = watch::channel(SessionState::resolving());
    let mut guard = RouteGuard::new(rx, "/");
    drop(tx);
    assert_eq!(guard.changed().await, None);
}
