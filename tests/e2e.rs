//! Start-up → resolve → redirect → sign in → protected content.

use std::sync::Arc;

use scavenger::provider::MemoryProvider;
use scavenger::{Route, RouteDecision, RouteGuard, SessionStore, ToastChannel};

fn store(provider: &Arc<MemoryProvider>) -> SessionStore {
    SessionStore::new(provider.clone(), provider.clone(), Arc::new(ToastChannel::new()))
}

#[tokio::test]
async fn sign_in_flow_reaches_protected_content() {
    let provider = Arc::new(MemoryProvider::new().with_account("a@b.com", "pw", "hunter"));
    let gate = provider.hold_session_fetch();
    let store = store(&provider);

    // Start: loader while the initial fetch is outstanding.
    store.initialize().unwrap();
    let mut guard = RouteGuard::new(store.watch(), "/challenges");
    assert!(store.state().is_loading);
    assert_eq!(guard.settle(), RouteDecision::Loading);

    // Provider resolves with no session: redirect to sign-in.
    gate.release();
    assert_eq!(guard.changed().await, Some(RouteDecision::Render(Route::Login)));
    let state = store.state();
    assert!(!state.is_loading);
    assert!(state.identity.is_none());

    // Sign in; the change notification carries the identity.
    store.sign_in("a@b.com", "pw").await.unwrap();
    assert_eq!(guard.changed().await, Some(RouteDecision::Render(Route::Dashboard)));
    assert_eq!(store.state().identity.unwrap().email, "a@b.com");

    // Back to the originally requested screen.
    assert_eq!(guard.navigate("/challenges"), RouteDecision::Render(Route::Challenges));

    store.dispose();
    assert_eq!(provider.subscriber_count(), 0);
}

#[tokio::test]
async fn sign_up_then_sign_out_round_trip() {
    let provider = Arc::new(MemoryProvider::new());
    let store = store(&provider);
    store.initialize().unwrap();
    store.resolved().await;
    let mut guard = RouteGuard::new(store.watch(), "/signup");
    assert_eq!(guard.settle(), RouteDecision::Render(Route::SignUp));

    let outcome = store.sign_up("new@b.com", "pw", "newbie").await;
    assert!(outcome.success);
    assert_eq!(guard.changed().await, Some(RouteDecision::Render(Route::Dashboard)));

    store.sign_out().await.unwrap();
    assert_eq!(guard.changed().await, Some(RouteDecision::Render(Route::Login)));

    let again = store.sign_up("new@b.com", "pw", "newbie").await;
    assert!(!again.success);
    assert!(again.message.contains("already registered"));
    assert_eq!(provider.sign_up_calls(), 1);
}
