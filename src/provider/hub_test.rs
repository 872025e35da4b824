use super::*;

#[tokio::test]
async fn emit_reaches_every_subscriber() {
    let hub = ChangeHub::new();
    let mut a = hub.subscribe();
    let mut b = hub.subscribe();

    assert_eq!(hub.emit(&SessionChange::signed_out()), 2);
    assert_eq!(a.recv().await, Some(SessionChange::signed_out()));
    assert_eq!(b.recv().await, Some(SessionChange::signed_out()));
}

#[test]
fn dropping_subscription_releases_it() {
    let hub = ChangeHub::new();
    let sub = hub.subscribe();
    assert_eq!(hub.subscriber_count(), 1);
    drop(sub);
    assert_eq!(hub.subscriber_count(), 0);
}

#[tokio::test]
async fn unsubscribe_closes_event_stream() {
    let hub = ChangeHub::new();
    let (mut guard, mut events) = hub.subscribe().into_parts();

    guard.unsubscribe();
    assert!(guard.is_released());
    assert_eq!(hub.subscriber_count(), 0);
    assert!(events.recv().await.is_none());
}

#[test]
fn unsubscribe_twice_is_harmless() {
    let hub = ChangeHub::new();
    let keep = hub.subscribe();
    let (mut guard, _events) = hub.subscribe().into_parts();

    guard.unsubscribe();
    guard.unsubscribe();
    drop(guard);
    assert_eq!(hub.subscriber_count(), 1);
    drop(keep);
}

#[test]
fn emit_prunes_closed_receivers() {
    let hub = ChangeHub::new();
    let (guard, events) = hub.subscribe().into_parts();
    drop(events);

    assert_eq!(hub.emit(&SessionChange::signed_out()), 0);
    assert_eq!(hub.subscriber_count(), 0);
    drop(guard);
}

#[test]
fn guard_outliving_hub_does_not_panic() {
    let hub = ChangeHub::new();
    let sub = hub.subscribe();
    drop(hub);
    drop(sub);
}
