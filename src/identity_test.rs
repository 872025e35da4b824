use super::*;

#[test]
fn identity_username_reads_metadata() {
    let mut identity = Identity::new(Uuid::new_v4(), "a@b.com");
    assert!(identity.username().is_none());
    identity.metadata.insert("username".into(), serde_json::json!("hunter"));
    assert_eq!(identity.username(), Some("hunter"));
}

#[test]
fn identity_username_ignores_non_string_metadata() {
    let mut identity = Identity::new(Uuid::new_v4(), "a@b.com");
    identity.metadata.insert("username".into(), serde_json::json!(42));
    assert!(identity.username().is_none());
}

#[test]
fn session_deserializes_provider_shape() {
    let json = r#"{
        "access_token": "tok",
        "refresh_token": "ref",
        "user": {
            "id": "6f1c2b4e-8a0d-4c9e-9f51-2f7c3d1a0b11",
            "email": "a@b.com",
            "user_metadata": {"username": "hunter"}
        }
    }"#;
    let session: Session = serde_json::from_str(json).unwrap();
    assert_eq!(session.access_token, "tok");
    assert_eq!(session.refresh_token.as_deref(), Some("ref"));
    assert_eq!(session.identity.email, "a@b.com");
    assert_eq!(session.identity.username(), Some("hunter"));
}

#[test]
fn session_deserializes_without_metadata_or_refresh() {
    let json = r#"{
        "access_token": "tok",
        "user": {"id": "6f1c2b4e-8a0d-4c9e-9f51-2f7c3d1a0b11", "email": "a@b.com"}
    }"#;
    let session: Session = serde_json::from_str(json).unwrap();
    assert!(session.refresh_token.is_none());
    assert!(session.identity.metadata.is_empty());
}

#[test]
fn change_identity_follows_session() {
    let identity = Identity::new(Uuid::new_v4(), "a@b.com");
    let change = SessionChange::signed_in(Session {
        access_token: "t".into(),
        refresh_token: None,
        identity: identity.clone(),
    });
    assert_eq!(change.event, AuthEvent::SignedIn);
    assert_eq!(change.identity(), Some(&identity));
    assert!(SessionChange::signed_out().identity().is_none());
}

#[test]
fn auth_event_serializes_screaming_snake() {
    let json = serde_json::to_string(&AuthEvent::TokenRefreshed).unwrap();
    assert_eq!(json, "\"TOKEN_REFRESHED\"");
}
