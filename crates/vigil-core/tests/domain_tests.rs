use vigil_core::{CallerIdentity, Domain, RealtimeEvent, Result, VigilError};

mod common;

#[test]
fn test_authenticated_workflow() {
    fn load_addresses(identity: &CallerIdentity) -> Result<String> {
        let subject = identity.require_subject()?;
        Ok(format!("addresses of {}", subject))
    }

    assert_eq!(
        load_addresses(&CallerIdentity::from_subject(Some("u-7"))).unwrap(),
        "addresses of u-7"
    );

    let result = load_addresses(&CallerIdentity::Anonymous);
    match result {
        Err(err @ VigilError::AuthenticationRequired { .. }) => {
            assert!(err.is_user_visible());
            assert!(!err.message().is_empty());
        },
        other => panic!("Expected AuthenticationRequired, got {:?}", other),
    }
}

#[test]
fn test_domain_from_route_segment() {
    let parsed: Vec<Domain> = ["admin", "BLOG", "ecommerce", " profile ", "workspace"]
        .iter()
        .map(|s| s.parse().unwrap())
        .collect();

    assert_eq!(parsed, Domain::ALL.to_vec());
    assert!("orders".parse::<Domain>().is_err());
}

#[test]
fn test_full_upsert_payload() {
    let event = common::event(&common::upsert_payload("evt-10", "c-3"));

    let RealtimeEvent::Upsert {
        event_id,
        conversation,
    } = event
    else {
        panic!("Expected Upsert");
    };

    assert_eq!(event_id.as_deref(), Some("evt-10"));
    assert_eq!(conversation.id, "c-3");
    assert_eq!(conversation.title.as_deref(), Some("Release planning"));
    assert_eq!(conversation.unread_count, 4);
    assert!(conversation.updated_at.is_some());
    assert_eq!(conversation.extra["participants"][1], "u2");
}

#[test]
fn test_upsert_with_broken_conversation_is_malformed() {
    let result = RealtimeEvent::parse(r#"{"type":"conversation.updated","conversation":{"title":"no id"}}"#);

    let err = result.unwrap_err();
    assert!(matches!(err, VigilError::MalformedEvent { .. }));
    assert!(err.message().contains("conversation.updated"));
}

#[test]
fn test_summary_serializes_camel_case() {
    let json = serde_json::to_value(common::summary("c1", 2)).unwrap();

    assert_eq!(json["id"], "c1");
    assert_eq!(json["unreadCount"], 2);
    assert_eq!(json["title"], "Conversation c1");
    assert!(json.get("lastMessagePreview").is_none());
}
