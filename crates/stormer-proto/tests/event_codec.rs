//! Decoding of the events a browser client actually sends.

use serde_json::json;
use stormer_proto::{
    decode, encode, ClientEvent, Frame, IdeaKind, NewIdea, Priority, ProtocolError, ServerEvent,
    SharedIdea, SwotCategory, Template, ToggleTodo,
};

#[test]
fn new_todo_from_browser_payload() {
    let text = json!({
        "event": "new-idea",
        "data": {
            "type": "todo",
            "id": "t1",
            "text": "Draft budget",
            "priority": "high",
            "dueDate": "2025-09-01",
            "completed": false,
            "user": "bob",
            "session": "X7K2QA",
            "timestamp": "2025-08-01T10:00:00.000Z"
        }
    })
    .to_string();

    let frame = Frame::decode(&text).unwrap();
    assert_eq!(frame.event, "new-idea");
    let payload: NewIdea = frame.payload().unwrap();
    assert_eq!(payload.session, "X7K2QA");
    assert_eq!(payload.idea.kind, IdeaKind::Todo);
    assert_eq!(payload.idea.id.as_deref(), Some("t1"));
    assert_eq!(payload.idea.priority, Some(Priority::High));
    assert_eq!(payload.idea.due_date.as_deref(), Some("2025-09-01"));
    assert_eq!(payload.idea.completed, Some(false));
    assert_eq!(payload.idea.timestamp.to_rfc3339(), "2025-08-01T10:00:00+00:00");
}

#[test]
fn swot_entry_keeps_category() {
    let text = r#"{"event":"new-idea","data":{"type":"swot","category":"threats","text":"New competitor","user":"carol","session":"X7K2QA"}}"#;
    let payload: NewIdea = Frame::decode(text).unwrap().payload().unwrap();
    assert_eq!(payload.idea.category, Some(SwotCategory::Threats));
}

#[test]
fn typed_client_event_matches_envelope() {
    let event = ClientEvent::ToggleTodo(ToggleTodo {
        id: "t1".into(),
        session: "X7K2QA".into(),
    });
    let text = encode(&event).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value, json!({"event": "toggle-todo", "data": {"id": "t1", "session": "X7K2QA"}}));
}

#[test]
fn shared_idea_echoes_submitted_fields() {
    let text = json!({
        "event": "new-idea-shared",
        "data": {
            "session": "X7K2QA",
            "type": "todo",
            "id": "t1",
            "text": "Draft budget",
            "priority": "high",
            "dueDate": "2025-09-01",
            "completed": true,
            "user": "bob",
            "timestamp": "2025-08-01T10:00:00Z"
        }
    })
    .to_string();
    match decode::<ServerEvent>(&text).unwrap() {
        ServerEvent::NewIdeaShared(SharedIdea { session, idea }) => {
            assert_eq!(session, "X7K2QA");
            assert_eq!(idea.completed, Some(true));
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn unknown_template_is_invalid_payload() {
    let text = r#"{"event":"create-session","data":{"username":"a","topic":"t","template":"kanban"}}"#;
    let frame = Frame::decode(text).unwrap();
    let err = frame
        .payload::<stormer_proto::CreateSession>()
        .unwrap_err();
    assert!(matches!(err, ProtocolError::InvalidPayload { .. }));
    assert_eq!(err.kind(), "invalid_payload");
}

#[test]
fn session_data_timestamp_is_rfc3339() {
    let text = r#"{"event":"session-data","data":{"code":"X7K2QA","topic":"t","template":"swot","users":["a"],"ideas":[],"timestamp":"2025-08-01T10:00:00Z"}}"#;
    match decode::<ServerEvent>(text).unwrap() {
        ServerEvent::SessionData(data) => {
            assert_eq!(data.template, Template::Swot);
            assert_eq!(data.users, vec!["a".to_string()]);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn garbage_is_malformed() {
    assert!(matches!(Frame::decode("not json"), Err(ProtocolError::Malformed(_))));
    assert!(matches!(Frame::decode("[1,2,3]"), Err(ProtocolError::Malformed(_))));
    assert!(matches!(Frame::decode(r#"{"data":{}}"#), Err(ProtocolError::Malformed(_))));
}
