use super::ContentKind;
use super::RemoteIndexEntry;
use super::Role;
use super::Session;
use super::SessionMode;

#[test]
fn it_assigns_contiguous_sequence_numbers() {
    let mut session = Session::new(SessionMode::Chat, None);
    session.push_message(Role::User, ContentKind::Text, "one");
    session.push_message(Role::Assistant, ContentKind::Text, "two");
    session.push_message(Role::User, ContentKind::Code, "three");

    let seqs = session
        .messages
        .iter()
        .map(|message| {
            return message.seq;
        })
        .collect::<Vec<i64>>();
    assert_eq!(seqs, vec![1, 2, 3]);
}

#[test]
fn it_never_decreases_updated_at() {
    let mut session = Session::new(SessionMode::Plan, Some("/tmp/project".to_string()));
    assert!(session.updated_at_ms >= session.created_at_ms);

    let before = session.updated_at_ms;
    session.touch();
    assert!(session.updated_at_ms > before);

    // Simulate a wall clock far in the future already recorded on the session.
    session.updated_at_ms = i64::MAX - 10;
    session.touch();
    assert_eq!(session.updated_at_ms, i64::MAX - 9);
}

#[test]
fn it_builds_summaries_and_index_entries() {
    let mut session = Session::new(SessionMode::Build, None);
    session.title = "fix the build".to_string();
    session.push_message(Role::User, ContentKind::Text, "why is CI red?");

    let summary = session.summary();
    assert_eq!(summary.id, session.id);
    assert_eq!(summary.message_count, 1);
    assert_eq!(summary.updated_at_ms, session.updated_at_ms);

    let entry = RemoteIndexEntry::from_summary(&summary);
    assert_eq!(entry.title, "fix the build");
    assert_eq!(entry.updated_at_ms, session.updated_at_ms);
}

#[test]
fn it_serializes_index_entries_with_wire_names() {
    let entry = RemoteIndexEntry {
        id: "abc".to_string(),
        title: "t".to_string(),
        mode: SessionMode::Chat,
        updated_at_ms: 42,
    };

    let json = serde_json::to_value(&entry).unwrap();
    assert_eq!(
        json,
        serde_json::json!({ "id": "abc", "title": "t", "mode": "chat", "updatedAt": 42 })
    );
}
