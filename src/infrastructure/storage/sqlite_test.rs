use anyhow::Result;

use super::SqliteStore;
use crate::domain::models::ContentKind;
use crate::domain::models::Role;
use crate::domain::models::Session;
use crate::domain::models::SessionMode;
use crate::domain::models::SessionStore;

fn session_with_messages(title: &str, contents: &[&str]) -> Session {
    let mut session = Session::new(SessionMode::Chat, None);
    session.title = title.to_string();
    for content in contents {
        session.push_message(Role::User, ContentKind::Text, content);
    }
    return session;
}

#[tokio::test]
async fn it_round_trips_a_session() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = SqliteStore::open(&dir.path().join("sessions.db"))?;

    let mut session = session_with_messages("round trip", &["hello", "world"]);
    session.project_path = Some("/home/user/project".to_string());
    session.plan = Some(serde_json::json!({ "steps": ["a", "b"] }));
    session.messages[1].metadata = Some(serde_json::json!({ "tokens": 12 }));
    store.save_session(&session).await?;

    let loaded = store.load_session(&session.id).await?.unwrap();
    assert_eq!(loaded, session);
    return Ok(());
}

#[tokio::test]
async fn it_returns_none_for_missing_ids() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = SqliteStore::open(&dir.path().join("sessions.db"))?;

    assert!(store.load_session("nope").await?.is_none());
    return Ok(());
}

#[tokio::test]
async fn it_overwrites_on_upsert() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = SqliteStore::open(&dir.path().join("sessions.db"))?;

    let mut session = session_with_messages("before", &["one", "two", "three"]);
    store.save_session(&session).await?;

    session.title = "after".to_string();
    session.messages.truncate(1);
    store.save_session(&session).await?;

    let loaded = store.load_session(&session.id).await?.unwrap();
    assert_eq!(loaded.title, "after");
    assert_eq!(loaded.messages.len(), 1);
    return Ok(());
}

#[tokio::test]
async fn it_lists_by_recency_with_a_cap() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = SqliteStore::open(&dir.path().join("sessions.db"))?;

    let mut oldest = session_with_messages("oldest", &["a"]);
    let mut middle = session_with_messages("middle", &["a", "b"]);
    let mut newest = session_with_messages("newest", &[]);
    oldest.updated_at_ms = 100;
    middle.updated_at_ms = 200;
    newest.updated_at_ms = 300;

    store.save_session(&middle).await?;
    store.save_session(&oldest).await?;
    store.save_session(&newest).await?;

    let summaries = store.list_sessions(2).await?;
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].title, "newest");
    assert_eq!(summaries[0].message_count, 0);
    assert_eq!(summaries[1].title, "middle");
    assert_eq!(summaries[1].message_count, 2);
    return Ok(());
}

#[tokio::test]
async fn it_deletes_sessions_and_their_messages() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = SqliteStore::open(&dir.path().join("sessions.db"))?;

    let session = session_with_messages("doomed", &["a", "b"]);
    store.save_session(&session).await?;
    store.delete_session(&session.id).await?;

    assert!(store.load_session(&session.id).await?.is_none());
    assert!(store.is_empty().await?);
    return Ok(());
}

#[tokio::test]
async fn it_clears_everything() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = SqliteStore::open(&dir.path().join("sessions.db"))?;

    store
        .save_session(&session_with_messages("one", &["a"]))
        .await?;
    store
        .save_session(&session_with_messages("two", &["b"]))
        .await?;
    assert!(!store.is_empty().await?);

    store.clear_all().await?;
    assert!(store.is_empty().await?);
    assert!(store.list_sessions(10).await?.is_empty());
    return Ok(());
}

#[tokio::test]
async fn it_replaces_the_backing_file() -> Result<()> {
    let dir = tempfile::tempdir()?;

    let donor = SqliteStore::open(&dir.path().join("donor.db"))?;
    let session = session_with_messages("from donor", &["hello"]);
    donor.save_session(&session).await?;
    let donor_bytes = std::fs::read(donor.backing_file().unwrap())?;

    let store = SqliteStore::open(&dir.path().join("sessions.db"))?;
    store
        .save_session(&session_with_messages("stale", &[]))
        .await?;
    store.replace_backing(&donor_bytes).await?;

    let loaded = store.load_session(&session.id).await?.unwrap();
    assert_eq!(loaded.title, "from donor");
    assert_eq!(store.list_sessions(10).await?.len(), 1);
    return Ok(());
}

#[tokio::test]
async fn it_refuses_to_open_garbage_read_only() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("garbage.db");
    std::fs::write(&path, b"definitely not a database")?;

    assert!(SqliteStore::open_read_only(&path).is_err());
    return Ok(());
}

#[tokio::test]
async fn it_enumerates_all_session_ids() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = SqliteStore::open(&dir.path().join("sessions.db"))?;

    let first = session_with_messages("one", &[]);
    let second = session_with_messages("two", &[]);
    store.save_session(&first).await?;
    store.save_session(&second).await?;

    let mut ids = store.session_ids()?;
    ids.sort();
    let mut expected = vec![first.id, second.id];
    expected.sort();
    assert_eq!(ids, expected);
    return Ok(());
}
