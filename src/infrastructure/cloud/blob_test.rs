use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use mockito::Matcher;

use super::multipart_related;
use super::RemoteBlobChannel;
use crate::domain::models::BlobChannel;
use crate::domain::models::CredentialSet;
use crate::infrastructure::cloud::CredentialFile;
use crate::infrastructure::cloud::CredentialManager;
use crate::infrastructure::cloud::OAuthConfig;

async fn signed_in_auth(dir: &std::path::Path) -> Result<Arc<CredentialManager>> {
    let file = CredentialFile::new(dir);
    file.store(&CredentialSet {
        access_token: "bearer-token".to_string(),
        refresh_token: None,
        expires_at: chrono::Utc::now().timestamp() + 3600,
        email: "user@example.com".to_string(),
        display_name: "Test User".to_string(),
    })
    .await?;

    let config = OAuthConfig {
        client_id: "test-client".to_string(),
        client_secret: "test-secret".to_string(),
        auth_url: "https://provider.example/auth".to_string(),
        token_url: "http://127.0.0.1:1/token".to_string(),
        userinfo_url: "http://127.0.0.1:1/userinfo".to_string(),
        redirect_port: 0,
        request_timeout: Duration::from_secs(2),
        callback_timeout: Duration::from_secs(5),
    };
    return Ok(Arc::new(CredentialManager::new(config, file)));
}

fn channel(server_url: &str, auth: Arc<CredentialManager>) -> RemoteBlobChannel {
    return RemoteBlobChannel::with_urls(server_url.to_string(), server_url.to_string(), auth);
}

#[test]
fn it_builds_multipart_bodies_at_the_byte_level() {
    let payload = b"binary\x00\xff\xfe--payload\r\nwith newlines";
    let metadata = serde_json::json!({ "name": "granary.db" });
    let body = multipart_related("BOUNDARY", &metadata, "application/octet-stream", payload);

    let expected_head = format!(
        "--BOUNDARY\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n--BOUNDARY\r\nContent-Type: application/octet-stream\r\n\r\n"
    );
    assert!(body.starts_with(expected_head.as_bytes()));
    assert!(body.ends_with(b"\r\n--BOUNDARY--\r\n"));

    // The payload bytes must appear verbatim, untouched by any text decoding.
    let payload_start = expected_head.len();
    assert_eq!(&body[payload_start..payload_start + payload.len()], payload);
}

#[tokio::test]
async fn it_finds_a_blob_by_name() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let auth = signed_in_auth(dir.path()).await?;

    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/files")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("spaces".to_string(), "appDataFolder".to_string()),
            Matcher::UrlEncoded(
                "q".to_string(),
                "name = 'granary.db' and trashed = false".to_string(),
            ),
        ]))
        .match_header("Authorization", "Bearer bearer-token")
        .with_status(200)
        .with_body(r#"{ "files": [{ "id": "remote-id-1", "name": "granary.db" }] }"#)
        .create();

    let res = channel(&server.url(), auth).find_by_name("granary.db").await?;
    mock.assert();
    assert_eq!(res.as_deref(), Some("remote-id-1"));
    return Ok(());
}

#[tokio::test]
async fn it_returns_none_when_the_blob_is_absent() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let auth = signed_in_auth(dir.path()).await?;

    let mut server = mockito::Server::new();
    server
        .mock("GET", "/files")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{ "files": [] }"#)
        .create();

    let res = channel(&server.url(), auth).find_by_name("granary.db").await?;
    assert!(res.is_none());
    return Ok(());
}

#[tokio::test]
async fn it_creates_a_blob_with_multipart_upload() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let auth = signed_in_auth(dir.path()).await?;

    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/files")
        .match_query(Matcher::UrlEncoded(
            "uploadType".to_string(),
            "multipart".to_string(),
        ))
        .match_header("Authorization", "Bearer bearer-token")
        .match_header(
            "Content-Type",
            Matcher::Regex("multipart/related; boundary=.+".to_string()),
        )
        .with_status(200)
        .with_body(r#"{ "id": "created-id" }"#)
        .create();

    let id = channel(&server.url(), auth)
        .upload("granary.db", b"db bytes", "application/octet-stream", None)
        .await?;
    mock.assert();
    assert_eq!(id, "created-id");
    return Ok(());
}

#[tokio::test]
async fn it_replaces_an_existing_blob_in_place() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let auth = signed_in_auth(dir.path()).await?;

    let mut server = mockito::Server::new();
    let mock = server
        .mock("PATCH", "/files/existing-id")
        .match_query(Matcher::UrlEncoded(
            "uploadType".to_string(),
            "multipart".to_string(),
        ))
        .with_status(200)
        .with_body(r#"{ "id": "existing-id" }"#)
        .create();

    let id = channel(&server.url(), auth)
        .upload(
            "granary.db",
            b"new bytes",
            "application/octet-stream",
            Some("existing-id"),
        )
        .await?;
    mock.assert();
    assert_eq!(id, "existing-id");
    return Ok(());
}

#[tokio::test]
async fn it_downloads_exact_bytes() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let auth = signed_in_auth(dir.path()).await?;

    let payload: Vec<u8> = vec![0x00, 0xff, 0x10, 0x13, 0x53, 0x51, 0x4c, 0x69, 0x74, 0x65];
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/files/remote-id-1")
        .match_query(Matcher::UrlEncoded("alt".to_string(), "media".to_string()))
        .with_status(200)
        .with_body(payload.clone())
        .create();

    let bytes = channel(&server.url(), auth).download("remote-id-1").await?;
    mock.assert();
    assert_eq!(bytes, payload);
    return Ok(());
}

#[tokio::test]
async fn it_deletes_a_blob() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let auth = signed_in_auth(dir.path()).await?;

    let mut server = mockito::Server::new();
    let mock = server
        .mock("DELETE", "/files/remote-id-1")
        .with_status(204)
        .create();

    channel(&server.url(), auth).delete("remote-id-1").await?;
    mock.assert();
    return Ok(());
}

#[tokio::test]
async fn it_surfaces_auth_failures_without_retrying() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let auth = signed_in_auth(dir.path()).await?;

    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/files")
        .match_query(Matcher::Any)
        .with_status(401)
        .expect(1)
        .create();

    let err = channel(&server.url(), auth)
        .find_by_name("granary.db")
        .await
        .unwrap_err()
        .to_string();
    mock.assert();
    assert!(err.contains("401"));
    return Ok(());
}
