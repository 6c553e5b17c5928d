#[cfg(test)]
#[path = "blob_test.rs"]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use anyhow::Result;
use async_trait::async_trait;
use serde_derive::Deserialize;

use super::auth::generate_token_string;
use super::CredentialManager;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::BlobChannel;

/// The app-private space: objects live in a per-application area invisible to
/// the user's normal file listing.
const APP_SPACE: &str = "appDataFolder";

#[derive(Debug, Clone, Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Debug, Clone, Deserialize)]
struct FileListResponse {
    files: Vec<DriveFile>,
}

/// Builds a `multipart/related` body from typed byte segments: text headers,
/// the raw payload, text footer. The payload is appended at the byte level and
/// never decoded, so binary database snapshots survive intact.
fn multipart_related(
    boundary: &str,
    metadata: &serde_json::Value,
    mime_type: &str,
    payload: &[u8],
) -> Vec<u8> {
    let mut body: Vec<u8> = Vec::with_capacity(payload.len() + 512);
    body.extend_from_slice(
        format!("--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("--{boundary}\r\nContent-Type: {mime_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(payload);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    return body;
}

/// Drive-shaped REST client for the app-private remote namespace. Every call
/// asks the credential manager for a fresh bearer token; a 401 surfaces as an
/// error for the caller to handle.
pub struct RemoteBlobChannel {
    api_url: String,
    upload_url: String,
    request_timeout: Duration,
    upload_timeout: Duration,
    auth: Arc<CredentialManager>,
}

impl RemoteBlobChannel {
    pub fn new(auth: Arc<CredentialManager>) -> RemoteBlobChannel {
        return RemoteBlobChannel {
            api_url: Config::get(ConfigKey::RemoteApiUrl),
            upload_url: Config::get(ConfigKey::RemoteUploadUrl),
            request_timeout: Duration::from_millis(Config::get_u64(ConfigKey::RequestTimeout)),
            upload_timeout: Duration::from_millis(Config::get_u64(ConfigKey::UploadTimeout)),
            auth,
        };
    }

    pub fn with_urls(
        api_url: String,
        upload_url: String,
        auth: Arc<CredentialManager>,
    ) -> RemoteBlobChannel {
        return RemoteBlobChannel {
            api_url,
            upload_url,
            request_timeout: Duration::from_secs(5),
            upload_timeout: Duration::from_secs(30),
            auth,
        };
    }
}

#[async_trait]
impl BlobChannel for RemoteBlobChannel {
    async fn find_by_name(&self, name: &str) -> Result<Option<String>> {
        let token = self.auth.get_access_token().await?;
        let query = format!("name = '{name}' and trashed = false");
        let res = reqwest::Client::new()
            .get(format!("{}/files", self.api_url))
            .timeout(self.request_timeout)
            .header("Authorization", format!("Bearer {token}"))
            .query(&[
                ("spaces", APP_SPACE),
                ("q", query.as_str()),
                ("fields", "files(id, name)"),
            ])
            .send()
            .await?;

        if !res.status().is_success() {
            tracing::error!(status = res.status().as_u16(), name = name, "Remote lookup failed");
            bail!("Remote lookup for {name} failed with {}", res.status().as_u16());
        }

        let listing: FileListResponse = res.json().await?;
        return Ok(listing.files.into_iter().next().map(|file| {
            return file.id;
        }));
    }

    async fn upload(
        &self,
        name: &str,
        bytes: &[u8],
        mime_type: &str,
        existing_id: Option<&str>,
    ) -> Result<String> {
        let token = self.auth.get_access_token().await?;
        let boundary = generate_token_string(24);

        // New objects carry the app-space parent; replacements must not.
        let (metadata, url, method) = match existing_id {
            Some(id) => (
                serde_json::json!({ "name": name }),
                format!("{}/files/{id}?uploadType=multipart", self.upload_url),
                reqwest::Method::PATCH,
            ),
            None => (
                serde_json::json!({ "name": name, "parents": [APP_SPACE] }),
                format!("{}/files?uploadType=multipart", self.upload_url),
                reqwest::Method::POST,
            ),
        };

        let body = multipart_related(&boundary, &metadata, mime_type, bytes);
        let res = reqwest::Client::new()
            .request(method, url)
            .timeout(self.upload_timeout)
            .header("Authorization", format!("Bearer {token}"))
            .header(
                "Content-Type",
                format!("multipart/related; boundary={boundary}"),
            )
            .body(body)
            .send()
            .await?;

        if !res.status().is_success() {
            tracing::error!(status = res.status().as_u16(), name = name, "Blob upload failed");
            bail!("Upload of {name} failed with {}", res.status().as_u16());
        }

        let file: DriveFile = res.json().await?;
        return Ok(file.id);
    }

    async fn download(&self, id: &str) -> Result<Vec<u8>> {
        let token = self.auth.get_access_token().await?;
        let res = reqwest::Client::new()
            .get(format!("{}/files/{id}", self.api_url))
            .timeout(self.upload_timeout)
            .header("Authorization", format!("Bearer {token}"))
            .query(&[("alt", "media")])
            .send()
            .await?;

        if !res.status().is_success() {
            tracing::error!(status = res.status().as_u16(), id = id, "Blob download failed");
            bail!("Download of {id} failed with {}", res.status().as_u16());
        }

        return Ok(res.bytes().await?.to_vec());
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let token = self.auth.get_access_token().await?;
        let res = reqwest::Client::new()
            .delete(format!("{}/files/{id}", self.api_url))
            .timeout(self.request_timeout)
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await?;

        if !res.status().is_success() {
            tracing::error!(status = res.status().as_u16(), id = id, "Blob delete failed");
            bail!("Delete of {id} failed with {}", res.status().as_u16());
        }

        return Ok(());
    }
}
