use anyhow::Result;
use async_trait::async_trait;

pub type BlobChannelBox = Box<dyn BlobChannel + Send + Sync>;

/// Narrow protocol client over an app-private remote namespace: find a blob by
/// exact name, upload (create or replace), download, delete. Payloads are
/// opaque bytes; implementations must never re-encode them.
///
/// Authentication failures (401-class) are returned as errors and never
/// retried here. Re-auth is the caller's concern.
#[async_trait]
pub trait BlobChannel {
    async fn find_by_name(&self, name: &str) -> Result<Option<String>>;

    async fn upload(
        &self,
        name: &str,
        bytes: &[u8],
        mime_type: &str,
        existing_id: Option<&str>,
    ) -> Result<String>;

    async fn download(&self, id: &str) -> Result<Vec<u8>>;

    async fn delete(&self, id: &str) -> Result<()>;
}
