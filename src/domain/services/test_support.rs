use std::collections::HashMap;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;

use anyhow::bail;
use anyhow::Result;
use async_trait::async_trait;

use crate::domain::models::BlobChannel;

#[derive(Default)]
struct Inner {
    blobs: Mutex<HashMap<String, (String, Vec<u8>)>>,
    upload_count: AtomicUsize,
}

/// In-memory stand-in for the remote namespace. Clones share storage, which
/// simulates two devices syncing against the same account.
#[derive(Clone, Default)]
pub struct MemoryChannel {
    inner: Arc<Inner>,
}

impl MemoryChannel {
    pub fn bytes_of(&self, name: &str) -> Option<Vec<u8>> {
        return self
            .inner
            .blobs
            .lock()
            .unwrap()
            .get(name)
            .map(|(_, bytes)| return bytes.clone());
    }

    pub fn seed(&self, name: &str, bytes: Vec<u8>) {
        self.inner
            .blobs
            .lock()
            .unwrap()
            .insert(name.to_string(), (format!("id-{name}"), bytes));
    }

    pub fn uploads(&self) -> usize {
        return self.inner.upload_count.load(Ordering::SeqCst);
    }
}

#[async_trait]
impl BlobChannel for MemoryChannel {
    async fn find_by_name(&self, name: &str) -> Result<Option<String>> {
        return Ok(self
            .inner
            .blobs
            .lock()
            .unwrap()
            .get(name)
            .map(|(id, _)| return id.clone()));
    }

    async fn upload(
        &self,
        name: &str,
        bytes: &[u8],
        _mime_type: &str,
        existing_id: Option<&str>,
    ) -> Result<String> {
        self.inner.upload_count.fetch_add(1, Ordering::SeqCst);
        let id = existing_id
            .map(|id| {
                return id.to_string();
            })
            .unwrap_or_else(|| return format!("id-{name}"));
        self.inner
            .blobs
            .lock()
            .unwrap()
            .insert(name.to_string(), (id.clone(), bytes.to_vec()));
        return Ok(id);
    }

    async fn download(&self, id: &str) -> Result<Vec<u8>> {
        let blobs = self.inner.blobs.lock().unwrap();
        for (stored_id, bytes) in blobs.values() {
            if stored_id == id {
                return Ok(bytes.clone());
            }
        }
        bail!("No blob with id {id}");
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.inner.blobs.lock().unwrap().retain(|_, value| {
            return value.0 != id;
        });
        return Ok(());
    }
}
