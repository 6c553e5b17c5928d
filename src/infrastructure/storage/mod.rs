pub mod flatfile;
pub mod sqlite;

use std::path::Path;

use anyhow::Result;

use crate::domain::models::SessionStoreBox;

pub const DATABASE_FILE: &str = "sessions.db";
pub const FALLBACK_DIR: &str = "sessions";

pub struct StoreManager {}

impl StoreManager {
    /// Picks the storage backend once per process: the embedded database when
    /// it opens, otherwise the flat-file fallback. Callers only ever see the
    /// trait after this point.
    pub fn open(data_dir: &Path) -> Result<SessionStoreBox> {
        match sqlite::SqliteStore::open(&data_dir.join(DATABASE_FILE)) {
            Ok(store) => {
                return Ok(Box::new(store));
            }
            Err(err) => {
                tracing::warn!(error = ?err, "Session database unavailable, falling back to flat files");
                let store = flatfile::FlatFileStore::open(&data_dir.join(FALLBACK_DIR))?;
                return Ok(Box::new(store));
            }
        }
    }
}
