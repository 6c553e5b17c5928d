#[cfg(test)]
#[path = "credential_file_test.rs"]
mod tests;

use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::domain::models::CredentialSet;

/// On-disk persistence for the signed-in account. One JSON file under the
/// data dir, written whole and replaced atomically so a crash never leaves a
/// half-written credential set behind.
pub struct CredentialFile {
    pub path: PathBuf,
}

impl CredentialFile {
    pub fn new(data_dir: &Path) -> CredentialFile {
        return CredentialFile {
            path: data_dir.join("credentials.json"),
        };
    }

    pub async fn load(&self) -> Result<Option<CredentialSet>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let payload = fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let credentials: CredentialSet = serde_json::from_str(&payload)?;
        return Ok(Some(credentials));
    }

    pub async fn store(&self, credentials: &CredentialSet) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let payload = serde_json::to_string_pretty(credentials)?;
        let tmp_path = self.path.with_extension("json.tmp");

        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(payload.as_bytes()).await?;
        file.flush().await?;
        drop(file);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600)).await?;
        }

        fs::rename(&tmp_path, &self.path).await?;
        return Ok(());
    }

    /// Removes all credential material in one step.
    pub async fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .await
                .with_context(|| format!("Failed to remove {}", self.path.display()))?;
        }
        return Ok(());
    }

    pub fn exists(&self) -> bool {
        return self.path.exists();
    }
}
