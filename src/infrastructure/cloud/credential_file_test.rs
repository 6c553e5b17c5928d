use anyhow::Result;

use super::CredentialFile;
use crate::domain::models::CredentialSet;

fn sample_credentials() -> CredentialSet {
    return CredentialSet {
        access_token: "access-abc".to_string(),
        refresh_token: Some("refresh-def".to_string()),
        expires_at: 1_900_000_000,
        email: "user@example.com".to_string(),
        display_name: "Test User".to_string(),
    };
}

#[tokio::test]
async fn it_round_trips_credentials() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let file = CredentialFile::new(dir.path());

    assert!(file.load().await?.is_none());
    file.store(&sample_credentials()).await?;

    let loaded = file.load().await?.unwrap();
    assert_eq!(loaded, sample_credentials());
    return Ok(());
}

#[tokio::test]
async fn it_clears_all_material_at_once() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let file = CredentialFile::new(dir.path());

    file.store(&sample_credentials()).await?;
    assert!(file.exists());

    file.clear().await?;
    assert!(!file.exists());
    assert!(file.load().await?.is_none());

    // Clearing again is a no-op.
    file.clear().await?;
    return Ok(());
}

#[cfg(unix)]
#[tokio::test]
async fn it_writes_owner_only_permissions() -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir()?;
    let file = CredentialFile::new(dir.path());
    file.store(&sample_credentials()).await?;

    let mode = std::fs::metadata(&file.path)?.permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
    return Ok(());
}
