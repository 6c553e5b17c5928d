use std::io::Write;
use std::sync::Mutex;

use anyhow::Result;
use once_cell::sync::Lazy;

use super::Config;
use super::ConfigKey;
use crate::application::cli;

// Config is process-global. Serialize the tests that load it.
static LOCK: Lazy<Mutex<()>> = Lazy::new(|| return Mutex::new(()));

#[test]
fn it_serializes_to_valid_toml() {
    let res = Config::serialize_default(cli::build());
    let toml_res = res.parse::<toml_edit::Document>();
    assert!(toml_res.is_ok());
    assert!(res.contains("sync-debounce = 3000"));
}

#[test]
fn it_documents_every_key_in_the_default_config() {
    use strum::IntoEnumIterator;

    let res = Config::serialize_default(cli::build());
    for key in ConfigKey::iter() {
        if key == ConfigKey::ConfigFile {
            continue;
        }
        assert!(
            res.contains(&key.to_string()),
            "default config is missing {key}"
        );
    }
    assert!(res.contains("oauth-token-url = \"https://oauth2.googleapis.com/token\""));
}

#[tokio::test]
async fn it_loads_config_from_file() -> Result<()> {
    let _guard = LOCK.lock().unwrap();
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
    writeln!(file, "sync-debounce = 9999")?;
    writeln!(file, "oauth-client-id = \"test-client\"")?;

    let matches = cli::build().try_get_matches_from(vec![
        "granary",
        "-c",
        file.path().to_str().unwrap(),
        "sessions",
        "list",
    ])?;
    Config::load(vec![&matches]).await?;

    assert_eq!(Config::get(ConfigKey::SyncDebounce), "9999");
    assert_eq!(Config::get(ConfigKey::OauthClientId), "test-client");
    return Ok(());
}

#[tokio::test]
async fn it_fails_to_load_invalid_config() -> Result<()> {
    let _guard = LOCK.lock().unwrap();
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
    writeln!(file, "this is not toml = = =")?;

    let matches = cli::build().try_get_matches_from(vec![
        "granary",
        "-c",
        file.path().to_str().unwrap(),
        "sessions",
        "list",
    ])?;
    let res = Config::load(vec![&matches]).await;
    assert!(res.is_err());
    return Ok(());
}
