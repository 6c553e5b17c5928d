#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;

use std::iter;
use std::time::Duration;

use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use rand::Rng;
use serde_derive::Deserialize;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use super::CredentialFile;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::CredentialSet;

const CALLBACK_PATH: &str = "/oauth/callback";
const OAUTH_SCOPES: &str = "openid email profile https://www.googleapis.com/auth/drive.appdata";

const ACK_PAGE: &str = "<!DOCTYPE html><html><head><title>Granary</title></head>\
<body><p>You can close this tab and return to your terminal.</p></body></html>";

pub fn generate_token_string(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    let one_char = || return CHARSET[rng.gen_range(0..CHARSET.len())] as char;
    return iter::repeat_with(one_char).take(length).collect();
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthState {
    SignedOut,
    AwaitingCallback,
    SignedIn,
}

pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub redirect_port: u16,
    pub request_timeout: Duration,
    pub callback_timeout: Duration,
}

impl OAuthConfig {
    pub fn from_config() -> OAuthConfig {
        return OAuthConfig {
            client_id: Config::get(ConfigKey::OauthClientId),
            client_secret: Config::get(ConfigKey::OauthClientSecret),
            auth_url: Config::get(ConfigKey::OauthAuthUrl),
            token_url: Config::get(ConfigKey::OauthTokenUrl),
            userinfo_url: Config::get(ConfigKey::OauthUserinfoUrl),
            redirect_port: Config::get_u64(ConfigKey::OauthRedirectPort) as u16,
            request_timeout: Duration::from_millis(Config::get_u64(ConfigKey::RequestTimeout)),
            callback_timeout: Duration::from_secs(300),
        };
    }

    fn redirect_uri(&self) -> String {
        return format!("http://127.0.0.1:{}{CALLBACK_PATH}", self.redirect_port);
    }
}

#[derive(Debug, Clone, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: i64,
}

#[derive(Debug, Clone, Deserialize)]
struct UserinfoResponse {
    email: Option<String>,
    name: Option<String>,
}

#[derive(Default)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// Owns the OAuth2 token lifecycle: interactive sign-in over a loopback
/// redirect, refresh-token renewal, and credential persistence. Issues bearer
/// tokens to the blob channel.
pub struct CredentialManager {
    config: OAuthConfig,
    file: CredentialFile,
    cached: Mutex<Option<CredentialSet>>,
    state: Mutex<AuthState>,
}

impl CredentialManager {
    pub fn new(config: OAuthConfig, file: CredentialFile) -> CredentialManager {
        return CredentialManager {
            config,
            file,
            cached: Mutex::new(None),
            state: Mutex::new(AuthState::SignedOut),
        };
    }

    pub async fn state(&self) -> AuthState {
        return *self.state.lock().await;
    }

    pub fn is_signed_in(&self) -> bool {
        return self.file.exists();
    }

    pub async fn account(&self) -> Result<Option<CredentialSet>> {
        return self.file.load().await;
    }

    /// Interactive authorization-code flow. `open_consent` receives the
    /// provider consent URL once the loopback listener is ready; the default
    /// caller opens it in the system browser.
    pub async fn sign_in<F>(&self, open_consent: F) -> Result<CredentialSet>
    where
        F: FnOnce(&str) + Send,
    {
        if self.config.client_id.is_empty() {
            bail!("No OAuth client id configured. Set oauth-client-id in the config file first.");
        }

        let state_token = generate_token_string(32);
        let consent_url = reqwest::Url::parse_with_params(
            &self.config.auth_url,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", &self.config.redirect_uri()),
                ("response_type", "code"),
                ("scope", OAUTH_SCOPES),
                ("state", &state_token),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )?;

        let listener = TcpListener::bind(("127.0.0.1", self.config.redirect_port))
            .await
            .with_context(|| {
                return format!(
                    "Failed to bind the sign-in listener on port {}",
                    self.config.redirect_port
                );
            })?;

        *self.state.lock().await = AuthState::AwaitingCallback;
        open_consent(consent_url.as_str());

        let code = match await_callback(listener, &state_token, self.config.callback_timeout).await
        {
            Ok(code) => code,
            Err(err) => {
                *self.state.lock().await = AuthState::SignedOut;
                return Err(err);
            }
        };

        let credentials = match self.exchange_code(&code).await {
            Ok(credentials) => credentials,
            Err(err) => {
                *self.state.lock().await = AuthState::SignedOut;
                return Err(err);
            }
        };

        self.file.store(&credentials).await?;
        *self.cached.lock().await = Some(credentials.clone());
        *self.state.lock().await = AuthState::SignedIn;

        return Ok(credentials);
    }

    /// Removes every piece of stored credential material, then resets the
    /// in-memory cache. All-or-nothing from the caller's point of view.
    pub async fn sign_out(&self) -> Result<()> {
        self.file.clear().await?;
        *self.cached.lock().await = None;
        *self.state.lock().await = AuthState::SignedOut;
        return Ok(());
    }

    /// Returns a bearer token with at least 60 seconds of validity left,
    /// refreshing through the stored refresh token when needed.
    pub async fn get_access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if cached.is_none() {
            *cached = self.file.load().await?;
        }

        let Some(credentials) = cached.as_ref() else {
            bail!("Not signed in. Run `granary login` first.");
        };

        if credentials.is_fresh(chrono::Utc::now().timestamp()) {
            return Ok(credentials.access_token.to_string());
        }

        let Some(refresh_token) = credentials.refresh_token.clone() else {
            bail!("The session has expired and no refresh token is available. Run `granary login` again.");
        };

        let refreshed = self
            .refresh_access_token(&refresh_token)
            .await
            .context("Token refresh failed. Run `granary login` again.")?;

        let mut credentials = credentials.clone();
        credentials.access_token = refreshed.access_token;
        credentials.expires_at = chrono::Utc::now().timestamp() + refreshed.expires_in;
        if let Some(rotated) = refreshed.refresh_token {
            credentials.refresh_token = Some(rotated);
        }

        self.file.store(&credentials).await?;
        let token = credentials.access_token.to_string();
        *cached = Some(credentials);
        return Ok(token);
    }

    async fn exchange_code(&self, code: &str) -> Result<CredentialSet> {
        let res = reqwest::Client::new()
            .post(&self.config.token_url)
            .timeout(self.config.request_timeout)
            .form(&[
                ("code", code),
                ("client_id", &self.config.client_id),
                ("client_secret", &self.config.client_secret),
                ("redirect_uri", &self.config.redirect_uri()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;

        if !res.status().is_success() {
            tracing::error!(status = res.status().as_u16(), "Authorization code exchange failed");
            bail!("The provider rejected the authorization code");
        }

        let token: TokenResponse = res.json().await?;
        let expires_at = chrono::Utc::now().timestamp() + token.expires_in;

        // Profile info is display-only. Placeholders are fine when the
        // userinfo endpoint is unavailable.
        let (email, display_name) = match self.fetch_userinfo(&token.access_token).await {
            Ok(userinfo) => (
                userinfo.email.unwrap_or_else(|| return "unknown".to_string()),
                userinfo.name.unwrap_or_else(|| return "Signed-in user".to_string()),
            ),
            Err(err) => {
                tracing::warn!(error = ?err, "Failed to fetch profile info");
                ("unknown".to_string(), "Signed-in user".to_string())
            }
        };

        return Ok(CredentialSet {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at,
            email,
            display_name,
        });
    }

    async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenResponse> {
        let res = reqwest::Client::new()
            .post(&self.config.token_url)
            .timeout(self.config.request_timeout)
            .form(&[
                ("refresh_token", refresh_token),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        if !res.status().is_success() {
            tracing::error!(status = res.status().as_u16(), "Refresh token grant failed");
            bail!("The provider rejected the refresh token");
        }

        let token: TokenResponse = res.json().await?;
        return Ok(token);
    }

    async fn fetch_userinfo(&self, access_token: &str) -> Result<UserinfoResponse> {
        let res = reqwest::Client::new()
            .get(&self.config.userinfo_url)
            .timeout(self.config.request_timeout)
            .header("Authorization", format!("Bearer {access_token}"))
            .send()
            .await?;

        if !res.status().is_success() {
            bail!("Userinfo request failed with {}", res.status().as_u16());
        }

        let userinfo: UserinfoResponse = res.json().await?;
        return Ok(userinfo);
    }
}

/// Waits for the provider redirect on the loopback listener and returns the
/// authorization code. Every connection gets the acknowledgment page before
/// the outcome is decided; non-callback paths (favicon probes and the like)
/// get a 404 and the wait continues.
pub async fn await_callback(
    listener: TcpListener,
    expected_state: &str,
    timeout: Duration,
) -> Result<String> {
    let res = tokio::time::timeout(timeout, async {
        loop {
            let (stream, _) = listener.accept().await?;
            if let Some(params) = handle_connection(stream).await? {
                return Ok::<CallbackParams, anyhow::Error>(params);
            }
        }
    })
    .await;

    let params = match res {
        Ok(inner) => inner?,
        Err(_) => {
            bail!("Timed out waiting for the sign-in redirect after {}s", timeout.as_secs());
        }
    };

    if let Some(error) = params.error {
        bail!("The provider returned an error during sign-in: {error}");
    }

    // Anti-forgery check. A mismatch means the redirect did not come from the
    // flow this process started; treat it as an attack, not a retry.
    if params.state.as_deref() != Some(expected_state) {
        bail!("Sign-in rejected: the OAuth state parameter did not match");
    }

    let Some(code) = params.code else {
        bail!("The provider redirect did not include an authorization code");
    };

    return Ok(code);
}

const MAX_REQUEST_BYTES: usize = 8192;

async fn handle_connection(mut stream: TcpStream) -> Result<Option<CallbackParams>> {
    let mut buf: Vec<u8> = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];

    // The request line can arrive split across segments; keep reading until
    // its terminator shows up.
    while !buf.windows(2).any(|window| return window == b"\r\n") {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.len() >= MAX_REQUEST_BYTES {
            break;
        }
    }

    let request = String::from_utf8_lossy(&buf).to_string();

    let target = request
        .split_whitespace()
        .nth(1)
        .unwrap_or("")
        .to_string();

    if !target.starts_with(CALLBACK_PATH) {
        let body = "not found";
        let response = format!(
            "HTTP/1.1 404 Not Found\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await?;
        stream.shutdown().await.ok();
        return Ok(None);
    }

    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{ACK_PAGE}",
        ACK_PAGE.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await.ok();

    return Ok(Some(parse_callback_query(&target)));
}

fn parse_callback_query(target: &str) -> CallbackParams {
    let mut params = CallbackParams::default();
    let Some((_, query)) = target.split_once('?') else {
        return params;
    };

    for pair in query.split('&') {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let value = percent_decode(value);
        match key {
            "code" => params.code = Some(value),
            "state" => params.state = Some(value),
            "error" => params.error = Some(value),
            _ => {}
        }
    }

    return params;
}

fn hex_digit(byte: u8) -> Option<u8> {
    return match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    };
}

// Operates on raw bytes only. The query can hold arbitrary garbage, including
// broken escapes next to multibyte characters, and must never panic.
fn percent_decode(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut idx = 0;

    while idx < bytes.len() {
        match bytes[idx] {
            b'%' if idx + 2 < bytes.len() => {
                match (hex_digit(bytes[idx + 1]), hex_digit(bytes[idx + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push(hi * 16 + lo);
                        idx += 3;
                    }
                    _ => {
                        out.push(b'%');
                        idx += 1;
                    }
                }
            }
            b'+' => {
                out.push(b' ');
                idx += 1;
            }
            byte => {
                out.push(byte);
                idx += 1;
            }
        }
    }

    return String::from_utf8_lossy(&out).to_string();
}
