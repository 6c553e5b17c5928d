use serde_derive::Deserialize;
use serde_derive::Serialize;

/// Tokens are treated as expired this many seconds early so a request never
/// goes out with a token that dies mid-flight.
pub const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

/// One signed-in account's credential material. Exactly one set is active at a
/// time; sign-out removes all of it before any further remote calls.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix seconds at which `access_token` stops being valid.
    pub expires_at: i64,
    pub email: String,
    pub display_name: String,
}

impl CredentialSet {
    pub fn is_fresh(&self, now_secs: i64) -> bool {
        return self.expires_at - TOKEN_EXPIRY_MARGIN_SECS > now_secs;
    }
}
