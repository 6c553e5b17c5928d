mod blob;
mod credentials;
mod message;
mod session;
mod store;

pub use blob::*;
pub use credentials::*;
pub use message::*;
pub use session::*;
pub use store::*;
use uuid::Uuid;

/// Short ids: the first two dash groups of a v4 uuid.
pub fn create_id() -> String {
    return Uuid::new_v4()
        .to_string()
        .split('-')
        .enumerate()
        .filter_map(|(idx, str)| {
            if idx > 1 {
                return None;
            }
            return Some(str);
        })
        .collect::<Vec<&str>>()
        .join("-");
}

pub fn now_ms() -> i64 {
    return chrono::Utc::now().timestamp_millis();
}
