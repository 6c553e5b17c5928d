pub mod auth;
pub mod blob;
pub mod credential_file;

pub use auth::AuthState;
pub use auth::CredentialManager;
pub use auth::OAuthConfig;
pub use blob::RemoteBlobChannel;
pub use credential_file::CredentialFile;
