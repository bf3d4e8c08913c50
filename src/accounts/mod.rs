//! User accounts and API keys.
//!
//! - [`keys`] mints the 256-bit hex keys used both for the setup key and per-user keys
//! - [`store`] is the SQLite record store with a unique username index
//! - [`credentials`] hashes passwords with Argon2 and owns the account lifecycle
//! - [`auth`] turns a presented bearer key into an [`AuthToken`]

pub mod auth;
pub mod credentials;
pub mod keys;
pub mod models;
pub mod store;

pub use auth::{authorize, AuthToken, Principal};
pub use credentials::CredentialStore;
pub use keys::{new_api_key, ApiKey};
pub use models::UserAccount;
pub use store::{init_db, DbPool, UserRepo};
