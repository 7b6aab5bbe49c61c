pub mod admin_client;
pub mod ports;

pub use admin_client::AuthAdminClient;
pub use ports::{AccountError, AccountMetadata, AccountRecord, AccountStore};
