pub mod admin;

pub use admin::{admin_token_middleware, AdminAuthState};
