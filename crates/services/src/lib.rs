pub mod account;
pub mod admin;
pub mod chat;
pub mod entitlement;
pub mod payments;
pub mod plan;
pub mod reconciliation;
pub mod test_helpers;
pub mod types;

pub use types::UserId;
