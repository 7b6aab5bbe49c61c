pub mod ports;
pub mod service;

pub use ports::{ActivationOutcome, AdminError, AdminService, DEFAULT_ADMIN_PLAN_TYPE};
pub use service::{AdminServiceConfig, AdminServiceImpl};
