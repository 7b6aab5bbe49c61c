pub mod ports;
pub mod service;

pub use ports::{
    DowngradeOutcome, ReconciliationError, ReconciliationService, UpgradeOutcome, UpgradeRequest,
    Verification,
};
pub use service::ReconciliationServiceImpl;
