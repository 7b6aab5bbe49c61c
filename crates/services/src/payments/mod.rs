pub mod ports;
pub mod service;
pub mod webhook;
pub mod whop_client;

pub use ports::{
    Membership, PaymentSyncService, PaymentsClient, PaymentsError, ResyncError, ResyncOutcome,
    WebhookAck, WebhookAction, WebhookError,
};
pub use service::{PaymentSyncServiceConfig, PaymentSyncServiceImpl};
pub use webhook::SIGNATURE_HEADER;
pub use whop_client::WhopClient;
