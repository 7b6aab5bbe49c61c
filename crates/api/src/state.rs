use std::sync::Arc;

use crate::models::CheckoutLinks;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub account_store: Arc<dyn services::account::AccountStore>,
    pub entitlement_service: Arc<dyn services::entitlement::EntitlementService>,
    pub payment_sync_service: Arc<dyn services::payments::PaymentSyncService>,
    pub admin_service: Arc<dyn services::admin::AdminService>,
    pub chat_service: Arc<dyn services::chat::ChatService>,
    pub checkout_links: CheckoutLinks,
    /// Bearer token guarding the operator routes; `None` leaves them open
    pub admin_api_token: Option<Arc<String>>,
}
