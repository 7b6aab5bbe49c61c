use async_trait::async_trait;
use std::sync::Arc;

use super::ports::{
    PaymentSyncService, PaymentsClient, ResyncError, ResyncOutcome, WebhookAck, WebhookAction,
    WebhookError,
};
use super::webhook::{classify_event, parse_payload, verify_signature, WebhookEventKind, WebhookPayload};
use crate::account::AccountStore;
use crate::plan::{classify_plan_type, PlanType};
use crate::reconciliation::{ReconciliationService, UpgradeRequest};

/// Configuration for PaymentSyncServiceImpl
pub struct PaymentSyncServiceConfig {
    pub account_store: Arc<dyn AccountStore>,
    pub reconciliation: Arc<dyn ReconciliationService>,
    pub payments_client: Arc<dyn PaymentsClient>,
    pub webhook_secret: String,
    pub lifetime_plan_id: String,
}

pub struct PaymentSyncServiceImpl {
    account_store: Arc<dyn AccountStore>,
    reconciliation: Arc<dyn ReconciliationService>,
    payments_client: Arc<dyn PaymentsClient>,
    webhook_secret: String,
    lifetime_plan_id: String,
}

impl PaymentSyncServiceImpl {
    pub fn new(config: PaymentSyncServiceConfig) -> Self {
        Self {
            account_store: config.account_store,
            reconciliation: config.reconciliation,
            payments_client: config.payments_client,
            webhook_secret: config.webhook_secret,
            lifetime_plan_id: config.lifetime_plan_id,
        }
    }

    async fn activate(&self, payload: WebhookPayload) -> Result<WebhookAck, WebhookError> {
        let email = payload
            .email
            .clone()
            .ok_or(WebhookError::MissingCustomerEmail)?;

        let account = self
            .account_store
            .find_by_email(&email)
            .await
            .map_err(WebhookError::Account)?;

        let Some(account) = account else {
            // Acknowledge anyway: the buyer may not have signed up yet and retries won't help
            tracing::warn!(
                event_type = %payload.event_type,
                "No account found for webhook customer, acknowledging without changes"
            );
            return Ok(WebhookAck::ignored(payload.event_type)
                .with_warning("User not found; premium will not be granted until resync")
                .with_email(email));
        };

        let plan_type = classify_plan_type(
            payload.plan_id.as_deref(),
            payload.plan_name.as_deref(),
            &self.lifetime_plan_id,
        );
        tracing::info!(
            "Processing upgrade from webhook: user_id={} plan_id={:?} plan_type={}",
            account.id,
            payload.plan_id,
            plan_type
        );

        let outcome = self
            .reconciliation
            .upgrade(
                UpgradeRequest::new(account, plan_type)
                    .with_subscription_id(payload.subscription_id)
                    .with_external_plan_id(payload.plan_id),
            )
            .await
            .map_err(WebhookError::Reconciliation)?;

        Ok(WebhookAck {
            received: true,
            event_type: payload.event_type,
            action: WebhookAction::Upgraded,
            user_id: Some(outcome.account.id),
            plan_type: Some(outcome.plan_type),
            user_plans_updated: Some(outcome.user_plans_updated),
            warning: outcome.warning,
            email: None,
        })
    }

    async fn deactivate(&self, payload: WebhookPayload) -> Result<WebhookAck, WebhookError> {
        let Some(email) = payload.email.clone() else {
            tracing::warn!(event_type = %payload.event_type, "No customer email in cancellation event");
            return Ok(WebhookAck::ignored(payload.event_type).with_warning("Missing customer email"));
        };

        let account = self
            .account_store
            .find_by_email(&email)
            .await
            .map_err(WebhookError::Account)?;

        let Some(account) = account else {
            tracing::warn!(event_type = %payload.event_type, "No account found for cancellation event");
            return Ok(WebhookAck::ignored(payload.event_type)
                .with_warning("User not found")
                .with_email(email));
        };

        let outcome = self
            .reconciliation
            .downgrade(&account)
            .await
            .map_err(WebhookError::Reconciliation)?;

        tracing::info!("User user_id={} downgraded to free", account.id);

        Ok(WebhookAck {
            received: true,
            event_type: payload.event_type,
            action: WebhookAction::Downgraded,
            user_id: Some(account.id),
            plan_type: Some(PlanType::Free),
            user_plans_updated: Some(outcome.user_plans_updated),
            warning: outcome.warning,
            email: None,
        })
    }
}

#[async_trait]
impl PaymentSyncService for PaymentSyncServiceImpl {
    async fn handle_whop_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookAck, WebhookError> {
        if self.webhook_secret.is_empty() {
            tracing::error!("WHOP_WEBHOOK_SECRET not configured, rejecting webhook");
            return Err(WebhookError::SecretNotConfigured);
        }

        // Verify before parsing anything
        let signature = signature.unwrap_or_default();
        if !verify_signature(&self.webhook_secret, payload, signature) {
            tracing::warn!("Invalid Whop webhook signature");
            return Err(WebhookError::InvalidSignature);
        }

        let payload =
            parse_payload(payload).map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;
        tracing::info!("Whop webhook received: type={}", payload.event_type);

        match classify_event(&payload.event_type) {
            WebhookEventKind::Activate => self.activate(payload).await,
            WebhookEventKind::Deactivate => self.deactivate(payload).await,
            WebhookEventKind::Other => {
                tracing::debug!("Ignoring Whop webhook type={}", payload.event_type);
                Ok(WebhookAck::ignored(payload.event_type))
            }
        }
    }

    async fn resync_by_email(&self, email: &str) -> Result<ResyncOutcome, ResyncError> {
        let account = self
            .account_store
            .find_by_email(email)
            .await
            .map_err(ResyncError::Account)?
            .ok_or(ResyncError::AccountNotFound)?;

        let membership = if self.payments_client.is_configured() {
            match self.payments_client.find_membership_by_email(email).await {
                Ok(membership) => membership,
                Err(e) => {
                    tracing::warn!(error = %e, user_id = %account.id, "Whop membership lookup failed");
                    None
                }
            }
        } else {
            tracing::debug!("WHOP_API_KEY not configured, skipping membership lookup");
            None
        };

        let whop_subscription_found = membership.is_some();
        let request = match membership {
            Some(membership) => {
                let plan_type = classify_plan_type(
                    membership.plan_id.as_deref(),
                    membership.plan_name.as_deref(),
                    &self.lifetime_plan_id,
                );
                UpgradeRequest::new(account, plan_type)
                    .with_subscription_id(membership.id)
                    .with_external_plan_id(membership.plan_id)
            }
            None => {
                // Keep an existing premium type, otherwise assume the lifetime purchase
                let plan_type = account
                    .user_metadata
                    .plan_type()
                    .and_then(|p| p.parse::<PlanType>().ok())
                    .filter(PlanType::is_premium)
                    .unwrap_or(PlanType::ProLifetime);
                UpgradeRequest::new(account, plan_type)
            }
        };

        let outcome = self
            .reconciliation
            .upgrade(request.synced().verified())
            .await
            .map_err(ResyncError::Reconciliation)?;

        Ok(ResyncOutcome {
            user_id: outcome.account.id,
            email: outcome.account.email.clone(),
            plan_type: outcome.plan_type,
            subscription_status: outcome
                .account
                .user_metadata
                .subscription_status()
                .map(str::to_string),
            whop_subscription_found,
            metadata_updated: outcome.metadata_updated,
            user_plans_updated: outcome.user_plans_updated,
            warning: outcome.warning,
            verification: outcome.verification,
        })
    }
}
