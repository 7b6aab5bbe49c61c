//! Account store backed by the auth provider's admin REST API (`/auth/v1/admin/users`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::ports::{AccountError, AccountMetadata, AccountRecord, AccountStore};
use crate::UserId;

/// Users requested per page when scanning for an email
const DEFAULT_PAGE_SIZE: u32 = 1000;
/// Upper bound on pages scanned for a single email lookup
const MAX_PAGES: u32 = 50;

#[derive(Deserialize)]
struct AdminUser {
    id: uuid::Uuid,
    email: Option<String>,
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    user_metadata: Option<Map<String, Value>>,
}

impl From<AdminUser> for AccountRecord {
    fn from(user: AdminUser) -> Self {
        Self {
            id: UserId(user.id),
            email: user.email,
            created_at: user.created_at,
            user_metadata: AccountMetadata(user.user_metadata.unwrap_or_default()),
        }
    }
}

#[derive(Deserialize)]
struct AdminUserPage {
    #[serde(default)]
    users: Vec<AdminUser>,
}

pub struct AuthAdminClient {
    base_url: String,
    service_key: String,
    page_size: u32,
    http_client: reqwest::Client,
}

impl AuthAdminClient {
    pub fn new(base_url: impl Into<String>, service_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_key: service_key.into(),
            page_size: DEFAULT_PAGE_SIZE,
            http_client: reqwest::Client::new(),
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn is_configured(&self) -> bool {
        !self.base_url.is_empty() && !self.service_key.is_empty()
    }

    fn ensure_configured(&self) -> Result<(), AccountError> {
        if self.is_configured() {
            Ok(())
        } else {
            Err(AccountError::NotConfigured)
        }
    }

    fn users_url(&self) -> String {
        format!("{}/auth/v1/admin/users", self.base_url)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    async fn error_from_response(response: reqwest::Response) -> AccountError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        AccountError::Provider(format!("status {}: {}", status.as_u16(), body))
    }

    async fn list_page(&self, page: u32) -> Result<Vec<AdminUser>, AccountError> {
        let response = self
            .authorized(self.http_client.get(self.users_url()))
            .query(&[("page", page), ("per_page", self.page_size)])
            .send()
            .await
            .map_err(|e| AccountError::Provider(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let page: AdminUserPage = response
            .json()
            .await
            .map_err(|e| AccountError::InvalidResponse(e.to_string()))?;
        Ok(page.users)
    }
}

#[async_trait]
impl AccountStore for AuthAdminClient {
    async fn get_by_id(&self, user_id: UserId) -> Result<Option<AccountRecord>, AccountError> {
        self.ensure_configured()?;
        tracing::debug!("Fetching account user_id={}", user_id);

        let response = self
            .authorized(
                self.http_client
                    .get(format!("{}/{}", self.users_url(), user_id)),
            )
            .send()
            .await
            .map_err(|e| AccountError::Provider(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let user: AdminUser = response
            .json()
            .await
            .map_err(|e| AccountError::InvalidResponse(e.to_string()))?;
        Ok(Some(user.into()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<AccountRecord>, AccountError> {
        self.ensure_configured()?;
        let needle = email.trim();
        if needle.is_empty() {
            return Ok(None);
        }

        for page in 1..=MAX_PAGES {
            let users = self.list_page(page).await?;
            let page_len = users.len();

            if let Some(user) = users
                .into_iter()
                .map(AccountRecord::from)
                .find(|account| account.email_matches(needle))
            {
                return Ok(Some(user));
            }

            if page_len < self.page_size as usize {
                break;
            }
        }

        tracing::debug!("No account found for email lookup");
        Ok(None)
    }

    async fn update_metadata(
        &self,
        user_id: UserId,
        metadata: &AccountMetadata,
    ) -> Result<AccountRecord, AccountError> {
        self.ensure_configured()?;

        let response = self
            .authorized(
                self.http_client
                    .put(format!("{}/{}", self.users_url(), user_id)),
            )
            .json(&json!({ "user_metadata": metadata }))
            .send()
            .await
            .map_err(|e| AccountError::Provider(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AccountError::NotFound);
        }
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let user: AdminUser = response
            .json()
            .await
            .map_err(|e| AccountError::InvalidResponse(e.to_string()))?;

        tracing::info!("Updated account metadata for user_id={}", user_id);
        Ok(user.into())
    }
}
