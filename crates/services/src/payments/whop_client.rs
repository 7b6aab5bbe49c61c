use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::ports::{Membership, PaymentsClient, PaymentsError};

/// Upper bound on membership pages scanned per lookup
const MAX_PAGES: u32 = 20;

#[derive(Deserialize)]
struct MembershipPage {
    #[serde(default)]
    data: Vec<Value>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Deserialize)]
struct Pagination {
    #[serde(default)]
    total_page: Option<u32>,
}

fn string_at(value: &Value, pointer: &str) -> Option<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn membership_email_matches(membership: &Value, email: &str) -> bool {
    ["/user/email", "/customer/email", "/email"]
        .iter()
        .filter_map(|p| membership.pointer(p).and_then(Value::as_str))
        .any(|candidate| candidate.eq_ignore_ascii_case(email))
}

fn to_membership(membership: &Value) -> Membership {
    Membership {
        id: string_at(membership, "/id").or_else(|| string_at(membership, "/subscription_id")),
        plan_id: string_at(membership, "/plan/id").or_else(|| string_at(membership, "/plan_id")),
        plan_name: string_at(membership, "/plan/name"),
        status: string_at(membership, "/status"),
        valid: membership.pointer("/valid").and_then(Value::as_bool),
    }
}

/// Client for the Whop v2 REST API
pub struct WhopClient {
    api_key: String,
    base_url: String,
    http_client: reqwest::Client,
}

impl WhopClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client: reqwest::Client::new(),
        }
    }

    async fn list_memberships(&self, page: u32) -> Result<MembershipPage, PaymentsError> {
        let response = self
            .http_client
            .get(format!("{}/memberships", self.base_url))
            .bearer_auth(&self.api_key)
            .query(&[("page", page)])
            .send()
            .await
            .map_err(|e| PaymentsError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PaymentsError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| PaymentsError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl PaymentsClient for WhopClient {
    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn find_membership_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Membership>, PaymentsError> {
        if !self.is_configured() {
            return Err(PaymentsError::NotConfigured);
        }
        let email = email.trim();

        let mut page = 1;
        loop {
            let listing = self.list_memberships(page).await?;

            // Lapsed memberships for the same email are skipped
            let live = listing
                .data
                .iter()
                .filter(|m| membership_email_matches(m, email))
                .map(to_membership)
                .find(Membership::is_live);
            if let Some(membership) = live {
                tracing::debug!(
                    "Found live membership id={:?} plan_id={:?}",
                    membership.id,
                    membership.plan_id
                );
                return Ok(Some(membership));
            }

            let total_pages = listing
                .pagination
                .and_then(|p| p.total_page)
                .unwrap_or(1)
                .min(MAX_PAGES);
            if page >= total_pages || listing.data.is_empty() {
                return Ok(None);
            }
            page += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_matches_user_or_customer_email() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/memberships"))
            .and(header("authorization", "Bearer whop-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"id": "mem_1", "user": {"email": "someone@example.com"}, "plan": {"id": "plan_a"}},
                    {"id": "mem_2", "customer": {"email": "Buyer@Example.com"},
                     "plan_id": "plan_nAv9o4mMRgV37", "status": "active"}
                ]
            })))
            .mount(&mock_server)
            .await;

        let client = WhopClient::new("whop-key", mock_server.uri());
        let membership = client
            .find_membership_by_email("buyer@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(membership.id.as_deref(), Some("mem_2"));
        assert_eq!(membership.plan_id.as_deref(), Some("plan_nAv9o4mMRgV37"));
        assert_eq!(membership.status.as_deref(), Some("active"));
    }

    #[tokio::test]
    async fn test_follows_pagination() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/memberships"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": "mem_1", "user": {"email": "a@example.com"}}],
                "pagination": {"current_page": 1, "total_page": 2}
            })))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/memberships"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": "mem_2", "user": {"email": "b@example.com"},
                          "plan": {"id": "plan_b", "name": "Monthly"}, "valid": true}],
                "pagination": {"current_page": 2, "total_page": 2}
            })))
            .mount(&mock_server)
            .await;

        let client = WhopClient::new("whop-key", mock_server.uri());
        let membership = client
            .find_membership_by_email("b@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(membership.id.as_deref(), Some("mem_2"));
        assert_eq!(membership.plan_name.as_deref(), Some("Monthly"));

        assert!(client
            .find_membership_by_email("nobody@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_skips_expired_membership_for_same_email() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/memberships"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"id": "mem_old", "user": {"email": "buyer@example.com"},
                     "plan": {"id": "plan_vhBLiFWs6AJNx"}, "status": "expired", "valid": false},
                    {"id": "mem_live", "user": {"email": "buyer@example.com"},
                     "plan": {"id": "plan_nAv9o4mMRgV37"}, "status": "active"}
                ],
                "pagination": {"current_page": 1, "total_page": 1}
            })))
            .mount(&mock_server)
            .await;

        let client = WhopClient::new("whop-key", mock_server.uri());
        let membership = client
            .find_membership_by_email("buyer@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(membership.id.as_deref(), Some("mem_live"));
        assert_eq!(membership.plan_id.as_deref(), Some("plan_nAv9o4mMRgV37"));
    }

    #[tokio::test]
    async fn test_only_lapsed_memberships_is_not_found() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/memberships"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"id": "mem_old", "user": {"email": "buyer@example.com"}, "status": "expired"},
                    {"id": "mem_gone", "user": {"email": "buyer@example.com"},
                     "status": "canceled", "valid": false},
                    {"id": "mem_unknown", "user": {"email": "buyer@example.com"}}
                ]
            })))
            .mount(&mock_server)
            .await;

        let client = WhopClient::new("whop-key", mock_server.uri());
        assert!(client
            .find_membership_by_email("buyer@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_upstream_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&mock_server)
            .await;

        let client = WhopClient::new("whop-key", mock_server.uri());
        let err = client
            .find_membership_by_email("a@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentsError::Upstream { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_not_configured() {
        let client = WhopClient::new("", "https://api.whop.com/api/v2");
        assert!(!client.is_configured());
        assert!(matches!(
            client.find_membership_by_email("a@example.com").await,
            Err(PaymentsError::NotConfigured)
        ));
    }
}
