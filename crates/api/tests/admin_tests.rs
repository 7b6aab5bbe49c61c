mod common;

use common::{
    create_test_context, create_test_context_with_config, TestServerConfig, PRO_UPGRADE_CODE,
    RESET_MESSAGE_LIMIT_CODE,
};
use serde_json::{json, Value};

const ADMIN_TOKEN: &str = "admin-secret";

fn guarded_context() -> common::TestContext {
    create_test_context_with_config(TestServerConfig {
        admin_api_token: Some(ADMIN_TOKEN.to_string()),
        ..TestServerConfig::default()
    })
}

#[tokio::test]
async fn test_admin_routes_require_token_when_configured() {
    let ctx = guarded_context();
    ctx.add_account("ada@example.com", json!({})).await;

    let response = ctx
        .server
        .post("/v1/admin/check-user")
        .json(&json!({"email": "ada@example.com"}))
        .await;
    assert_eq!(response.status_code(), 401);

    let response = ctx
        .server
        .post("/v1/admin/upgrade-user")
        .authorization_bearer("wrong-token")
        .json(&json!({"email": "ada@example.com"}))
        .await;
    assert_eq!(response.status_code(), 401);

    let response = ctx
        .server
        .post("/v1/admin/upgrade-user")
        .authorization_bearer(format!("{}-extra", ADMIN_TOKEN))
        .json(&json!({"email": "ada@example.com"}))
        .await;
    assert_eq!(response.status_code(), 401);
    assert_eq!(ctx.accounts.update_count().await, 0);

    let response = ctx
        .server
        .post("/v1/admin/check-user")
        .authorization_bearer(ADMIN_TOKEN)
        .json(&json!({"email": "ada@example.com"}))
        .await;
    assert_eq!(response.status_code(), 200);
}

#[tokio::test]
async fn test_activate_code_is_not_token_guarded() {
    let ctx = guarded_context();
    let account = ctx.add_account("ada@example.com", json!({})).await;

    let response = ctx
        .server
        .post("/v1/admin/activate-code")
        .json(&json!({"userId": account.id.to_string(), "code": PRO_UPGRADE_CODE}))
        .await;
    assert_eq!(response.status_code(), 200);
}

#[tokio::test]
async fn test_upgrade_user_defaults_to_lifetime() {
    let ctx = create_test_context();
    let account = ctx.add_account("ada@example.com", json!({})).await;

    let response = ctx
        .server
        .post("/v1/admin/upgrade-user")
        .json(&json!({"email": "ada@example.com"}))
        .await;
    assert_eq!(response.status_code(), 200);

    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["metadata_updated"], true);
    assert_eq!(body["user_plans_updated"], true);
    assert_eq!(body["user"]["plan_type"], "pro_lifetime");
    assert_eq!(body["verification"]["metadata_matches"], true);

    let row = ctx.plans.row(account.id).await.unwrap();
    assert_eq!(row.plan_type, "pro_lifetime");
    assert_eq!(row.subscription_status, "active");
}

#[tokio::test]
async fn test_upgrade_user_with_monthly_plan() {
    let ctx = create_test_context();
    let account = ctx.add_account("ada@example.com", json!({})).await;

    let body: Value = ctx
        .server
        .post("/v1/admin/upgrade-user")
        .json(&json!({"email": "ada@example.com", "planType": "pro"}))
        .await
        .json();
    assert_eq!(body["user"]["plan_type"], "pro");

    let meta = ctx.accounts.get(account.id).await.unwrap().user_metadata;
    assert_eq!(meta.plan(), Some("pro"));
    assert_eq!(meta.plan_type(), Some("pro"));
}

#[tokio::test]
async fn test_upgrade_user_rejects_bad_input() {
    let ctx = create_test_context();
    ctx.add_account("ada@example.com", json!({})).await;

    let response = ctx
        .server
        .post("/v1/admin/upgrade-user")
        .json(&json!({"email": "ada@example.com", "planType": "free"}))
        .await;
    assert_eq!(response.status_code(), 400);

    let response = ctx
        .server
        .post("/v1/admin/upgrade-user")
        .json(&json!({}))
        .await;
    assert_eq!(response.status_code(), 400);

    let response = ctx
        .server
        .post("/v1/admin/upgrade-user")
        .json(&json!({"email": "ghost@example.com"}))
        .await;
    assert_eq!(response.status_code(), 404);

    assert_eq!(ctx.accounts.update_count().await, 0);
}

#[tokio::test]
async fn test_check_user_reports_every_signal() {
    let ctx = create_test_context();
    ctx.add_account(
        "ada@example.com",
        json!({"plan": "pro", "subscription_status": "active", "referrer": "x"}),
    )
    .await;

    let response = ctx
        .server
        .post("/v1/admin/check-user")
        .json(&json!({"email": "ada@example.com"}))
        .await;
    assert_eq!(response.status_code(), 200);

    let body: Value = response.json();
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert_eq!(body["metadata"]["plan"], "pro");
    assert_eq!(body["metadata"]["full_metadata"]["referrer"], "x");
    assert_eq!(body["user_plans_table"]["data"], Value::Null);
    // Strict reading ignores `plan` without a premium `plan_type`
    assert_eq!(body["isPremium"], false);
}

#[tokio::test]
async fn test_check_user_unknown_email() {
    let ctx = create_test_context();

    let response = ctx
        .server
        .post("/v1/admin/check-user")
        .json(&json!({"email": "ghost@example.com"}))
        .await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_activate_upgrade_code() {
    let ctx = create_test_context();
    let account = ctx.add_account("ada@example.com", json!({})).await;

    let response = ctx
        .server
        .post("/v1/admin/activate-code")
        .json(&json!({"userId": account.id.to_string(), "code": PRO_UPGRADE_CODE}))
        .await;
    assert_eq!(response.status_code(), 200);

    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["action"], "pro_upgrade");
    assert_eq!(body["user"]["plan_type"], "pro_lifetime");
    assert_eq!(body["user_plans_updated"], true);
    assert!(body["note"].is_string());

    let plan: Value = ctx
        .server
        .get(&format!("/v1/plans/{}", account.id))
        .await
        .json();
    assert_eq!(plan["isUnlimited"], true);
}

#[tokio::test]
async fn test_activate_reset_code_clears_todays_count() {
    let ctx = create_test_context();
    let account = ctx.add_account("ada@example.com", json!({})).await;
    ctx.ledger.set_count(account.id, 20).await;

    let decision: Value = ctx
        .server
        .get(&format!("/v1/plans/{}/can-send", account.id))
        .await
        .json();
    assert_eq!(decision["canSend"], false);

    let body: Value = ctx
        .server
        .post("/v1/admin/activate-code")
        .json(&json!({"userId": account.id.to_string(), "code": RESET_MESSAGE_LIMIT_CODE}))
        .await
        .json();
    assert_eq!(body["action"], "reset_message_limit");
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert_eq!(ctx.ledger.count(account.id).await, 0);

    let decision: Value = ctx
        .server
        .get(&format!("/v1/plans/{}/can-send", account.id))
        .await
        .json();
    assert_eq!(decision["canSend"], true);
}

#[tokio::test]
async fn test_activate_code_rejections() {
    let ctx = create_test_context();
    let account = ctx.add_account("ada@example.com", json!({})).await;

    let response = ctx
        .server
        .post("/v1/admin/activate-code")
        .json(&json!({"userId": account.id.to_string(), "code": "NOT-A-CODE"}))
        .await;
    assert_eq!(response.status_code(), 400);
    assert_eq!(response.json::<Value>()["message"], "Invalid code");

    let response = ctx
        .server
        .post("/v1/admin/activate-code")
        .json(&json!({"code": PRO_UPGRADE_CODE}))
        .await;
    assert_eq!(response.status_code(), 400);

    let response = ctx
        .server
        .post("/v1/admin/activate-code")
        .json(&json!({"userId": "not-a-uuid", "code": PRO_UPGRADE_CODE}))
        .await;
    assert_eq!(response.status_code(), 400);

    let response = ctx
        .server
        .post("/v1/admin/activate-code")
        .json(&json!({
            "userId": "00000000-0000-0000-0000-000000000001",
            "code": PRO_UPGRADE_CODE
        }))
        .await;
    assert_eq!(response.status_code(), 404);

    assert_eq!(ctx.accounts.update_count().await, 0);
}
