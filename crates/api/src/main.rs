use api::{create_router, ApiDoc, AppState, CheckoutLinks};
use services::{
    account::AuthAdminClient,
    admin::{AdminServiceConfig, AdminServiceImpl},
    chat::{ChatServiceImpl, OpenAiCompatibleClient},
    entitlement::{EntitlementServiceImpl, LocalQuotaCounter},
    payments::{PaymentSyncServiceConfig, PaymentSyncServiceImpl, WhopClient},
    reconciliation::ReconciliationServiceImpl,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

fn init_tracing(logging: &config::LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.filter_directive().into());

    if logging.is_json() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Warning: Could not load .env file: {}", e);
        eprintln!("Continuing with environment variables...");
    }

    // Load configuration from environment
    let config = config::Config::from_env();
    init_tracing(&config.logging);

    tracing::info!("Starting API server...");
    tracing::info!("Server: {}:{}", config.server.host, config.server.port);

    if !config.auth_provider.is_configured() {
        tracing::warn!("Auth provider URL or service key missing; account operations will fail");
    }
    if config.payments.webhook_secret.is_empty() {
        tracing::warn!("WHOP_WEBHOOK_SECRET not set; every webhook delivery will be rejected");
    }
    if !config.llm.is_configured() {
        tracing::warn!("LLM provider not configured; chat will return placeholder replies");
    }
    if config.admin.api_token.is_none() {
        tracing::warn!("ADMIN_API_TOKEN not set; admin routes are unauthenticated");
    }

    // Create database and run migrations
    tracing::info!("Connecting to database...");
    let db = database::Database::from_config(&config.database).await?;

    if config.database.skip_migrations {
        tracing::info!("Skipping migrations (DATABASE_SKIP_MIGRATIONS)");
    } else {
        tracing::info!("Running migrations...");
        db.run_migrations().await?;
    }

    // Get repositories
    let user_plan_repo = db.user_plan_repository();
    let message_ledger = db.message_ledger();

    // Create services
    tracing::info!("Initializing services...");
    let account_store = Arc::new(AuthAdminClient::new(
        config.auth_provider.url.clone(),
        config.auth_provider.service_key.clone(),
    ));

    let reconciliation = Arc::new(ReconciliationServiceImpl::new(
        account_store.clone(),
        user_plan_repo.clone(),
    ));

    let entitlement_service = Arc::new(
        EntitlementServiceImpl::new(
            user_plan_repo,
            message_ledger,
            Arc::new(LocalQuotaCounter::new()),
        )
        .with_daily_limit(config.quota.free_daily_message_limit),
    );

    let payment_sync_service = Arc::new(PaymentSyncServiceImpl::new(PaymentSyncServiceConfig {
        account_store: account_store.clone(),
        reconciliation: reconciliation.clone(),
        payments_client: Arc::new(WhopClient::new(
            config.payments.api_key.clone(),
            config.payments.api_base_url.clone(),
        )),
        webhook_secret: config.payments.webhook_secret.clone(),
        lifetime_plan_id: config.payments.lifetime_plan_id.clone(),
    }));

    let admin_service = Arc::new(AdminServiceImpl::new(AdminServiceConfig {
        account_store: account_store.clone(),
        reconciliation,
        entitlement: entitlement_service.clone(),
        pro_upgrade_code: config.activation.pro_upgrade_code.clone(),
        reset_message_limit_code: config.activation.reset_message_limit_code.clone(),
    }));

    let chat_service = Arc::new(ChatServiceImpl::new(
        Arc::new(OpenAiCompatibleClient::new(
            config.llm.endpoint.clone(),
            config.llm.api_key.clone(),
            config.llm.model.clone(),
        )),
        entitlement_service.clone(),
    ));

    // Create application state
    let app_state = AppState {
        account_store,
        entitlement_service,
        payment_sync_service,
        admin_service,
        chat_service,
        checkout_links: CheckoutLinks {
            monthly_url: config.payments.checkout_url_monthly.clone(),
            lifetime_url: config.payments.checkout_url_lifetime.clone(),
        },
        admin_api_token: config.admin.api_token.clone().map(Arc::new),
    };

    // Create router
    let app = create_router(app_state, config.cors.clone())
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/docs", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
