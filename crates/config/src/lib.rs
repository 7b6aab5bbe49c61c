use serde::Deserialize;
use std::collections::HashMap;

/// Read a secret either from `<NAME>_FILE` (trimmed file contents) or from `<NAME>`.
fn secret_from_env(name: &str) -> String {
    let file_var = format!("{}_FILE", name);
    if let Ok(path) = std::env::var(&file_var) {
        std::fs::read_to_string(&path)
            .map(|p| p.trim().to_string())
            .unwrap_or_else(|e| panic!("Failed to read {} at {}: {}", file_var, path, e))
    } else {
        std::env::var(name).unwrap_or_default()
    }
}

/// First non-empty value among the given environment variables.
fn first_env(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false)
}

#[derive(Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Full connection URL; takes precedence over the individual fields when set.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub max_connections: usize,
    pub tls_enabled: bool,
    pub tls_accept_invalid_certs: bool,
    /// Skip embedded migrations at startup (the tables are then managed elsewhere).
    pub skip_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: first_env(&["DATABASE_URL"]),
            host: std::env::var("DATABASE_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("DATABASE_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5432),
            database: std::env::var("DATABASE_NAME").unwrap_or_else(|_| "duna".to_string()),
            username: std::env::var("DATABASE_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: {
                let password = secret_from_env("DATABASE_PASSWORD");
                if password.is_empty() {
                    "postgres".to_string()
                } else {
                    password
                }
            },
            max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(10),
            tls_enabled: env_flag("DATABASE_TLS_ENABLED"),
            tls_accept_invalid_certs: env_flag("DATABASE_TLS_ACCEPT_INVALID_CERTS"),
            skip_migrations: env_flag("DATABASE_SKIP_MIGRATIONS"),
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url.as_ref().map(|_| "[REDACTED]"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .field("tls_enabled", &self.tls_enabled)
            .field("tls_accept_invalid_certs", &self.tls_accept_invalid_certs)
            .field("skip_migrations", &self.skip_migrations)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("SERVER_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
        }
    }
}

/// Auth provider (Supabase-style) admin access used for account lookups and metadata writes
#[derive(Clone, Deserialize)]
pub struct AuthProviderConfig {
    /// Project URL, e.g. https://xyz.supabase.co
    pub url: String,
    /// Service-role key with admin rights on the auth API
    pub service_key: String,
}

impl Default for AuthProviderConfig {
    fn default() -> Self {
        Self {
            url: first_env(&["SUPABASE_URL", "NEXT_PUBLIC_SUPABASE_URL"])
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_default(),
            service_key: secret_from_env("SUPABASE_SERVICE_ROLE_KEY"),
        }
    }
}

impl AuthProviderConfig {
    /// Returns true if both the URL and the service key are set
    pub fn is_configured(&self) -> bool {
        !self.url.is_empty() && !self.service_key.is_empty()
    }
}

impl std::fmt::Debug for AuthProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthProviderConfig")
            .field("url", &self.url)
            .field("service_key", &"[REDACTED]")
            .finish()
    }
}

pub const DEFAULT_WHOP_MONTHLY_PLAN_ID: &str = "plan_vhBLiFWs6AJNx";
pub const DEFAULT_WHOP_LIFETIME_PLAN_ID: &str = "plan_nAv9o4mMRgV37";

/// Payment platform (Whop) configuration
#[derive(Clone, Deserialize)]
pub struct PaymentsConfig {
    /// API key for the membership listing API; empty disables the lookup
    pub api_key: String,
    /// Shared secret for webhook HMAC signatures; empty rejects every webhook
    pub webhook_secret: String,
    pub api_base_url: String,
    pub monthly_plan_id: String,
    pub lifetime_plan_id: String,
    pub checkout_url_monthly: String,
    pub checkout_url_lifetime: String,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        let monthly_plan_id = first_env(&["WHOP_MONTHLY_PLAN_ID"])
            .unwrap_or_else(|| DEFAULT_WHOP_MONTHLY_PLAN_ID.to_string());
        let lifetime_plan_id = first_env(&["WHOP_LIFETIME_PLAN_ID"])
            .unwrap_or_else(|| DEFAULT_WHOP_LIFETIME_PLAN_ID.to_string());
        Self {
            api_key: secret_from_env("WHOP_API_KEY"),
            webhook_secret: secret_from_env("WHOP_WEBHOOK_SECRET"),
            api_base_url: first_env(&["WHOP_API_BASE_URL"])
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| "https://api.whop.com/api/v2".to_string()),
            checkout_url_monthly: first_env(&[
                "WHOP_CHECKOUT_MONTHLY",
                "NEXT_PUBLIC_WHOP_CHECKOUT_MONTHLY",
            ])
            .unwrap_or_else(|| format!("https://whop.com/checkout/{}?d2c=true", monthly_plan_id)),
            checkout_url_lifetime: first_env(&[
                "WHOP_CHECKOUT_LIFETIME",
                "NEXT_PUBLIC_WHOP_CHECKOUT_LIFETIME",
            ])
            .unwrap_or_else(|| format!("https://whop.com/checkout/{}?d2c=true", lifetime_plan_id)),
            monthly_plan_id,
            lifetime_plan_id,
        }
    }
}

impl std::fmt::Debug for PaymentsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentsConfig")
            .field("api_key", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .field("api_base_url", &self.api_base_url)
            .field("monthly_plan_id", &self.monthly_plan_id)
            .field("lifetime_plan_id", &self.lifetime_plan_id)
            .field("checkout_url_monthly", &self.checkout_url_monthly)
            .field("checkout_url_lifetime", &self.checkout_url_lifetime)
            .finish()
    }
}

/// OpenAI-compatible chat completion provider
#[derive(Clone, Deserialize)]
pub struct LlmConfig {
    /// Full chat completions URL
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        let api_key = {
            let key = secret_from_env("LLM_API_KEY");
            if key.is_empty() {
                std::env::var("AI_TOKEN").unwrap_or_default()
            } else {
                key
            }
        };
        Self {
            endpoint: first_env(&["LLM_ENDPOINT", "AI_ENDPOINT"])
                .unwrap_or_else(|| "https://api.openai.com/v1/chat/completions".to_string()),
            api_key,
            model: first_env(&["LLM_MODEL"]).unwrap_or_else(|| "gpt-4o-mini".to_string()),
        }
    }
}

impl LlmConfig {
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuotaConfig {
    /// Messages per UTC day for free accounts
    pub free_daily_message_limit: u32,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            free_daily_message_limit: std::env::var("FREE_DAILY_MESSAGE_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20),
        }
    }
}

pub const DEFAULT_PRO_UPGRADE_CODE: &str = "IzEgQWkgRHVuZXdvcmtzIDY3";
pub const DEFAULT_RESET_MESSAGE_LIMIT_CODE: &str = "RHVuZXdvcmtzIElzICMxIERldiBTZXJ2ZXI=";

/// Shared codes accepted by the code-activation endpoint
#[derive(Clone, Deserialize)]
pub struct ActivationConfig {
    pub pro_upgrade_code: String,
    pub reset_message_limit_code: String,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            pro_upgrade_code: first_env(&["PRO_UPGRADE_CODE"])
                .unwrap_or_else(|| DEFAULT_PRO_UPGRADE_CODE.to_string()),
            reset_message_limit_code: first_env(&["RESET_MESSAGE_LIMIT_CODE"])
                .unwrap_or_else(|| DEFAULT_RESET_MESSAGE_LIMIT_CODE.to_string()),
        }
    }
}

impl std::fmt::Debug for ActivationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivationConfig")
            .field("pro_upgrade_code", &"[REDACTED]")
            .field("reset_message_limit_code", &"[REDACTED]")
            .finish()
    }
}

#[derive(Clone, Deserialize, Default)]
pub struct AdminConfig {
    /// Bearer token required on /v1/admin routes; None leaves them open
    pub api_token: Option<String>,
}

impl AdminConfig {
    pub fn from_env() -> Self {
        let token = secret_from_env("ADMIN_API_TOKEN");
        Self {
            api_token: (!token.is_empty()).then_some(token),
        }
    }
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub exact_matches: Vec<String>,
    pub wildcard_suffixes: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        let raw_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        let mut exact_matches = Vec::new();
        let mut wildcard_suffixes = Vec::new();

        for origin in raw_origins.split(',') {
            let s = origin.trim();
            if s.is_empty() {
                continue;
            }

            if let Some(suffix) = s.strip_prefix('*') {
                let safe_suffix = if suffix.starts_with('.') || suffix.starts_with('-') {
                    suffix.to_string()
                } else {
                    format!(".{}", suffix)
                };
                wildcard_suffixes.push(safe_suffix);
            } else {
                exact_matches.push(s.to_string());
            }
        }

        Self {
            exact_matches,
            wildcard_suffixes,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Global log level: "error", "warn", "info", "debug" or "trace".
    pub level: String,
    /// Output format: "pretty" or "json".
    pub format: String,
    /// Per-module log levels.
    pub modules: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let mut modules = HashMap::new();

        if let Ok(level) = std::env::var("LOG_MODULE_API") {
            modules.insert("api".to_string(), level);
        }
        if let Ok(level) = std::env::var("LOG_MODULE_SERVICES") {
            modules.insert("services".to_string(), level);
        }
        if let Ok(level) = std::env::var("LOG_MODULE_DATABASE") {
            modules.insert("database".to_string(), level);
        }

        Self {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
            modules,
        }
    }
}

impl LoggingConfig {
    /// Filter directive string, e.g. "info,api=debug"
    pub fn filter_directive(&self) -> String {
        let mut modules: Vec<_> = self.modules.iter().collect();
        modules.sort();
        let mut directive = self.level.clone();
        for (module, level) in modules {
            directive.push_str(&format!(",{}={}", module, level));
        }
        directive
    }

    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub auth_provider: AuthProviderConfig,
    pub payments: PaymentsConfig,
    pub llm: LlmConfig,
    pub quota: QuotaConfig,
    pub activation: ActivationConfig,
    pub admin: AdminConfig,
    pub cors: CorsConfig,
    pub logging: LoggingConfig,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database: DatabaseConfig::default(),
            server: ServerConfig::default(),
            auth_provider: AuthProviderConfig::default(),
            payments: PaymentsConfig::default(),
            llm: LlmConfig::default(),
            quota: QuotaConfig::default(),
            activation: ActivationConfig::default(),
            admin: AdminConfig::from_env(),
            cors: CorsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
