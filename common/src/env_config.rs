use std::{env, sync::Arc};

#[derive(Clone, Debug)]
/// Configuration struct for the server.
///
/// This struct holds all the necessary configuration parameters
/// required to initialize and run the server and the provisioning worker.
/// It includes database connection details, JWT configuration,
/// server host and port, number of worker threads, CORS settings,
/// logging preferences, Stripe credentials and the Pterodactyl panel client.
pub struct Config {
    // environment
    pub environment: String, // development or production
    /// The URL of the database to connect to.
    pub database_url: String,
    /// Configuration for JWT (JSON Web Token) authentication.
    pub jwt_config: JwtConfig,
    /// The hostname or IP address the server will bind to.
    pub server_host: String,
    /// The port number the server will listen on.
    pub server_port: u16,
    /// The number of worker threads to spawn for handling requests.
    pub num_workers: usize,
    /// The allowed origin for CORS (Cross-Origin Resource Sharing).
    pub cors_allowed_origin: String,
    /// A boolean indicating whether console logging is enabled.
    pub console_logging_enabled: bool,
    /// Path of the log file written next to stdout.
    pub log_file: String,
    /// Public URL of the web application, used for checkout redirects.
    pub app_url: String,
    /// Path of the JSON catalog with plans, games and regions.
    pub catalog_path: String,
    /// Shared key other services send in `X-Internal-Key`.
    pub internal_api_key: String,
    /// Requests per second accepted by the global limiter.
    pub rate_limit_per_second: u32,
    /// Stripe secret key
    pub stripe_secret_key: String,
    /// Stripe webhook secret
    pub stripe_webhook_secret: String,
    /// Pterodactyl Application API client settings.
    pub panel: PanelConfig,
    /// Retry and polling settings for background jobs.
    pub worker: WorkerConfig,
}

#[derive(Clone, Debug)]
/// Configuration for JSON Web Token (JWT) authentication.
///
/// This struct contains the secret key used to verify JWTs and
/// the expiration time in hours for issued tokens.
pub struct JwtConfig {
    /// The secret key used to sign and verify JWTs.
    pub secret: String,
    /// The expiration time for JWTs in hours.
    pub expiration_hours: i64,
}

#[derive(Clone, Debug)]
/// Connection settings for the Pterodactyl Application API.
pub struct PanelConfig {
    /// Base URL of the panel, without a trailing slash.
    pub url: String,
    /// Application API key (`ptla_...`).
    pub api_key: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct WorkerConfig {
    pub max_attempts: i32,
    pub backoff_secs: i64,
    pub poll_interval_secs: u64,
    /// Running jobs older than this are considered abandoned and re-queued.
    pub lock_timeout_secs: i64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        WorkerConfig {
            max_attempts: 5,
            backoff_secs: 60,
            poll_interval_secs: 5,
            lock_timeout_secs: 600,
        }
    }
}

impl JwtConfig {
    /// Creates a new `JwtConfig` instance from environment variables.
    ///
    /// Reads the JWT configuration from environment variables:
    /// - `JWT_SECRET`: Required. The secret key for JWT verification.
    /// - `JWT_EXPIRATION_HOURS`: Optional. Defaults to 24 hours if not provided.
    ///
    /// # Panics
    ///
    /// This function will panic if:
    /// - `JWT_SECRET` environment variable is not set
    /// - `JWT_EXPIRATION_HOURS` is set but cannot be parsed as a valid number
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        JwtConfig {
            secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .expect("JWT_EXPIRATION_HOURS must be a valid number"),
        }
    }
}

impl PanelConfig {
    /// Reads `PTERODACTYL_URL` and `PTERODACTYL_API_KEY` (both required) and
    /// the optional `PTERODACTYL_TIMEOUT_SECS` (default 30).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        PanelConfig {
            url: env::var("PTERODACTYL_URL")
                .expect("PTERODACTYL_URL must be set")
                .trim_end_matches('/')
                .to_string(),
            api_key: env::var("PTERODACTYL_API_KEY").expect("PTERODACTYL_API_KEY must be set"),
            timeout_secs: parse_or("PTERODACTYL_TIMEOUT_SECS", 30),
        }
    }
}

impl WorkerConfig {
    pub fn from_env() -> Self {
        let defaults = WorkerConfig::default();
        WorkerConfig {
            max_attempts: parse_or("PROVISION_MAX_ATTEMPTS", defaults.max_attempts),
            backoff_secs: parse_or("PROVISION_BACKOFF_SECS", defaults.backoff_secs),
            poll_interval_secs: parse_or("WORKER_POLL_INTERVAL_SECS", defaults.poll_interval_secs),
            lock_timeout_secs: parse_or("WORKER_LOCK_TIMEOUT_SECS", defaults.lock_timeout_secs),
        }
    }
}

impl Config {
    /// Creates a new `Config` instance from environment variables.
    ///
    /// Loads all configuration values from environment variables with sensible defaults
    /// for most optional settings.
    ///
    /// # Environment Variables
    ///
    /// Required:
    /// - `ENVIRONMENT`: `development` or `production`
    /// - `DATABASE_URL`: Connection string for the database
    /// - `JWT_SECRET`: Secret key for JWT verification (via `JwtConfig::from_env()`)
    /// - `PTERODACTYL_URL`, `PTERODACTYL_API_KEY` (via `PanelConfig::from_env()`)
    ///
    /// Optional (with defaults):
    /// - `IP`: Server host (default: "127.0.0.1")
    /// - `PORT`: Server port (default: 8080)
    /// - `WORKERS`: Number of worker threads (default: 4)
    /// - `CORS_ALLOWED_ORIGIN`: Allowed CORS origin (default: "http://localhost:3000")
    /// - `ENABLE_CONSOLE_LOGGING`: Whether to enable console logging (default: true)
    /// - `LOG_FILE`: Log file path (default: "quark.log")
    /// - `APP_URL`: Public web app URL (default: "http://localhost:3000")
    /// - `CATALOG_PATH`: Catalog file (default: "catalog.json")
    /// - `RATE_LIMIT_PER_SECOND`: Global request budget (default: 20)
    /// - Worker retry settings (see `WorkerConfig::from_env()`)
    ///
    /// # Panics
    ///
    /// This function will panic if required environment variables are missing or if
    /// numeric values cannot be parsed correctly.
    pub fn from_env() -> Arc<Self> {
        dotenvy::dotenv().ok();

        let stripe_secret_key = env::var("STRIPE_SECRET_KEY").unwrap_or_default();
        let stripe_webhook_secret = env::var("STRIPE_WEBHOOK_SECRET").unwrap_or_default();

        Arc::new(Config {
            environment: env::var("ENVIRONMENT").expect("ENVIRONMENT must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            jwt_config: JwtConfig::from_env(),
            server_host: env::var("IP").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: parse_or("PORT", 8080),
            num_workers: parse_or("WORKERS", 4),
            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            console_logging_enabled: env::var("ENABLE_CONSOLE_LOGGING")
                .unwrap_or_else(|_| "true".to_string())
                .to_lowercase()
                == "true",
            log_file: env::var("LOG_FILE").unwrap_or_else(|_| "quark.log".to_string()),
            app_url: env::var("APP_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string())
                .trim_end_matches('/')
                .to_string(),
            catalog_path: env::var("CATALOG_PATH").unwrap_or_else(|_| "catalog.json".to_string()),
            internal_api_key: env::var("INTERNAL_API_KEY").unwrap_or_default(),
            rate_limit_per_second: parse_or("RATE_LIMIT_PER_SECOND", 20),
            stripe_secret_key,
            stripe_webhook_secret,
            panel: PanelConfig::from_env(),
            worker: WorkerConfig::from_env(),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
