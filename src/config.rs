use dotenvy::dotenv;
use std::env;

/// Immutable engine configuration, read once at startup. Changing any of
/// these requires a restart.
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub server_addr: String,

    // Device polling
    pub device_poll_minutes: u64,
    pub device_http_timeout_secs: u64,

    // Transfer execution job
    pub transfer_exec_hour: u32,
    pub transfer_exec_minute: u32,
    pub transfer_retry_interval_hours: u64,

    pub api_prefix: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_addr: env::var("SERVER_ADDR").expect("SERVER_ADDR must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),

            device_poll_minutes: env::var("DEVICE_POLL_MINUTES")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .unwrap(),
            device_http_timeout_secs: env::var("DEVICE_HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap(),

            transfer_exec_hour: env::var("TRANSFER_EXEC_HOUR")
                .unwrap_or_else(|_| "0".to_string())
                .parse()
                .unwrap(),
            transfer_exec_minute: env::var("TRANSFER_EXEC_MINUTE")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap(),
            transfer_retry_interval_hours: env::var("TRANSFER_RETRY_INTERVAL_HOURS")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .unwrap(),

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
        }
    }
}
