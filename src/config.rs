use std::env;

pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// External base URL used to build hypermedia hrefs.
    pub base_url: String,
    pub cors_origins: Vec<String>,
    pub max_payload_bytes: usize,
    pub client_id: String,
    pub client_secret: String,
    pub operator_username: String,
    pub operator_password: String,
    pub token_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
    pub token_sweep_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        Self {
            port,
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:accounts-api.db".to_string()),
            base_url: env::var("BASE_URL")
                .unwrap_or_else(|_| format!("http://localhost:{port}")),
            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:5173".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_payload_bytes: env::var("MAX_PAYLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(65_536), // 64 KB
            client_id: env::var("OAUTH_CLIENT_ID").unwrap_or_else(|_| "ios-client".to_string()),
            client_secret: env::var("OAUTH_CLIENT_SECRET").unwrap_or_else(|_| "ios".to_string()),
            operator_username: env::var("OPERATOR_USERNAME")
                .unwrap_or_else(|_| "admin".to_string()),
            operator_password: env::var("OPERATOR_PASSWORD")
                .unwrap_or_else(|_| "admin".to_string()),
            token_ttl_secs: env::var("TOKEN_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60 * 60 * 24), // 24 hours
            refresh_ttl_secs: env::var("REFRESH_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60 * 60 * 24 * 30),
            token_sweep_interval_secs: env::var("TOKEN_SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60 * 60),
        }
    }
}
