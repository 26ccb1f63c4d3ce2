use serde::{Deserialize, Serialize};

/// A token pair as persisted in the store. The access token is the lookup
/// key presented on every request; the refresh token survives access-token
/// rotation.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredToken {
    pub access_token: String,
    pub refresh_token: String,
    pub username: String,
    pub client_id: String,
    pub scope: String,
    pub issued_at: i64,
    pub expires_at: i64,
    pub refresh_expires_at: i64,
}

impl StoredToken {
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at <= now
    }

    pub fn is_refresh_expired(&self, now: i64) -> bool {
        self.refresh_expires_at <= now
    }
}

/// Form body of `POST /oauth/token`. Client credentials may arrive here or
/// in a Basic Authorization header.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub grant_type: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_token: String,
    pub scope: String,
}
