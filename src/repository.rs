use async_trait::async_trait;

use crate::error::AppError;
use crate::models::account::Account;
use crate::models::token::StoredToken;

/// Keyed account storage. Username is the key; `upsert` inserts a new row
/// (assigning the id) or overwrites the mutable columns of an existing one,
/// leaving id and username alone.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, AppError>;
    async fn list_all(&self) -> Result<Vec<Account>, AppError>;
    async fn upsert(&self, account: &Account) -> Result<Account, AppError>;
    async fn delete(&self, username: &str) -> Result<bool, AppError>;
    async fn health_check(&self) -> Result<(), AppError>;
}

/// Durable store for issued bearer tokens, keyed by the opaque token value.
#[async_trait]
pub trait TokenRepository: Send + Sync {
    async fn store(&self, token: &StoredToken) -> Result<(), AppError>;
    async fn find_by_access_token(
        &self,
        access_token: &str,
    ) -> Result<Option<StoredToken>, AppError>;
    async fn find_by_refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<Option<StoredToken>, AppError>;

    /// Swap in a fresh access token for the pair identified by this refresh
    /// token. Returns the updated row, or None if the refresh token is
    /// unknown.
    async fn rotate_access_token(
        &self,
        refresh_token: &str,
        access_token: &str,
        issued_at: i64,
        expires_at: i64,
    ) -> Result<Option<StoredToken>, AppError>;

    async fn purge_expired(&self, now: i64) -> Result<u64, AppError>;
}
