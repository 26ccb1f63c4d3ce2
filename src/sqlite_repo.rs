use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::error::AppError;
use crate::models::account::Account;
use crate::models::token::StoredToken;
use crate::repository::{AccountRepository, TokenRepository};
use crate::util::token_prefix;

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl AccountRepository for SqliteRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, AppError> {
        tracing::debug!(username, "db: SELECT account");

        let row: Option<Account> = sqlx::query_as(
            "SELECT id, username, password, email, first_name, last_name, age, gender \
             FROM accounts WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        tracing::debug!(username, found = row.is_some(), "db: account lookup result");

        Ok(row)
    }

    async fn list_all(&self) -> Result<Vec<Account>, AppError> {
        tracing::debug!("db: SELECT all accounts");

        let rows: Vec<Account> = sqlx::query_as(
            "SELECT id, username, password, email, first_name, last_name, age, gender \
             FROM accounts ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!(rows_returned = rows.len(), "db: accounts fetched");

        Ok(rows)
    }

    async fn upsert(&self, account: &Account) -> Result<Account, AppError> {
        tracing::debug!(username = %account.username, "db: INSERT OR UPDATE account");

        // id and username never change on conflict; the rowid assigned at
        // insert time is the account id for its whole life.
        let stored: Account = sqlx::query_as(
            "INSERT INTO accounts (username, password, email, first_name, last_name, age, gender) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (username) DO UPDATE SET \
               password = excluded.password, \
               email = excluded.email, \
               first_name = excluded.first_name, \
               last_name = excluded.last_name, \
               age = excluded.age, \
               gender = excluded.gender \
             RETURNING id, username, password, email, first_name, last_name, age, gender",
        )
        .bind(&account.username)
        .bind(&account.password)
        .bind(&account.email)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(account.age)
        .bind(account.gender)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(username = %stored.username, id = stored.id, "db: account upserted");

        Ok(stored)
    }

    async fn delete(&self, username: &str) -> Result<bool, AppError> {
        tracing::debug!(username, "db: DELETE account");

        let result = sqlx::query("DELETE FROM accounts WHERE username = ?")
            .bind(username)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        tracing::debug!(
            username,
            rows_affected = result.rows_affected(),
            deleted,
            "db: delete result"
        );

        Ok(deleted)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl TokenRepository for SqliteRepository {
    async fn store(&self, token: &StoredToken) -> Result<(), AppError> {
        tracing::debug!(
            access_token = %token_prefix(&token.access_token),
            username = %token.username,
            "db: INSERT token"
        );

        sqlx::query(
            "INSERT INTO tokens (access_token, refresh_token, username, client_id, scope, \
             issued_at, expires_at, refresh_expires_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&token.access_token)
        .bind(&token.refresh_token)
        .bind(&token.username)
        .bind(&token.client_id)
        .bind(&token.scope)
        .bind(token.issued_at)
        .bind(token.expires_at)
        .bind(token.refresh_expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_access_token(
        &self,
        access_token: &str,
    ) -> Result<Option<StoredToken>, AppError> {
        tracing::debug!(access_token = %token_prefix(access_token), "db: SELECT token by access");

        let row: Option<StoredToken> = sqlx::query_as(
            "SELECT access_token, refresh_token, username, client_id, scope, \
             issued_at, expires_at, refresh_expires_at \
             FROM tokens WHERE access_token = ?",
        )
        .bind(access_token)
        .fetch_optional(&self.pool)
        .await?;

        tracing::debug!(
            access_token = %token_prefix(access_token),
            found = row.is_some(),
            "db: token lookup result"
        );

        Ok(row)
    }

    async fn find_by_refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<Option<StoredToken>, AppError> {
        tracing::debug!(refresh_token = %token_prefix(refresh_token), "db: SELECT token by refresh");

        let row: Option<StoredToken> = sqlx::query_as(
            "SELECT access_token, refresh_token, username, client_id, scope, \
             issued_at, expires_at, refresh_expires_at \
             FROM tokens WHERE refresh_token = ?",
        )
        .bind(refresh_token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn rotate_access_token(
        &self,
        refresh_token: &str,
        access_token: &str,
        issued_at: i64,
        expires_at: i64,
    ) -> Result<Option<StoredToken>, AppError> {
        tracing::debug!(
            refresh_token = %token_prefix(refresh_token),
            "db: UPDATE token (rotate access)"
        );

        let row: Option<StoredToken> = sqlx::query_as(
            "UPDATE tokens SET access_token = ?, issued_at = ?, expires_at = ? \
             WHERE refresh_token = ? \
             RETURNING access_token, refresh_token, username, client_id, scope, \
             issued_at, expires_at, refresh_expires_at",
        )
        .bind(access_token)
        .bind(issued_at)
        .bind(expires_at)
        .bind(refresh_token)
        .fetch_optional(&self.pool)
        .await?;

        tracing::debug!(
            refresh_token = %token_prefix(refresh_token),
            rotated = row.is_some(),
            "db: rotate result"
        );

        Ok(row)
    }

    async fn purge_expired(&self, now: i64) -> Result<u64, AppError> {
        tracing::debug!(now, "db: DELETE expired tokens");

        let result =
            sqlx::query("DELETE FROM tokens WHERE expires_at < ? AND refresh_expires_at < ?")
                .bind(now)
                .bind(now)
                .execute(&self.pool)
                .await?;

        let rows = result.rows_affected();
        tracing::debug!(rows_affected = rows, "db: expired tokens purged");

        Ok(rows)
    }
}
