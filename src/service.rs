use std::sync::Arc;

use crate::error::AppError;
use crate::models::account::{is_valid_username, Account};
use crate::repository::AccountRepository;

/// Account lifecycle rules over a keyed store. The store only knows how to
/// get/list/upsert/delete; uniqueness of usernames and the full-overwrite
/// update contract live here.
#[derive(Clone)]
pub struct AccountService {
    repo: Arc<dyn AccountRepository>,
}

impl AccountService {
    pub fn new(repo: Arc<dyn AccountRepository>) -> Self {
        Self { repo }
    }

    /// Create a new account. The caller-supplied id is discarded; the store
    /// assigns the real one.
    pub async fn create(&self, mut account: Account) -> Result<Account, AppError> {
        if !is_valid_username(&account.username) {
            return Err(AppError::BadRequest(
                "username must be 1-20 characters".into(),
            ));
        }

        if self.repo.find_by_username(&account.username).await?.is_some() {
            return Err(AppError::AlreadyExists("user already exists".into()));
        }

        account.id = 0;
        let stored = self.repo.upsert(&account).await?;

        tracing::info!(username = %stored.username, id = stored.id, "account created");

        Ok(stored)
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Account, AppError> {
        self.repo
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound("user does not exist".into()))
    }

    /// Overwrite every mutable field of the account named by
    /// `incoming.username` with the incoming values. Absent optionals clear
    /// the stored ones; there is no merge.
    pub async fn update(&self, incoming: Account) -> Result<Account, AppError> {
        let mut existing = self
            .repo
            .find_by_username(&incoming.username)
            .await?
            .ok_or_else(|| AppError::NotFound("user does not exist".into()))?;

        existing.password = incoming.password;
        existing.email = incoming.email;
        existing.first_name = incoming.first_name;
        existing.last_name = incoming.last_name;
        existing.age = incoming.age;
        existing.gender = incoming.gender;

        let stored = self.repo.upsert(&existing).await?;

        tracing::info!(username = %stored.username, "account updated");

        Ok(stored)
    }

    /// Remove the account, answering with its state just before removal.
    pub async fn delete(&self, username: &str) -> Result<Account, AppError> {
        let existing = self
            .repo
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound("user does not exist".into()))?;

        self.repo.delete(username).await?;

        tracing::info!(username, "account deleted");

        Ok(existing)
    }

    pub async fn list_all(&self) -> Result<Vec<Account>, AppError> {
        self.repo.list_all().await
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.repo.health_check().await
    }
}
