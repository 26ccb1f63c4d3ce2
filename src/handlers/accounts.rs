use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};

use crate::auth::Principal;
use crate::error::AppError;
use crate::models::account::Account;
use crate::presenter::{AccountCollection, AccountResource};
use crate::AppState;

/// GET /api/accounts/me — the account belonging to the token's user.
pub async fn me(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, AppError> {
    tracing::info!(
        handler = "me",
        username = %principal.username,
        "Handler: GET /api/accounts/me"
    );

    let account = state.accounts.get_by_username(&principal.username).await?;

    Ok(Json(AccountResource::new(account, &state.links)))
}

/// POST /api/accounts/add — open registration.
pub async fn add(
    State(state): State<AppState>,
    Json(body): Json<Account>,
) -> Result<impl IntoResponse, AppError> {
    tracing::info!(
        handler = "add",
        username = %body.username,
        "Handler: POST /api/accounts/add"
    );

    tracing::debug!(handler = "add", "Dispatching to accounts.create");
    let created = state.accounts.create(body).await?;

    tracing::info!(
        handler = "add",
        username = %created.username,
        id = created.id,
        status = 201,
        "Responding: account created"
    );

    Ok((
        StatusCode::CREATED,
        Json(AccountResource::new(created, &state.links)),
    ))
}

/// GET /api/accounts/{username}
pub async fn get_by_username(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    tracing::info!(
        handler = "get_by_username",
        username = %username,
        "Handler: GET /api/accounts/{{username}}"
    );

    let account = state.accounts.get_by_username(&username).await?;

    Ok(Json(AccountResource::new(account, &state.links)))
}

/// PUT /api/accounts/update — wholesale overwrite of the account named in
/// the body.
pub async fn update(
    State(state): State<AppState>,
    Json(body): Json<Account>,
) -> Result<impl IntoResponse, AppError> {
    tracing::info!(
        handler = "update",
        username = %body.username,
        "Handler: PUT /api/accounts/update"
    );

    tracing::debug!(handler = "update", "Dispatching to accounts.update");
    let updated = state.accounts.update(body).await?;

    tracing::info!(
        handler = "update",
        username = %updated.username,
        status = 200,
        "Responding: account updated"
    );

    Ok(Json(AccountResource::new(updated, &state.links)))
}

/// DELETE /api/accounts/{username} — answers with the record as it was just
/// before removal.
pub async fn delete(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    tracing::info!(
        handler = "delete",
        username = %username,
        "Handler: DELETE /api/accounts/{{username}}"
    );

    let snapshot = state.accounts.delete(&username).await?;

    tracing::info!(
        handler = "delete",
        username = %username,
        status = 200,
        "Responding: account deleted"
    );

    Ok(Json(AccountResource::new(snapshot, &state.links)))
}

/// GET /api/accounts/ — every account, no pagination.
pub async fn list(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    tracing::info!(handler = "list", "Handler: GET /api/accounts/");

    let accounts = state.accounts.list_all().await?;

    tracing::info!(
        handler = "list",
        count = accounts.len(),
        status = 200,
        "Responding: account collection"
    );

    Ok(Json(AccountCollection::new(accounts, &state.links)))
}
