use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap},
    response::IntoResponse,
    Form, Json,
};

use crate::auth::{mint_token, parse_basic, verify_user};
use crate::error::AppError;
use crate::models::token::{StoredToken, TokenRequest, TokenResponse};
use crate::util::{now_millis, token_prefix};
use crate::AppState;

/// POST /oauth/token — password and refresh_token grants for the one
/// registered client. Client credentials arrive via Basic auth or form
/// fields.
pub async fn issue(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(body): Form<TokenRequest>,
) -> Result<impl IntoResponse, AppError> {
    tracing::info!(
        handler = "issue_token",
        grant_type = %body.grant_type,
        "Handler: POST /oauth/token"
    );

    authenticate_client(&state, &headers, &body)?;

    let token = match body.grant_type.as_str() {
        "password" => password_grant(&state, &body).await?,
        "refresh_token" => refresh_grant(&state, &body).await?,
        other => {
            return Err(AppError::BadRequest(format!(
                "unsupported grant_type: {other}"
            )))
        }
    };

    tracing::info!(
        handler = "issue_token",
        username = %token.username,
        access_token = %token_prefix(&token.access_token),
        status = 200,
        "Responding: token issued"
    );

    Ok(Json(TokenResponse {
        expires_in: state.auth.token_ttl_secs,
        access_token: token.access_token,
        token_type: "bearer".to_string(),
        refresh_token: token.refresh_token,
        scope: token.scope,
    }))
}

fn authenticate_client(
    state: &AppState,
    headers: &HeaderMap,
    body: &TokenRequest,
) -> Result<(), AppError> {
    let from_header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_basic);

    let (client_id, client_secret) = match from_header {
        Some(pair) => pair,
        None => match (&body.client_id, &body.client_secret) {
            (Some(id), Some(secret)) => (id.clone(), secret.clone()),
            _ => {
                return Err(AppError::Unauthorized(
                    "client authentication required".into(),
                ))
            }
        },
    };

    if !state.auth.client_matches(&client_id, &client_secret) {
        tracing::warn!(handler = "issue_token", client_id = %client_id, "unknown client");
        return Err(AppError::Unauthorized("invalid client credentials".into()));
    }

    Ok(())
}

async fn password_grant(state: &AppState, body: &TokenRequest) -> Result<StoredToken, AppError> {
    let (username, password) = match (&body.username, &body.password) {
        (Some(u), Some(p)) => (u.as_str(), p.as_str()),
        _ => {
            return Err(AppError::BadRequest(
                "username and password are required".into(),
            ))
        }
    };

    let principal = verify_user(&state.accounts, &state.auth, username, password).await?;

    let scope = match &body.scope {
        Some(requested) if !state.auth.scope_allowed(requested) => {
            return Err(AppError::BadRequest("invalid scope".into()))
        }
        Some(requested) => requested.clone(),
        None => state.auth.scope_string(),
    };

    let token = mint_token(&state.auth, &principal.username, scope);
    state.tokens.store(&token).await?;

    Ok(token)
}

/// Rotate the access token behind a live refresh token. The refresh token
/// itself is kept, so the stored pair keeps its row.
async fn refresh_grant(state: &AppState, body: &TokenRequest) -> Result<StoredToken, AppError> {
    let refresh_token = body
        .refresh_token
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("refresh_token is required".into()))?;

    let existing = state
        .tokens
        .find_by_refresh_token(refresh_token)
        .await?
        .ok_or_else(|| AppError::Unauthorized("invalid refresh token".into()))?;

    if existing.is_refresh_expired(now_millis()) {
        return Err(AppError::Unauthorized("refresh token expired".into()));
    }

    let now = now_millis();
    let rotated = state
        .tokens
        .rotate_access_token(
            refresh_token,
            &crate::auth::new_token_value(),
            now,
            now + state.auth.token_ttl_secs * 1000,
        )
        .await?
        .ok_or_else(|| AppError::Unauthorized("invalid refresh token".into()))?;

    Ok(rotated)
}
