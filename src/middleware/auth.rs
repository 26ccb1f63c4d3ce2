use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::{parse_basic, verify_user, Principal, Role};
use crate::error::AppError;
use crate::util::{now_millis, token_prefix};
use crate::AppState;

/// Resolve the Authorization header into a Principal and stash it as a
/// request extension. Bearer tokens come from the token store; Basic
/// credentials are checked against the account store. Anything else never
/// reaches a handler.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let method = req.method().clone();
    let uri = req.uri().path().to_string();

    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let resolved = match header.as_deref() {
        Some(h) if h.starts_with("Bearer ") => {
            resolve_bearer(&state, h["Bearer ".len()..].trim()).await
        }
        Some(h) if h.starts_with("Basic ") => resolve_basic(&state, h).await,
        Some(_) => Err(AppError::BadRequest(
            "unsupported authorization scheme".into(),
        )),
        None => Err(AppError::Unauthorized(
            "missing authorization header".into(),
        )),
    };

    match resolved {
        Ok(principal) => {
            tracing::debug!(
                username = %principal.username,
                method = %method,
                uri = %uri,
                "Auth middleware: principal resolved, forwarding to handler"
            );
            req.extensions_mut().insert(principal);
            next.run(req).await
        }
        Err(e) => {
            tracing::warn!(
                method = %method,
                uri = %uri,
                "Auth middleware: rejected — {e}"
            );
            e.into_response()
        }
    }
}

async fn resolve_bearer(state: &AppState, token: &str) -> Result<Principal, AppError> {
    let stored = state
        .tokens
        .find_by_access_token(token)
        .await?
        .ok_or_else(|| AppError::Unauthorized("invalid bearer token".into()))?;

    if stored.is_expired(now_millis()) {
        tracing::debug!(access_token = %token_prefix(token), "bearer token expired");
        return Err(AppError::Unauthorized("token expired".into()));
    }

    // Token-authenticated callers also carry the client's authority.
    let mut roles = state.auth.roles_for(&stored.username);
    roles.push(Role::IosUser);

    Ok(Principal {
        username: stored.username,
        roles,
    })
}

async fn resolve_basic(state: &AppState, header: &str) -> Result<Principal, AppError> {
    let (username, password) = parse_basic(header)
        .ok_or_else(|| AppError::BadRequest("malformed basic credentials".into()))?;

    verify_user(&state.accounts, &state.auth, &username, &password).await
}
