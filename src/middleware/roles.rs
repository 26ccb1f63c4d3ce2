use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::{Principal, Role};
use crate::error::AppError;

/// Gate a route group behind a role. Runs after `authenticate`, which is
/// responsible for placing the Principal extension.
fn check_role(req: &Request, role: Role, label: &str) -> Result<(), AppError> {
    match req.extensions().get::<Principal>() {
        Some(principal) if principal.has_role(role) => Ok(()),
        Some(principal) => {
            tracing::warn!(
                username = %principal.username,
                uri = %req.uri().path(),
                "Role gate: rejected — missing {label} role"
            );
            Err(AppError::Forbidden(format!("{label} role required")))
        }
        None => Err(AppError::Unauthorized("authentication required".into())),
    }
}

pub async fn require_admin(req: Request, next: Next) -> Response {
    match check_role(&req, Role::Admin, "admin") {
        Ok(()) => next.run(req).await,
        Err(e) => e.into_response(),
    }
}

/// The `/me` endpoint is reserved for the registered API client, so only
/// token-authenticated principals pass.
pub async fn require_client(req: Request, next: Next) -> Response {
    match check_role(&req, Role::IosUser, "client") {
        Ok(()) => next.run(req).await,
        Err(e) => e.into_response(),
    }
}
