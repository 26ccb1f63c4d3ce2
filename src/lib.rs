pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod presenter;
pub mod repository;
pub mod service;
pub mod sqlite_repo;
pub mod util;

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use auth::AuthSettings;
use presenter::LinkTemplates;
use repository::TokenRepository;
use service::AccountService;

#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub tokens: Arc<dyn TokenRepository>,
    pub auth: Arc<AuthSettings>,
    pub links: LinkTemplates,
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/api/accounts/add", post(handlers::accounts::add))
        .route("/oauth/token", post(handlers::tokens::issue))
}

/// `/me` answers for the token's own user; it is reserved for the
/// registered API client.
fn client_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/accounts/me", get(handlers::accounts::me))
        .layer(axum_middleware::from_fn(middleware::roles::require_client))
        .layer(axum_middleware::from_fn_with_state(
            state,
            middleware::auth::authenticate,
        ))
}

fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/accounts/", get(handlers::accounts::list))
        .route(
            "/api/accounts/{username}",
            get(handlers::accounts::get_by_username).delete(handlers::accounts::delete),
        )
        .route("/api/accounts/update", put(handlers::accounts::update))
        .layer(axum_middleware::from_fn(middleware::roles::require_admin))
        .layer(axum_middleware::from_fn_with_state(
            state,
            middleware::auth::authenticate,
        ))
}

fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health_check))
}

/// Build the full application router (used by main and tests).
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(public_routes())
        .merge(client_routes(state.clone()))
        .merge(admin_routes(state.clone()))
        .merge(health_routes())
        .with_state(state)
}
