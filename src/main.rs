use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::{self, TraceLayer};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use accounts_api::auth::AuthSettings;
use accounts_api::config::Config;
use accounts_api::presenter::LinkTemplates;
use accounts_api::repository::TokenRepository;
use accounts_api::service::AccountService;
use accounts_api::sqlite_repo::SqliteRepository;
use accounts_api::util::now_millis;
use accounts_api::{build_app, db, AppState};

fn build_cors(config: &Config) -> CorsLayer {
    let origins: Vec<_> = config
        .cors_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(AllowMethods::any())
        .allow_headers(AllowHeaders::any())
}

/// Background job: drop token rows whose access and refresh windows have
/// both closed.
async fn token_sweep_job(tokens: Arc<dyn TokenRepository>, sweep_interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(sweep_interval_secs));

    loop {
        interval.tick().await;

        match tokens.purge_expired(now_millis()).await {
            Ok(count) => {
                if count > 0 {
                    tracing::info!("Swept {} expired tokens", count);
                }
            }
            Err(e) => tracing::error!("Token sweep error: {e}"),
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();

    let pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to initialize database");

    tracing::info!("Database initialized at {}", config.database_url);

    let cors = build_cors(&config);

    let repo = Arc::new(SqliteRepository::new(pool.clone()));
    let tokens: Arc<dyn TokenRepository> = repo.clone();
    let state = AppState {
        accounts: AccountService::new(repo),
        tokens: tokens.clone(),
        auth: Arc::new(AuthSettings {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            client_scopes: vec!["read".to_string(), "write".to_string()],
            operator_username: config.operator_username.clone(),
            operator_password: config.operator_password.clone(),
            token_ttl_secs: config.token_ttl_secs,
            refresh_ttl_secs: config.refresh_ttl_secs,
        }),
        links: LinkTemplates::new(&config.base_url),
    };

    let app = build_app(state)
        .layer(RequestBodyLimitLayer::new(config.max_payload_bytes))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_request(trace::DefaultOnRequest::new().level(Level::INFO))
                .on_response(
                    trace::DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(tower_http::LatencyUnit::Millis),
                ),
        )
        .layer(cors);

    // Spawn token sweep background job
    tokio::spawn(token_sweep_job(tokens, config.token_sweep_interval_secs));

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutting down...");
}
