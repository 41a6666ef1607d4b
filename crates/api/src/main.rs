mod config;
mod error;
mod handlers;
mod middleware;
mod models;
mod queue;
mod repos;
mod services;
mod state;
mod stores;
#[cfg(test)]
mod test_utils;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{Router, http};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    config::Config,
    queue::AmqpPublisher,
    repos::{PgUserRepo, Repos},
    services::{PasswordHasher, TokenService},
    state::AppState,
    stores::{
        KvClient, RedisRateLimiter, RedisResponseCache, RedisRevocationStore, Stores,
    },
};

#[derive(Parser)]
#[command(name = "bankd-api")]
#[command(about = "bankd API server")]
struct Args {
    /// Run database migrations and exit
    #[arg(long)]
    migrate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider before any TLS operations
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let args = Args::parse();
    let config = envy::prefixed("BANKD_").from_env::<Config>()?;

    // Initialize Sentry for error tracking (must be done early, guard must stay alive)
    let _sentry_guard = config.sentry_dsn.as_ref().map(|dsn| {
        sentry::init((
            dsn.as_str(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                environment: Some(config.env.clone().into()),
                ..Default::default()
            },
        ))
    });

    // Set up tracing: JSON in production, human-readable otherwise
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.is_production() {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer())
            .init();
    }

    let database = PgPoolOptions::new()
        .max_connections(25)
        .connect(&config.database_url)
        .await?;

    // Run migrations via init container only (--migrate flag)
    if args.migrate {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&database).await?;
        tracing::info!("Migrations complete");
        return Ok(());
    }

    // Degrades rather than fails: a down Redis leaves rate limiting,
    // revocation, and caching failing open.
    let kv = KvClient::connect(&config.redis_url).await;

    let repos = Repos {
        users: Arc::new(PgUserRepo::new(database.clone())),
    };

    let stores = Stores {
        revocation: Arc::new(RedisRevocationStore::new(kv.clone())),
        rate_limiter: Arc::new(RedisRateLimiter::new(kv.clone())),
        cache: Arc::new(RedisResponseCache::new(kv.clone())),
    };

    let state = AppState {
        tokens: TokenService::new(&config.jwt_secret, config.jwt_expires_hours),
        passwords: PasswordHasher::new(),
        publisher: Arc::new(AmqpPublisher::new(&config.amqp_url)),
        config: config.clone(),
        database,
        kv,
        repos,
        stores,
    };

    // Request ID header name
    let x_request_id = http::HeaderName::from_static("x-request-id");

    let app = Router::new()
        .nest("/health", handlers::health::router())
        .nest("/auth", handlers::auth::router(state.clone()))
        .nest("/users", handlers::users::router())
        .with_state(state)
        // Request ID: generate UUID, include in logs, return in response
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &http::Request<axum::body::Body>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            },
        ))
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
        .layer(RequestBodyLimitLayer::new(1024 * 1024)); // 1MB limit

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!("Listening on {}", addr);

    // ConnectInfo feeds the rate limiter's per-IP keys.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
