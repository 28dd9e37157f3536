//! SignInjector API Server
//!
//! Burns drawn signatures into stored PDF documents. Provides REST endpoints for:
//! - PDF upload
//! - Signature burning with an audit trail
//! - Audit lookup per document
//! - Static retrieval of originals and signed outputs

use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use clap::Parser;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod audit;
mod config;
mod error;
mod handlers;
mod state;
mod storage;

use config::Config;
use state::AppState;
use storage::PUBLIC_PREFIX;

fn cors_layer(origin: &str) -> Result<CorsLayer> {
    let allow_origin = if origin == "*" {
        AllowOrigin::any()
    } else {
        AllowOrigin::exact(HeaderValue::from_str(origin)?)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any))
}

/// Build the application router around `state`
pub fn build_router(state: Arc<AppState>, body_limit_bytes: usize) -> Router {
    let uploads = ServeDir::new(state.storage.root());

    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // Documents
        .route("/upload-pdf", post(handlers::upload_pdf))
        .route("/sign-pdf", post(handlers::sign_pdf))
        .route("/audits/:document_id", get(handlers::list_audits))
        // Originals and signed outputs
        .nest_service(PUBLIC_PREFIX, uploads)
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::parse();

    let log_level = if config.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::registry()
        .with(
            EnvFilter::from_default_env()
                .add_directive(format!("signinjector_api={}", log_level).parse()?)
                .add_directive("signinjector_core=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Initializing SignInjector API...");
    let state = Arc::new(AppState::new(&config).await?);
    info!("Storing documents in {}", state.storage.root().display());

    if !config.no_sample && state.storage.ensure_sample().await? {
        info!("Wrote sample document {}", storage::SAMPLE_DOCUMENT_ID);
    }

    let app = build_router(state, config.body_limit_bytes).layer(cors_layer(&config.cors_origin)?);

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Starting SignInjector API on http://{}", addr);
    info!(
        "Limits: {} byte PDFs, {} byte request bodies",
        config.max_pdf_bytes, config.body_limit_bytes
    );

    axum::serve(listener, app).await?;

    Ok(())
}
