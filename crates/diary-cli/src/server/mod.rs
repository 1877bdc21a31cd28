//! Place search proxy
//!
//! `diary serve` exposes `GET /api/search?q=` and forwards it to Naver local
//! search, adding coordinates to every result. Blank queries are answered
//! locally with an empty list; upstream failures become HTTP 500.

pub mod naver;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use diary_core::search::{SearchErrorBody, SearchResponse};
use diary_core::Config;

use naver::{NaverClient, NaverCredentials};

pub struct AppState {
    pub naver: NaverClient,
}

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("upstream search failed")]
    Upstream(#[from] reqwest::Error),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        match &self {
            ProxyError::Upstream(source) => error!(error = %source, "Search API failed"),
        }
        let body = SearchErrorBody {
            error: self.to_string(),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    q: Option<String>,
}

async fn search_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ProxyError> {
    let query = params.q.unwrap_or_default();
    let query = query.trim();
    if query.is_empty() {
        return Ok(Json(SearchResponse::default()));
    }

    let items = state.naver.search(query).await?;
    info!(query, count = items.len(), "Search served");
    Ok(Json(SearchResponse { items }))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/api/search", get(search_handler))
        .layer(cors)
        .with_state(state)
}

/// Run the proxy until Ctrl+C or SIGTERM
pub async fn run(config: &Config, port: Option<u16>) -> Result<()> {
    let naver = NaverClient::new(NaverCredentials::from_env())
        .context("Failed to build HTTP client")?;
    let state = Arc::new(AppState { naver });

    let address = SocketAddr::from(([0, 0, 0, 0], port.unwrap_or(config.port)));
    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Search proxy listening on {address}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Search proxy stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
