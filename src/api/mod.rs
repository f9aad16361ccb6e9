//! HTTP adapter for an [`AuthSource`].
//!
//! Routes:
//! - `GET /health`: build info and whether the store answers.
//! - `POST /login`: `{"username", "password"}` in, attributes out.
//! - `GET /openapi.json`: the generated document.

use crate::verifier::AuthSource;
use anyhow::Result;
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};

pub mod handlers;
mod openapi;

pub use openapi::{openapi, ApiDoc};

const REQUEST_ID: &str = "x-request-id";

/// Build the router with every route and layer wired to `source`.
#[must_use]
pub fn router(source: Arc<dyn AuthSource>) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID);

    Router::new()
        .route("/health", get(handlers::health).head(handlers::health))
        .route("/login", post(handlers::login))
        .route("/openapi.json", get(handlers::openapi_json))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http().make_span_with(make_span))
        .layer(SetRequestIdLayer::new(request_id, MakeUlid))
        .layer(Extension(source))
}

/// Serve `source` on every interface until Ctrl-C.
///
/// # Errors
/// Returns an error if the port cannot be bound or the server fails.
pub async fn serve(port: u16, source: Arc<dyn AuthSource>) -> Result<()> {
    let app = router(source);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {e}");
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

#[derive(Clone, Copy)]
struct MakeUlid;

impl tower_http::request_id::MakeRequestId for MakeUlid {
    fn make_request_id<B>(
        &mut self,
        _request: &Request<B>,
    ) -> Option<tower_http::request_id::RequestId> {
        HeaderValue::from_str(&ulid::Ulid::new().to_string())
            .ok()
            .map(tower_http::request_id::RequestId::new)
    }
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
