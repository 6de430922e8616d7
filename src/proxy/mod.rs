//! Chat proxy endpoint
//!
//! One route, `POST /chat`, with CORS fully open for local front-ends.

use crate::cli::config::Config;
use crate::errors::{ProxyError, Result};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use std::sync::Arc;
use tokio::signal;
use tower_http::cors::CorsLayer;

pub mod backend;
pub mod handlers;
pub mod state;

pub use backend::{ChatBackend, OllamaChat};
pub use state::AppState;

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(handlers::chat))
        .layer(CorsLayer::very_permissive())
        .with_state(Arc::new(state))
}

/// Bind the configured address and serve until ctrl-c
pub async fn serve(config: &Config, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    tracing::info!("chat proxy listening on {}", listener.local_addr()?);

    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("chat proxy shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("received shutdown signal");
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = if self.is_upstream() {
            StatusCode::BAD_GATEWAY
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        tracing::error!(error = %self, %status, "chat request failed");
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::backend::ChatBackend;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request};
    use futures_util::stream::{self, BoxStream, StreamExt};
    use tower::ServiceExt;

    struct ScriptedBackend {
        tokens: Vec<&'static str>,
        fail: bool,
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn stream_reply(&self, message: String) -> Result<BoxStream<'static, Result<String>>> {
            if self.fail {
                return Err(ProxyError::OllamaApiError(format!(
                    "HTTP 404 Not Found: model not found ({})",
                    message
                )));
            }
            let tokens: Vec<Result<String>> =
                self.tokens.iter().map(|t| Ok(t.to_string())).collect();
            Ok(stream::iter(tokens).boxed())
        }
    }

    fn app(tokens: Vec<&'static str>, fail: bool) -> Router {
        create_app(AppState::new(Arc::new(ScriptedBackend { tokens, fail })))
    }

    fn chat_request(body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_chat_streams_plain_text() {
        let response = app(vec!["Hel", "lo", " world"], false)
            .oneshot(chat_request(r#"{"message":"hi"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Hello world");
    }

    #[tokio::test]
    async fn test_chat_upstream_failure_is_bad_gateway() {
        let response = app(vec![], true)
            .oneshot(chat_request(r#"{"message":"hi"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&body).contains("model not found"));
    }

    #[tokio::test]
    async fn test_chat_rejects_missing_message() {
        let response = app(vec![], false)
            .oneshot(chat_request(r#"{"text":"hi"}"#))
            .await
            .unwrap();

        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_cors_preflight_is_open() {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/chat")
            .header(header::ORIGIN, "http://localhost:5173")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap();

        let response = app(vec![], false).oneshot(request).await.unwrap();

        assert!(response.status().is_success());
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:5173"
        );
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS],
            "true"
        );
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let request = Request::builder()
            .uri("/nope")
            .body(Body::empty())
            .unwrap();
        let response = app(vec![], false).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_local_errors_are_internal() {
        let response = ProxyError::ConfigError("bad".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
