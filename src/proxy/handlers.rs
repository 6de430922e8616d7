//! HTTP handlers for the chat endpoint

use crate::errors::ProxyError;
use crate::proxy::AppState;
use axum::{
    body::Body,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use futures_util::TryStreamExt;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct UserInput {
    pub message: String,
}

/// POST /chat: stream the model's reply as plain text
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(input): Json<UserInput>,
) -> Result<Response, ProxyError> {
    tracing::debug!(chars = input.message.len(), "chat request");

    let tokens = state
        .backend
        .stream_reply(input.message)
        .await?
        .inspect_err(|e| tracing::error!(error = %e, "reply stream aborted"));

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(tokens),
    )
        .into_response())
}
