//! Request deadline enforcement.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::error::AppError;
use super::state::AppState;

/// Drops the handler future once the deadline passes.
///
/// Dropping the future abandons any in-flight query; the server-side
/// `statement_timeout` set on pool connections cancels it in Postgres too.
pub async fn enforce_deadline(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    match tokio::time::timeout(state.request_timeout, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!(%method, %path, timeout = ?state.request_timeout, "Request deadline exceeded");
            AppError::Timeout.into_response()
        }
    }
}
