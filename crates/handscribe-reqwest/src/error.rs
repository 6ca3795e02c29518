//! Mapping of `reqwest` failures onto handscribe error kinds, with cancellation.

use handscribe_core::{CancellationToken, Error, Result};
use reqwest::{RequestBuilder, Response, StatusCode};

/// Converts a `reqwest` error into a [`ErrorKind::Transport`] error.
///
/// [`ErrorKind::Transport`]: handscribe_core::ErrorKind::Transport
pub fn map_reqwest_error(err: reqwest::Error, context: &str) -> Error {
    let detail = if err.is_timeout() {
        "timed out"
    } else if err.is_connect() {
        "connection failed"
    } else if err.is_body() || err.is_decode() {
        "failed to read body"
    } else {
        "request failed"
    };

    let mut error = Error::transport().with_message(format!("{context}: {detail}"));
    if let Some(status) = err.status() {
        error = error.with_status(status.as_u16());
    }
    error.with_source(err)
}

/// Sends `request`, aborting with [`ErrorKind::Cancelled`] when `cancel` fires.
///
/// [`ErrorKind::Cancelled`]: handscribe_core::ErrorKind::Cancelled
pub async fn send(
    request: RequestBuilder,
    context: &str,
    cancel: &CancellationToken,
) -> Result<Response> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::cancelled()),
        result = request.send() => result.map_err(|e| map_reqwest_error(e, context)),
    }
}

/// Reads the full response body, aborting when `cancel` fires.
pub async fn read_body(
    response: Response,
    context: &str,
    cancel: &CancellationToken,
) -> Result<(StatusCode, Vec<u8>)> {
    let status = response.status();
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::cancelled()),
        result = response.bytes() => result
            .map(|body| (status, body.to_vec()))
            .map_err(|e| map_reqwest_error(e, context)),
    }
}
