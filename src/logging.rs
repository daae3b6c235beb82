//! Middleware for logging requests and responses.

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{StatusCode, header::CONTENT_TYPE},
    middleware::Next,
    response::{IntoResponse, Response},
};
use unicode_segmentation::UnicodeSegmentation;

use crate::endpoints;

/// The number of graphemes of a body to log at the `info` level.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// Form fields whose values are never logged.
///
/// Chat messages and their history are free text typed by the user and may
/// hold personal details about leads.
const REDACTED_FORM_FIELDS: [&str; 2] = ["message", "history"];

/// Routes whose response bodies are never logged.
///
/// Chat replies repeat the question and carry the history in hidden inputs.
const REDACTED_RESPONSE_PATHS: [&str; 1] = [endpoints::CHAT_API];

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If the body is longer than [LOG_BODY_LENGTH_LIMIT] graphemes, it is
/// truncated and the full body is logged at the `debug` level.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let body_bytes = match read_body(body).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::error!("could not read request body: {error}");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };
    let body_text = String::from_utf8_lossy(&body_bytes);

    if is_form_post(&parts) {
        log_request(&parts, &redact_form_fields(&body_text));
    } else {
        log_request(&parts, &body_text);
    }

    let path = parts.uri.path().to_owned();
    let request = Request::from_parts(parts, Body::from(body_bytes));
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let body_bytes = match read_body(body).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::error!("could not read response body: {error}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    log_response(&parts, &response_log_body(&path, &body_bytes));

    Response::from_parts(parts, Body::from(body_bytes))
}

async fn read_body(body: Body) -> Result<Bytes, axum::Error> {
    axum::body::to_bytes(body, usize::MAX).await
}

fn is_form_post(parts: &axum::http::request::Parts) -> bool {
    parts.method == axum::http::Method::POST
        && parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"))
}

fn redact_form_fields(form_text: &str) -> String {
    form_text
        .split('&')
        .map(|pair| {
            let key = pair.split_once('=').map_or(pair, |(key, _)| key);

            if REDACTED_FORM_FIELDS.contains(&key) {
                format!("{key}=********")
            } else {
                pair.to_owned()
            }
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// The response body as it should appear in the logs for a request to `path`.
fn response_log_body(path: &str, body: &[u8]) -> String {
    if REDACTED_RESPONSE_PATHS.contains(&path) {
        format!("<{} bytes redacted>", body.len())
    } else {
        String::from_utf8_lossy(body).into_owned()
    }
}

/// The first [LOG_BODY_LENGTH_LIMIT] graphemes of `body`, or `None` if the
/// body is short enough to log in full.
fn truncate_body(body: &str) -> Option<String> {
    let mut graphemes = body.graphemes(true);
    let head: String = graphemes.by_ref().take(LOG_BODY_LENGTH_LIMIT).collect();

    graphemes.next().map(|_| head)
}

fn log_request(headers: &axum::http::request::Parts, body: &str) {
    match truncate_body(body) {
        Some(head) => {
            tracing::info!("Received request: {headers:#?}\nbody: {head}...");
            tracing::debug!("Full request body: {body:?}");
        }
        None => tracing::info!("Received request: {headers:#?}\nbody: {body:?}"),
    }
}

fn log_response(headers: &axum::http::response::Parts, body: &str) {
    match truncate_body(body) {
        Some(head) => {
            tracing::info!("Sending response: {headers:#?}\nbody: {head}...");
            tracing::debug!("Full response body: {body:?}");
        }
        None => tracing::info!("Sending response: {headers:#?}\nbody: {body:?}"),
    }
}
