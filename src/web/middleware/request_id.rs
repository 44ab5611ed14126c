//! Per-request tracing spans with client-correlatable request IDs.
//!
//! The browser client may send an `X-Request-Id`; anything empty or longer
//! than [`MAX_REQUEST_ID_LEN`] is replaced with a fresh ULID. The resolved ID
//! is echoed back, and requests against a user's watch-time record carry that
//! `user_id` on the span so handler logs and the response line correlate.

use axum::extract::Request;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::Response;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};
use tracing::Instrument;

static REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

const MAX_REQUEST_ID_LEN: usize = 128;
const VIDEOS_PREFIX: &str = "/api/v1/videos/";

type BoxFuture<T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send>>;

fn resolve_request_id(headers: &HeaderMap) -> String {
    headers
        .get(&REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
        .map_or_else(|| ulid::Ulid::new().to_string(), str::to_owned)
}

/// The `{user_id}` segment of `/api/v1/videos/{user_id}`, if this is such a path.
fn user_id_from_path(path: &str) -> Option<&str> {
    path.strip_prefix(VIDEOS_PREFIX)
        .filter(|rest| !rest.is_empty() && !rest.contains('/'))
}

fn log_response(method: &Method, path: &str, status: StatusCode, elapsed_ms: u64) {
    let code = status.as_u16();
    if status.is_server_error() {
        tracing::warn!(%method, path, status = code, elapsed_ms, "Request failed on the server");
    } else if status.is_client_error() {
        tracing::info!(%method, path, status = code, elapsed_ms, "Request rejected");
    } else {
        tracing::debug!(%method, path, status = code, elapsed_ms, "Request served");
    }
}

#[derive(Clone)]
pub struct RequestIdLayer;

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService { inner }
    }
}

#[derive(Clone)]
pub struct RequestIdService<S> {
    inner: S,
}

impl<S, B> Service<Request> for RequestIdService<S>
where
    S: Service<Request, Response = Response<B>> + Send + 'static,
    S::Future: Send + 'static,
    S::Error: std::fmt::Debug,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let req_id = resolve_request_id(req.headers());
        let method = req.method().clone();
        let path = req.uri().path().to_owned();

        let span = tracing::info_span!("request", req_id = %req_id, user_id = tracing::field::Empty);
        if let Some(user_id) = user_id_from_path(&path) {
            span.record("user_id", user_id);
        }
        let echoed = HeaderValue::from_str(&req_id).ok();
        let start = Instant::now();
        let future = self.inner.call(req);

        Box::pin(
            async move {
                let mut result = future.await;
                let elapsed_ms = start.elapsed().as_millis() as u64;

                match result.as_mut() {
                    Ok(response) => {
                        log_response(&method, &path, response.status(), elapsed_ms);
                        if let Some(value) = echoed {
                            response.headers_mut().insert(REQUEST_ID.clone(), value);
                        }
                    }
                    Err(e) => {
                        tracing::error!(%method, path = %path, error = ?e, elapsed_ms, "Request errored");
                    }
                }
                result
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_user_id_from_video_paths() {
        assert_eq!(user_id_from_path("/api/v1/videos/u-42"), Some("u-42"));
        assert_eq!(user_id_from_path("/api/v1/videos/"), None);
        assert_eq!(user_id_from_path("/api/v1/videos/u1/extra"), None);
        assert_eq!(user_id_from_path("/api/health-check"), None);
    }

    #[test]
    fn keeps_a_valid_client_id() {
        let mut headers = HeaderMap::new();
        headers.insert(&REQUEST_ID, HeaderValue::from_static("client-7"));
        assert_eq!(resolve_request_id(&headers), "client-7");
    }

    #[test]
    fn replaces_missing_or_oversized_ids() {
        let generated = resolve_request_id(&HeaderMap::new());
        assert!(ulid::Ulid::from_string(&generated).is_ok());

        let mut headers = HeaderMap::new();
        let long = "x".repeat(MAX_REQUEST_ID_LEN + 1);
        headers.insert(&REQUEST_ID, HeaderValue::from_str(&long).unwrap());
        let replaced = resolve_request_id(&headers);
        assert_ne!(replaced, long);
        assert!(ulid::Ulid::from_string(&replaced).is_ok());
    }
}
