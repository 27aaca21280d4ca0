//! The axum adapter: converts `axum` requests/responses to and from
//! [`crate::canonical`] shapes and mounts [`InngestHandler`] behind a
//! single route. Grounded on `abp-daemon::{build_app, middleware}`'s
//! request-id/logging middleware and `tower_http::cors` usage.

use crate::canonical::{CanonicalRequest, CanonicalResponse, Method as InngestMethod};
use crate::handler::InngestHandler;
use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::{HeaderName, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use uuid::Uuid;

/// Maximum body size accepted from the orchestrator, matching the
/// platform's own request-size ceiling rather than an arbitrary guess.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Mount `handler` at `path`, handling `GET`/`PUT`/`POST` the way
/// `abp_daemon::build_app` mounts its routes: request-id tagging,
/// structured request logging, and a permissive CORS layer (the
/// orchestrator calls from a fixed, trusted origin set rather than a
/// browser, so this mirrors the source SDK's default of allowing any
/// origin and relying on signature verification for authentication).
pub fn build_router(handler: Arc<InngestHandler>, path: &str) -> Router {
    Router::new()
        .route(
            path,
            get(dispatch).put(dispatch).post(dispatch),
        )
        .with_state(handler)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(middleware::from_fn(request_logger))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::PUT, Method::POST])
                .allow_headers(Any),
        )
}

async fn dispatch(State(handler): State<Arc<InngestHandler>>, req: Request) -> Response {
    let method = match *req.method() {
        Method::GET => InngestMethod::Get,
        Method::PUT => InngestMethod::Put,
        Method::POST => InngestMethod::Post,
        _ => return StatusCode::METHOD_NOT_ALLOWED.into_response(),
    };

    let mut query = Vec::new();
    if let Some(raw) = req.uri().query() {
        for pair in raw.split('&') {
            let mut kv = pair.splitn(2, '=');
            if let (Some(k), Some(v)) = (kv.next(), kv.next()) {
                query.push((
                    urlencoding_decode(k),
                    urlencoding_decode(v),
                ));
            }
        }
    }

    let headers = req
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect::<Vec<_>>();

    let body_bytes = match to_bytes(req.into_body(), MAX_BODY_BYTES).await {
        Ok(bytes) => bytes.to_vec(),
        Err(_) => return StatusCode::PAYLOAD_TOO_LARGE.into_response(),
    };

    let canonical = CanonicalRequest::new(method, headers, query, body_bytes);
    let response = handler.handle(&canonical).await;
    canonical_to_axum(response)
}

fn canonical_to_axum(response: CanonicalResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut builder = Response::builder().status(status);
    for (name, value) in &response.headers {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name.as_str()),
            HeaderValue::from_str(value),
        ) {
            builder = builder.header(name, value);
        }
    }
    builder
        .body(Body::from(response.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn urlencoding_decode(s: &str) -> String {
    percent_decode(s.as_bytes())
}

fn percent_decode(bytes: &[u8]) -> String {
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    out.push(byte);
                    i += 3;
                    continue;
                }
                out.push(bytes[i]);
                i += 1;
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Tags each request with a `uuid` request id, surfaced on
/// `x-request-id`, the way `abp_daemon::middleware::request_id_middleware`
/// does.
async fn request_id_middleware(req: Request, next: Next) -> Response {
    let id = Uuid::new_v4();
    let mut resp = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
        resp.headers_mut().insert("x-request-id", value);
    }
    resp
}

/// Structured request/response logging, matching
/// `abp_daemon::middleware::RequestLogger`, plus the `Server-Timing`
/// header spec.md §4.5 requires on every response.
async fn request_logger(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let start = Instant::now();

    let mut resp = next.run(req).await;
    let duration_ms = start.elapsed().as_millis() as u64;

    if let Ok(value) = HeaderValue::from_str(&format!("handler;dur={duration_ms}")) {
        resp.headers_mut().insert("server-timing", value);
    }

    info!(
        http.method = %method,
        http.path = %path,
        http.status = resp.status().as_u16(),
        http.duration_ms = duration_ms,
        "inngest request handled"
    );

    resp
}
