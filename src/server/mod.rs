//! HTTP transport
//!
//! A single endpoint at `/`: POST bodies go to the device loop, OPTIONS
//! answers CORS preflight, anything else gets 405. Every response carries the
//! permissive CORS header set. JSON replies are zlib-compressed when enabled
//! and the client sends `Accept-Encoding: deflate`.

use std::io::Write;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{
    ACCEPT_ENCODING, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, CONTENT_ENCODING, CONTENT_TYPE, VARY,
};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::device::DeviceHandle;
use crate::mcp::protocol::{HttpReply, CONTENT_TYPE_JSON};

#[derive(Clone)]
struct HttpState {
    device: DeviceHandle,
    deflate: bool,
}

/// Build the axum router.
pub fn router(device: DeviceHandle, deflate: bool) -> axum::Router {
    axum::Router::new()
        .route("/", any(handle_root))
        .with_state(HttpState { device, deflate })
}

/// Serve `app` on `listener` until `shutdown` is cancelled.
///
/// # Errors
///
/// Returns an error if the server fails while accepting connections.
pub async fn serve(
    listener: TcpListener,
    app: axum::Router,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

async fn handle_root(
    State(state): State<HttpState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let reply = if method == Method::OPTIONS {
        HttpReply::preflight()
    } else if method != Method::POST {
        tracing::debug!(%method, "Rejecting non-POST request");
        HttpReply::method_not_allowed()
    } else {
        match state.device.submit(body).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(error = %e, "Device loop unavailable");
                HttpReply::unavailable()
            }
        }
    };

    let compress = state.deflate && accepts_encoding(&headers, "deflate");
    into_response(reply, compress)
}

/// Whether the `Accept-Encoding` header lists `encoding` with a non-zero
/// quality. `q=0` is a refusal.
pub fn accepts_encoding(headers: &HeaderMap, encoding: &str) -> bool {
    headers
        .get_all(ACCEPT_ENCODING)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|item| {
            let mut parts = item.split(';');
            let name = parts.next().unwrap_or("").trim();
            name.eq_ignore_ascii_case(encoding) && quality(parts) > 0.0
        })
}

/// The `q` parameter of one coding; 1 when absent or unparsable.
fn quality<'a>(params: impl Iterator<Item = &'a str>) -> f32 {
    params
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("q"))
        .and_then(|(_, value)| value.trim().parse::<f32>().ok())
        .unwrap_or(1.0)
}

/// zlib-compress a body.
///
/// # Errors
///
/// Returns an error if the encoder fails.
pub fn deflate(body: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(body.len() / 2), Compression::default());
    encoder.write_all(body)?;
    encoder.finish()
}

fn into_response(reply: HttpReply, compress: bool) -> Response {
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut headers = HeaderMap::new();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
    headers.insert(VARY, HeaderValue::from_static("Accept-Encoding"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(reply.content_type));

    let mut body = reply.body.into_bytes();
    if compress && reply.content_type == CONTENT_TYPE_JSON {
        match deflate(&body) {
            Ok(compressed) => {
                headers.insert(CONTENT_ENCODING, HeaderValue::from_static("deflate"));
                body = compressed;
            }
            Err(e) => tracing::warn!(error = %e, "Compression failed; sending plain body"),
        }
    }

    (status, headers, body).into_response()
}
