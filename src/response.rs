//! HTTP response assembly.
//!
//! Successful deliveries carry four headers:
//!
//! | Header | Value |
//! |---|---|
//! | `Content-Type` | from the file extension |
//! | `Cache-Control` | `private, max-age=<browser_cache_seconds>` |
//! | `Expires` | now + `browser_cache_seconds`, RFC 1123 GMT |
//! | `Content-Length` | file size in bytes |
//!
//! Failures are a status code with a short `text/plain` body naming the
//! error class and the offending path. 404 for missing sources, 403 for
//! everything else.

use crate::service::{Delivery, ResizeError};
use axum::body::Body;
use axum::http::{HeaderValue, Response, StatusCode, header};
use chrono::{DateTime, Duration, Utc};
use tracing::{error, warn};

/// `Expires` header format. Always GMT.
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Status code for a failed request.
pub fn status_for(err: &ResizeError) -> StatusCode {
    match err {
        ResizeError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::FORBIDDEN,
    }
}

/// Short class name used in error bodies.
pub fn error_class(err: &ResizeError) -> &'static str {
    match err {
        ResizeError::NotFound(_) => "not found",
        ResizeError::Forbidden(_) => "forbidden",
        ResizeError::UnsupportedFormat(_) => "unsupported format",
        ResizeError::Decode { .. } => "decode error",
        ResizeError::Encode { .. } => "encode error",
        ResizeError::Cache(_) => "cache error",
    }
}

/// Header name/value pairs for an image body.
pub fn image_headers(
    content_type: &'static str,
    content_length: u64,
    max_age: u64,
    now: DateTime<Utc>,
) -> Vec<(header::HeaderName, String)> {
    let expires = i64::try_from(max_age)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    vec![
        (header::CONTENT_TYPE, content_type.to_string()),
        (header::CACHE_CONTROL, format!("private, max-age={max_age}")),
        (header::EXPIRES, expires.format(HTTP_DATE_FORMAT).to_string()),
        (header::CONTENT_LENGTH, content_length.to_string()),
    ]
}

/// Stream a delivered file back to the client.
///
/// A file that vanished or became unreadable between the cache decision and
/// this read is reported like any other failure.
pub async fn emit(delivery: &Delivery, max_age: u64) -> Response<Body> {
    let bytes = match tokio::fs::read(&delivery.path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            let err = if e.kind() == std::io::ErrorKind::NotFound {
                ResizeError::NotFound(delivery.path.clone())
            } else {
                ResizeError::Forbidden(delivery.path.clone())
            };
            warn!(path = %delivery.path.display(), error = %e, "cannot read delivery");
            return error_response(&err);
        }
    };

    let headers = image_headers(
        delivery.format.content_type(),
        bytes.len() as u64,
        max_age,
        Utc::now(),
    );
    let mut response = Response::new(Body::from(bytes));
    for (name, value) in headers {
        if let Ok(value) = HeaderValue::from_str(&value) {
            response.headers_mut().insert(name, value);
        }
    }
    response
}

/// Plain-text error response.
pub fn error_response(err: &ResizeError) -> Response<Body> {
    let status = status_for(err);
    let path = match err {
        ResizeError::NotFound(path)
        | ResizeError::Forbidden(path)
        | ResizeError::UnsupportedFormat(path)
        | ResizeError::Decode { path, .. }
        | ResizeError::Encode { path, .. } => path.display().to_string(),
        ResizeError::Cache(cache) => cache.to_string(),
    };
    if status == StatusCode::FORBIDDEN {
        error!(error = %err, "request failed");
    }

    let mut response = Response::new(Body::from(format!("{}: {path}\n", error_class(err))));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
