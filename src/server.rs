//! HTTP entry point.
//!
//! One fallback handler receives every request. Routing image extensions
//! into it is left to whatever sits in front (a reverse proxy rule, or
//! pointing the server at an images-only document root).
//!
//! The resize service is synchronous and does disk and codec work, so each
//! request runs it on tokio's blocking pool.

use crate::breakpoints::parse_viewport_cookie;
use crate::config::ServerConfig;
use crate::imaging::{ImageBackend, RustBackend};
use crate::response::{emit, error_response};
use crate::service::{ImageRequest, ResizeService};
use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Response, StatusCode, Uri, header};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Shared handler state.
pub struct AppState<B> {
    pub service: Arc<ResizeService<B>>,
}

impl<B> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
        }
    }
}

/// Router sending every path to [`serve_image`].
pub fn router<B>(service: Arc<ResizeService<B>>) -> Router
where
    B: ImageBackend + 'static,
{
    Router::new()
        .fallback(serve_image::<B>)
        .with_state(AppState { service })
}

/// Handle one image request.
pub async fn serve_image<B>(
    State(state): State<AppState<B>>,
    uri: Uri,
    headers: HeaderMap,
) -> Response<Body>
where
    B: ImageBackend + 'static,
{
    let config = state.service.config();
    let request = ImageRequest {
        path: uri.path().to_string(),
        viewport_hint: viewport_hint(&headers, &config.viewport_cookie),
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    };
    let max_age = config.browser_cache_seconds;
    debug!(path = %request.path, hint = ?request.viewport_hint, "request");

    let service = Arc::clone(&state.service);
    let outcome = tokio::task::spawn_blocking(move || service.handle(&request)).await;

    match outcome {
        Ok(Ok(delivery)) => {
            debug!(
                path = %delivery.path.display(),
                disposition = ?delivery.disposition,
                "delivering"
            );
            emit(&delivery, max_age).await
        }
        Ok(Err(err)) => error_response(&err),
        Err(join_err) => {
            error!(error = %join_err, "resize task aborted");
            let mut response = Response::new(Body::from("internal error\n"));
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response
        }
    }
}

/// Viewport hint from the named cookie, if the client sent one.
pub fn viewport_hint(headers: &HeaderMap, cookie_name: &str) -> Option<i64> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| {
            let value = urlencoding::decode(value)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| value.to_string());
            parse_viewport_cookie(&value)
        })
}

/// Bind the configured address and serve until interrupted.
pub async fn serve(config: Arc<ServerConfig>) -> std::io::Result<()> {
    let listen = config.server.listen.clone();
    let service = Arc::new(ResizeService::new(Arc::clone(&config), RustBackend::new()));
    let listener = tokio::net::TcpListener::bind(&listen).await?;

    info!(
        listen = %listener.local_addr()?,
        document_root = %config.document_root.display(),
        cache = %config.cache_root().display(),
        breakpoints = ?config.breakpoints.widths(),
        "serving adaptive images"
    );

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::MockBackend;
    use crate::test_helpers::DocumentRoot;
    use axum::http::HeaderValue;

    fn cookies(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static(value));
        headers
    }

    // =========================================================================
    // Cookie extraction
    // =========================================================================

    #[test]
    fn hint_from_named_cookie() {
        let headers = cookies("theme=dark; resolution=1024; session=abc");
        assert_eq!(viewport_hint(&headers, "resolution"), Some(1024));
    }

    #[test]
    fn hint_with_encoded_density() {
        let headers = cookies("resolution=375%2C2");
        assert_eq!(viewport_hint(&headers, "resolution"), Some(750));
    }

    #[test]
    fn missing_cookie_is_no_hint() {
        assert_eq!(viewport_hint(&cookies("theme=dark"), "resolution"), None);
        assert_eq!(viewport_hint(&HeaderMap::new(), "resolution"), None);
    }

    #[test]
    fn garbage_cookie_is_zero_hint() {
        assert_eq!(
            viewport_hint(&cookies("resolution=wide"), "resolution"),
            Some(0)
        );
    }

    #[test]
    fn cookie_name_must_match_exactly() {
        let headers = cookies("xresolution=300; resolution=800");
        assert_eq!(viewport_hint(&headers, "resolution"), Some(800));
    }

    // =========================================================================
    // Handler
    // =========================================================================

    #[tokio::test]
    async fn handler_maps_missing_source_to_404() {
        let root = DocumentRoot::new();
        let state = AppState {
            service: Arc::new(ResizeService::new(root.config(), MockBackend::new())),
        };

        let response = serve_image(
            State(state),
            Uri::from_static("/missing.jpg"),
            HeaderMap::new(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn handler_renders_with_cookie_hint() {
        let root = DocumentRoot::new();
        let source = root.write("a.jpg", b"src");
        let backend = MockBackend::new().with_source(source, 2000, 1000);
        let state = AppState {
            service: Arc::new(ResizeService::new(root.config(), backend)),
        };

        let response = serve_image(
            State(state.clone()),
            Uri::from_static("/a.jpg"),
            cookies("resolution=500"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"rendition:480:85");
        assert_eq!(
            root.cached_files(),
            vec![std::path::PathBuf::from("480/a.jpg")]
        );
    }
}
