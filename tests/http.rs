//! End-to-end tests through the HTTP handler with the real image backend.
//!
//! Sources are synthetic images written into a temporary document root;
//! responses are checked for headers, body bytes and what landed in the
//! rendition cache.

use adaptive_images::config::ServerConfig;
use adaptive_images::imaging::RustBackend;
use adaptive_images::server::{AppState, serve_image};
use adaptive_images::service::ResizeService;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, Response, StatusCode, Uri, header};
use image::{GenericImageView, RgbImage, RgbaImage};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const PHONE_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) Mobile/15E148";

fn write_jpeg(path: &Path, width: u32, height: u32) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 90])
    });
    img.save_with_format(path, image::ImageFormat::Jpeg).unwrap();
}

fn write_png(path: &Path, width: u32, height: u32) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let img = RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x % 256) as u8, (y % 256) as u8, 30, 255])
    });
    img.save_with_format(path, image::ImageFormat::Png).unwrap();
}

fn state(root: &Path) -> AppState<RustBackend> {
    let config = Arc::new(ServerConfig {
        document_root: root.to_path_buf(),
        ..ServerConfig::default()
    });
    AppState {
        service: Arc::new(ResizeService::new(config, RustBackend::new())),
    }
}

fn headers(cookie: Option<&'static str>, user_agent: Option<&'static str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Some(cookie) = cookie {
        headers.insert(header::COOKIE, HeaderValue::from_static(cookie));
    }
    if let Some(ua) = user_agent {
        headers.insert(header::USER_AGENT, HeaderValue::from_static(ua));
    }
    headers
}

async fn get(state: &AppState<RustBackend>, path: &str, headers: HeaderMap) -> Response<Body> {
    let uri: Uri = path.parse().unwrap();
    serve_image(State(state.clone()), uri, headers).await
}

async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

#[tokio::test]
async fn wide_jpeg_is_resized_to_breakpoint_and_cached() {
    let tmp = TempDir::new().unwrap();
    write_jpeg(&tmp.path().join("photos/wide.jpg"), 1600, 800);
    let state = state(tmp.path());

    let response = get(&state, "/photos/wide.jpg", headers(Some("resolution=900"), None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let h = response.headers().clone();
    assert_eq!(h[header::CONTENT_TYPE], "image/jpeg");
    assert_eq!(h[header::CACHE_CONTROL], "private, max-age=604800");
    assert!(h[header::EXPIRES].to_str().unwrap().ends_with(" GMT"));
    let body = body_bytes(response).await;
    assert_eq!(h[header::CONTENT_LENGTH], body.len().to_string().as_str());

    let rendition = tmp.path().join("cache/768/photos/wide.jpg");
    assert_eq!(std::fs::read(&rendition).unwrap(), body);
    let decoded = image::load_from_memory(&body).unwrap();
    assert_eq!(decoded.dimensions(), (768, 384));
}

#[tokio::test]
async fn repeat_request_serves_identical_rendition() {
    let tmp = TempDir::new().unwrap();
    write_jpeg(&tmp.path().join("a.jpg"), 1300, 900);
    let state = state(tmp.path());

    let first =
        body_bytes(get(&state, "/a.jpg", headers(Some("resolution=1000"), None)).await).await;
    let modified = std::fs::metadata(tmp.path().join("cache/992/a.jpg"))
        .unwrap()
        .modified()
        .unwrap();
    let second =
        body_bytes(get(&state, "/a.jpg", headers(Some("resolution=1000"), None)).await).await;

    assert_eq!(first, second);
    let modified_after = std::fs::metadata(tmp.path().join("cache/992/a.jpg"))
        .unwrap()
        .modified()
        .unwrap();
    assert_eq!(modified, modified_after);
}

#[tokio::test]
async fn phone_without_cookie_gets_smallest_breakpoint() {
    let tmp = TempDir::new().unwrap();
    write_jpeg(&tmp.path().join("a.jpg"), 1000, 500);
    let state = state(tmp.path());

    let response = get(&state, "/a.jpg", headers(None, Some(PHONE_UA))).await;

    assert_eq!(response.status(), StatusCode::OK);
    let decoded = image::load_from_memory(&body_bytes(response).await).unwrap();
    assert_eq!(decoded.width(), 320);
    assert!(tmp.path().join("cache/320/a.jpg").is_file());
}

#[tokio::test]
async fn narrow_source_is_served_unmodified() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("icon.png");
    write_png(&source, 300, 200);
    let state = state(tmp.path());

    let response = get(&state, "/icon.png", HeaderMap::new()).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(body_bytes(response).await, std::fs::read(&source).unwrap());
    assert!(!tmp.path().join("cache").exists());
}

#[tokio::test]
async fn png_renditions_stay_png() {
    let tmp = TempDir::new().unwrap();
    write_png(&tmp.path().join("g/square.png"), 1000, 1000);
    let state = state(tmp.path());

    let response = get(&state, "/g/square.png", headers(Some("resolution=240,2"), None)).await;

    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    let body = body_bytes(response).await;
    let format = image::guess_format(&body).unwrap();
    assert_eq!(format, image::ImageFormat::Png);
    assert_eq!(
        image::load_from_memory(&body).unwrap().dimensions(),
        (480, 480)
    );
}

#[tokio::test]
async fn missing_image_is_404_with_plain_text_body() {
    let tmp = TempDir::new().unwrap();
    let state = state(tmp.path());

    let response = get(&state, "/nope.jpg", HeaderMap::new()).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/plain; charset=utf-8"
    );
    let body = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(body.starts_with("not found: "), "{body}");
    assert!(body.contains("nope.jpg"), "{body}");
}

#[tokio::test]
async fn traversal_is_403() {
    let tmp = TempDir::new().unwrap();
    let state = state(tmp.path());

    let response = get(&state, "/%2e%2e/etc/passwd.jpg", HeaderMap::new()).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn corrupt_jpeg_is_403_and_not_cached() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("broken.jpg"), b"definitely not a jpeg").unwrap();
    let state = state(tmp.path());

    let response = get(&state, "/broken.jpg", headers(Some("resolution=800"), None)).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(!tmp.path().join("cache/768/broken.jpg").exists());
}
