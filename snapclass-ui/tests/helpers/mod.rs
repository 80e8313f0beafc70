//! Shared fixtures for snapclass-ui integration tests

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, Response};
use http_body_util::BodyExt;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use snapclass_common::config::SessionConfig;
use snapclass_common::ContentRegistry;
use snapclass_ui::classifier::StaticClassifier;
use snapclass_ui::provider::{ModelLoadError, ModelProvider};
use snapclass_ui::AppState;

pub const BOUNDARY: &str = "snapclass-test-boundary";

const REGISTRY: &str = r#"
[labels."B"]
texts = ["B is the second class", "   "]
images = ["https://example.com/b.jpg"]
videos = ["https://youtu.be/-G478hXpaEk?si=V8RYcoWSRndMPUSF"]
"#;

pub fn vocab() -> Vec<String> {
    vec!["A".to_string(), "B".to_string(), "C".to_string()]
}

/// State with a fixed classifier: B wins with 0.8
pub fn test_app_state() -> AppState {
    let classifier = StaticClassifier::new(vocab(), vec![0.1, 0.8, 0.1]).unwrap();
    let registry = ContentRegistry::from_toml_str(REGISTRY).unwrap();
    AppState::new(
        registry,
        ModelProvider::ready(Arc::new(classifier)),
        &SessionConfig::default(),
        1024 * 1024,
    )
}

/// State whose model can never be loaded
pub fn unavailable_model_state() -> AppState {
    let registry = ContentRegistry::from_toml_str(REGISTRY).unwrap();
    let model = ModelProvider::new(|| async {
        Err(ModelLoadError::Join("model host unreachable".to_string()))
    });
    AppState::new(registry, model, &SessionConfig::default(), 1024 * 1024)
}

pub fn png_fixture() -> Vec<u8> {
    let image = RgbImage::from_pixel(8, 6, Rgb([200, 120, 40]));
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut buffer, ImageFormat::Png)
        .unwrap();
    buffer.into_inner()
}

/// multipart/form-data body with one file field
pub fn multipart_body(field: &str, file_name: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn classify_request(body: Vec<u8>, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/classify")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body)).unwrap()
}

pub fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// `name=value` part of the response's Set-Cookie header
pub fn session_cookie_pair(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .expect("Set-Cookie header")
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string()
}
