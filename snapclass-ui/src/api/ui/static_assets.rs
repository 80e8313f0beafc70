//! Embedded static assets

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

const SNAPCLASS_CSS: &str = include_str!("../../../static/snapclass.css");

/// GET /static/snapclass.css
pub async fn serve_snapclass_css() -> Response {
    (
        StatusCode::OK,
        [
            ("content-type", "text/css"),
            ("cache-control", "public, max-age=3600"),
        ],
        SNAPCLASS_CSS,
    )
        .into_response()
}
