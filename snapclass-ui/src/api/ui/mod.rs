//! UI routes: the classifier page and its stylesheet

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

mod page;
mod static_assets;

use page::{classify_submit, root_page};
use static_assets::serve_snapclass_css;

pub fn ui_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root_page))
        .route("/classify", post(classify_submit))
        .route("/static/snapclass.css", get(serve_snapclass_css))
}
