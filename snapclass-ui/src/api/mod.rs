//! HTTP handlers for snapclass-ui
//!
//! - `ui`: HTML page, classify form target, stylesheet
//! - `predict`: JSON prediction, vocabulary and content lookups
//! - `health`: liveness and model status

pub mod health;
pub mod predict;
pub mod ui;

pub use health::health_routes;
pub use predict::predict_routes;
pub use ui::ui_routes;
