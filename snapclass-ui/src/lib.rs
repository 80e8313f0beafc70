//! snapclass-ui library interface
//!
//! Web front-end around an image classifier: upload or snap a photo, see the
//! predicted label, the per-class probabilities, and curated content for the
//! label. Exposed as a library for integration testing.

pub mod api;
pub mod classifier;
pub mod classify;
pub mod decoder;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod provider;
pub mod render;
pub mod session;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use snapclass_common::config::SessionConfig;
use snapclass_common::ContentRegistry;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use crate::decoder::{ImageDecoder, StandardImageDecoder};
use crate::provider::ModelProvider;
use crate::session::SessionStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Read-only label → content mapping
    pub registry: Arc<ContentRegistry>,
    pub model: ModelProvider,
    pub decoder: Arc<dyn ImageDecoder>,
    pub sessions: SessionStore,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last failure, for diagnostics
    pub last_error: Arc<RwLock<Option<String>>>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        registry: ContentRegistry,
        model: ModelProvider,
        session_config: &SessionConfig,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            model,
            decoder: Arc::new(StandardImageDecoder),
            sessions: SessionStore::new(session_config),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
            max_upload_bytes,
        }
    }

    /// Model vocabulary, or the registry labels while the model is not loaded
    pub fn vocab(&self) -> Vec<String> {
        self.model.vocab().unwrap_or_else(|| {
            self.registry
                .labels()
                .into_iter()
                .map(str::to_string)
                .collect()
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    let max_upload_bytes = state.max_upload_bytes;

    Router::new()
        .merge(api::ui_routes())
        .merge(api::predict_routes())
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
