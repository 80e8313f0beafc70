//! One classification interaction: decode → predict → preview

use axum::body::Bytes;
use snapclass_common::Prediction;
use tracing::{debug, warn};

use crate::decoder::encode_preview;
use crate::error::{ApiError, ApiResult};
use crate::session::StoredImage;
use crate::AppState;

pub struct Classified {
    pub prediction: Prediction,
    /// Vocabulary of the classifier that produced `prediction`
    pub vocab: Vec<String>,
    pub preview: StoredImage,
}

/// Run the full pipeline for one uploaded image
///
/// Failures are recorded in `last_error` for `/health` and returned as-is.
pub async fn classify_bytes(state: &AppState, bytes: Bytes) -> ApiResult<Classified> {
    let result = run_pipeline(state, bytes).await;
    if let Err(e) = &result {
        warn!("Classification failed: {}", e);
        *state.last_error.write().await = Some(e.to_string());
    }
    result
}

/// Decoding comes first: a corrupt upload is reported as such even while
/// the model is unavailable.
async fn run_pipeline(state: &AppState, bytes: Bytes) -> ApiResult<Classified> {
    let decoder = state.decoder.clone();
    debug!("Classifying {} byte upload", bytes.len());

    let image = tokio::task::spawn_blocking(move || decoder.decode(&bytes))
        .await
        .map_err(|e| ApiError::Internal(format!("Decode task failed: {}", e)))??;

    let classifier = state.model.get().await?;

    tokio::task::spawn_blocking(move || {
        let prediction = classifier.predict(&image)?;
        let preview = encode_preview(&image)?;
        Ok::<_, ApiError>(Classified {
            prediction,
            vocab: classifier.vocab().to_vec(),
            preview: StoredImage::from_png(preview),
        })
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Classification task failed: {}", e)))?
}
