//! Memoized model provider
//!
//! The classifier is fetched and loaded at most once per process. Concurrent
//! first callers wait on the same initialization; a failed attempt leaves the
//! cell empty so the next caller retries.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use snapclass_common::config::ModelConfig;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{error, info};

use crate::classifier::{load_vocabulary, ClassifierError, ImageClassifier, OnnxClassifier};
use crate::fetch::{FetchError, ModelFetcher};

/// Loaded classifier, shared read-only across requests
pub type SharedClassifier = Arc<dyn ImageClassifier>;

type LoadFuture = Pin<Box<dyn Future<Output = Result<SharedClassifier, ModelLoadError>> + Send>>;
type Loader = dyn Fn() -> LoadFuture + Send + Sync;

#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("{0}")]
    Fetch(#[from] FetchError),

    #[error("{0}")]
    Classifier(#[from] ClassifierError),

    #[error("model loader task failed: {0}")]
    Join(String),
}

#[derive(Clone)]
pub struct ModelProvider {
    cell: Arc<OnceCell<SharedClassifier>>,
    loader: Arc<Loader>,
}

impl ModelProvider {
    pub fn new<F, Fut>(loader: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<SharedClassifier, ModelLoadError>> + Send + 'static,
    {
        Self {
            cell: Arc::new(OnceCell::new()),
            loader: Arc::new(move || Box::pin(loader()) as LoadFuture),
        }
    }

    /// Provider that is loaded from the start
    pub fn ready(classifier: SharedClassifier) -> Self {
        let provider = Self::new(|| async {
            Err(ModelLoadError::Join("preloaded provider has no loader".to_string()))
        });
        // A fresh cell cannot already be set
        let _ = provider.cell.set(classifier);
        provider
    }

    /// Fetch the artifact if needed and load it with tract
    pub fn onnx(
        fetcher: ModelFetcher,
        source_url: Option<String>,
        model_path: PathBuf,
        labels_path: PathBuf,
        config: ModelConfig,
    ) -> Self {
        Self::new(move || {
            let fetcher = fetcher.clone();
            let source_url = source_url.clone();
            let model_path = model_path.clone();
            let labels_path = labels_path.clone();
            let config = config.clone();
            async move {
                let local = fetcher.ensure_local(source_url.as_deref(), &model_path).await?;

                let classifier = tokio::task::spawn_blocking(move || {
                    let vocab = load_vocabulary(&labels_path)?;
                    info!("Vocabulary: {} labels from {}", vocab.len(), labels_path.display());
                    OnnxClassifier::load(&local, vocab, &config)
                })
                .await
                .map_err(|e| ModelLoadError::Join(e.to_string()))??;

                Ok(Arc::new(classifier) as SharedClassifier)
            }
        })
    }

    pub async fn get(&self) -> Result<SharedClassifier, ModelLoadError> {
        self.cell
            .get_or_try_init(|| (self.loader)())
            .await
            .map(Arc::clone)
            .inspect_err(|e| error!("Model load failed: {}", e))
    }

    pub fn loaded(&self) -> bool {
        self.cell.initialized()
    }

    /// Vocabulary of the loaded model, if loaded
    pub fn vocab(&self) -> Option<Vec<String>> {
        self.cell.get().map(|c| c.vocab().to_vec())
    }
}
