//! Prediction adapter: the boundary around the external classifier
//!
//! Core logic only sees [`ImageClassifier`]; concrete backends live in
//! submodules and can be swapped without touching the handlers.

mod fixed;
mod onnx;

pub use fixed::StaticClassifier;
pub use onnx::{image_to_nchw, OnnxClassifier};

use image::RgbImage;
use snapclass_common::Prediction;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Classifier failures, surfaced to the user unchanged
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Vocabulary {0} contains no labels")]
    EmptyVocabulary(PathBuf),

    #[error("Vocabulary contains duplicate label {0:?}")]
    DuplicateLabel(String),

    #[error("Failed to load model {path}: {message}")]
    ModelLoad { path: PathBuf, message: String },

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Model produced {actual} scores but the vocabulary has {expected} labels")]
    OutputMismatch { expected: usize, actual: usize },

    #[error("Model output is not a probability distribution (sum {sum:.4}); enable apply_softmax for logit outputs")]
    NotNormalized { sum: f32 },

    #[error("Invalid model output: {0}")]
    InvalidOutput(#[from] snapclass_common::Error),
}

/// A loaded, read-only image classifier
pub trait ImageClassifier: Send + Sync {
    /// Class labels in class-index order
    fn vocab(&self) -> &[String];

    /// Run one forward pass
    ///
    /// The returned probabilities have one entry per vocabulary label and the
    /// label is the argmax (lowest index on ties).
    fn predict(&self, image: &RgbImage) -> Result<Prediction, ClassifierError>;
}

/// Parse a `labels.txt` vocabulary: one label per line, blank lines skipped
pub fn parse_vocabulary(content: &str, source: &Path) -> Result<Vec<String>, ClassifierError> {
    let labels: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();

    if labels.is_empty() {
        return Err(ClassifierError::EmptyVocabulary(source.to_path_buf()));
    }

    let mut seen = HashSet::new();
    if let Some(dup) = labels.iter().find(|l| !seen.insert(l.as_str())) {
        return Err(ClassifierError::DuplicateLabel(dup.clone()));
    }

    Ok(labels)
}

pub fn load_vocabulary(path: &Path) -> Result<Vec<String>, ClassifierError> {
    let content = std::fs::read_to_string(path).map_err(|source| ClassifierError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_vocabulary(&content, path)
}
