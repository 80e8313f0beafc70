use super::{ClassifierError, ImageClassifier};
use image::RgbImage;
use snapclass_common::Prediction;

/// Classifier that returns the same probabilities for every image
///
/// Backs `--demo` mode and the HTTP tests.
#[derive(Debug, Clone)]
pub struct StaticClassifier {
    vocab: Vec<String>,
    probabilities: Vec<f32>,
}

impl StaticClassifier {
    pub fn new(vocab: Vec<String>, probabilities: Vec<f32>) -> Result<Self, ClassifierError> {
        // Validates length and finiteness once, up front
        Prediction::from_probabilities(&vocab, probabilities.clone())?;
        Ok(Self {
            vocab,
            probabilities,
        })
    }

    /// Halving weights, normalized: the first label always wins
    pub fn demo(vocab: Vec<String>) -> Result<Self, ClassifierError> {
        let weights: Vec<f32> = (0..vocab.len()).map(|i| 0.5f32.powi(i as i32)).collect();
        let total: f32 = weights.iter().sum();
        let probabilities = weights.into_iter().map(|w| w / total).collect();
        Self::new(vocab, probabilities)
    }
}

impl ImageClassifier for StaticClassifier {
    fn vocab(&self) -> &[String] {
        &self.vocab
    }

    fn predict(&self, _image: &RgbImage) -> Result<Prediction, ClassifierError> {
        Ok(Prediction::from_probabilities(
            &self.vocab,
            self.probabilities.clone(),
        )?)
    }
}
