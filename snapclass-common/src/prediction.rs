//! Prediction result produced by a classifier

use crate::{Error, Result};
use serde::Serialize;

/// Outcome of one forward pass over one image
///
/// `probabilities[i]` belongs to `vocab[i]` of the classifier that produced it;
/// `label` is always `vocab[index]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub label: String,
    pub index: usize,
    pub probabilities: Vec<f32>,
}

impl Prediction {
    /// Build a prediction from a per-class probability vector
    ///
    /// Picks the maximal probability; ties resolve to the lowest class index.
    /// Fails on length mismatch, empty input or non-finite values.
    pub fn from_probabilities(vocab: &[String], probabilities: Vec<f32>) -> Result<Self> {
        if vocab.is_empty() {
            return Err(Error::InvalidInput("Vocabulary is empty".to_string()));
        }
        if probabilities.len() != vocab.len() {
            return Err(Error::InvalidInput(format!(
                "Expected {} class probabilities, got {}",
                vocab.len(),
                probabilities.len()
            )));
        }
        if let Some(pos) = probabilities.iter().position(|p| !p.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "Probability for class {} is not finite",
                pos
            )));
        }

        let mut index = 0;
        for (i, &p) in probabilities.iter().enumerate().skip(1) {
            if p > probabilities[index] {
                index = i;
            }
        }

        Ok(Self {
            label: vocab[index].clone(),
            index,
            probabilities,
        })
    }

    /// Probability assigned to the predicted class
    pub fn confidence(&self) -> f32 {
        self.probabilities[self.index]
    }
}

/// Numerically stable softmax
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_argmax() {
        let p = Prediction::from_probabilities(&vocab(&["A", "B", "C"]), vec![0.1, 0.8, 0.1])
            .unwrap();
        assert_eq!(p.label, "B");
        assert_eq!(p.index, 1);
        assert!((p.confidence() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_tie_breaks_to_lowest_index() {
        let p = Prediction::from_probabilities(&vocab(&["A", "B", "C"]), vec![0.25, 0.5, 0.5])
            .unwrap();
        assert_eq!(p.index, 1);
        assert_eq!(p.label, "B");
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let result = Prediction::from_probabilities(&vocab(&["A", "B"]), vec![1.0]);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_non_finite_rejected() {
        let result = Prediction::from_probabilities(&vocab(&["A", "B"]), vec![f32::NAN, 0.5]);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_empty_vocab_rejected() {
        let result = Prediction::from_probabilities(&[], vec![]);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[2.0, 1.0, 0.1, 1000.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(probs[3] > 0.99);

        let uniform = softmax(&[3.0, 3.0]);
        assert!((uniform[0] - 0.5).abs() < 1e-6);
    }
}
