use super::{ClassifierError, ImageClassifier};
use image::{imageops, imageops::FilterType, RgbImage};
use snapclass_common::config::{ModelConfig, Normalization};
use snapclass_common::prediction::softmax;
use snapclass_common::Prediction;
use std::path::Path;
use tract_onnx::prelude::*;
use tracing::{debug, info};

const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];
/// Allowed drift of a probability output's sum from 1.0
const SUM_TOLERANCE: f32 = 1e-3;

type Plan = SimplePlan<TypedFact, Box<dyn TypedOp>, TypedModel>;

/// ONNX image classifier running on tract
///
/// Expects a single NCHW f32 input and a `[1, classes]` score output.
pub struct OnnxClassifier {
    plan: Plan,
    vocab: Vec<String>,
    input_width: u32,
    input_height: u32,
    normalization: Normalization,
    apply_softmax: bool,
}

impl OnnxClassifier {
    pub fn load(
        model_path: &Path,
        vocab: Vec<String>,
        config: &ModelConfig,
    ) -> Result<Self, ClassifierError> {
        let width = config.input_width as usize;
        let height = config.input_height as usize;

        let plan = tract_onnx::onnx()
            .model_for_path(model_path)
            .and_then(|model| model.with_input_fact(0, f32::fact([1, 3, height, width]).into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| ClassifierError::ModelLoad {
                path: model_path.to_path_buf(),
                message: format!("{:#}", e),
            })?;

        info!(
            "Loaded ONNX model {} ({} classes, input {}x{})",
            model_path.display(),
            vocab.len(),
            width,
            height
        );

        Ok(Self {
            plan,
            vocab,
            input_width: config.input_width,
            input_height: config.input_height,
            normalization: config.normalization,
            apply_softmax: config.apply_softmax,
        })
    }
}

impl ImageClassifier for OnnxClassifier {
    fn vocab(&self) -> &[String] {
        &self.vocab
    }

    fn predict(&self, image: &RgbImage) -> Result<Prediction, ClassifierError> {
        let input = image_to_nchw(image, self.input_width, self.input_height, self.normalization);

        let outputs = self
            .plan
            .run(tvec!(input.into_tensor().into_tvalue()))
            .map_err(|e| ClassifierError::Inference(format!("{:#}", e)))?;

        let output = outputs
            .first()
            .ok_or_else(|| ClassifierError::Inference("Model produced no outputs".to_string()))?;
        let scores: Vec<f32> = output
            .to_array_view::<f32>()
            .map_err(|e| ClassifierError::Inference(format!("{:#}", e)))?
            .iter()
            .copied()
            .collect();

        if scores.len() != self.vocab.len() {
            return Err(ClassifierError::OutputMismatch {
                expected: self.vocab.len(),
                actual: scores.len(),
            });
        }

        let probabilities = scores_to_probabilities(scores, self.apply_softmax)?;
        let prediction = Prediction::from_probabilities(&self.vocab, probabilities)?;
        debug!(
            "Predicted {:?} (index {}, p={:.4})",
            prediction.label,
            prediction.index,
            prediction.confidence()
        );
        Ok(prediction)
    }
}

/// Softmax raw scores, or check that the model already emits probabilities
fn scores_to_probabilities(
    scores: Vec<f32>,
    apply_softmax: bool,
) -> Result<Vec<f32>, ClassifierError> {
    if apply_softmax {
        return Ok(softmax(&scores));
    }
    let sum: f32 = scores.iter().sum();
    if scores.iter().any(|p| *p < 0.0) || !((sum - 1.0).abs() <= SUM_TOLERANCE) {
        return Err(ClassifierError::NotNormalized { sum });
    }
    Ok(scores)
}

/// Resize to the model input size and lay out as normalized `[1, 3, H, W]`
pub fn image_to_nchw(
    image: &RgbImage,
    width: u32,
    height: u32,
    normalization: Normalization,
) -> tract_ndarray::Array4<f32> {
    let resized;
    let source = if image.dimensions() == (width, height) {
        image
    } else {
        resized = imageops::resize(image, width, height, FilterType::Triangle);
        &resized
    };

    tract_ndarray::Array4::from_shape_fn(
        (1, 3, height as usize, width as usize),
        |(_, c, y, x)| {
            let value = source.get_pixel(x as u32, y as u32)[c] as f32 / 255.0;
            match normalization {
                Normalization::Imagenet => (value - IMAGENET_MEAN[c]) / IMAGENET_STD[c],
                Normalization::Unit => value,
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn solid(width: u32, height: u32, color: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb(color))
    }

    #[test]
    fn test_tensor_shape_after_resize() {
        let tensor = image_to_nchw(&solid(200, 100, [255, 0, 0]), 224, 224, Normalization::Unit);
        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
        assert_eq!(tensor[[0, 0, 112, 112]], 1.0);
        assert_eq!(tensor[[0, 1, 112, 112]], 0.0);
        assert_eq!(tensor[[0, 2, 112, 112]], 0.0);
    }

    #[test]
    fn test_unit_normalization() {
        let tensor = image_to_nchw(&solid(8, 8, [128, 128, 128]), 8, 8, Normalization::Unit);
        let expected = 128.0 / 255.0;
        assert!((tensor[[0, 0, 0, 0]] - expected).abs() < 1e-4);
        assert!((tensor[[0, 2, 7, 7]] - expected).abs() < 1e-4);
    }

    #[test]
    fn test_imagenet_normalization() {
        let tensor = image_to_nchw(&solid(4, 4, [255, 255, 255]), 4, 4, Normalization::Imagenet);
        let expected_red = (1.0 - 0.485) / 0.229;
        let expected_blue = (1.0 - 0.406) / 0.225;
        assert!((tensor[[0, 0, 1, 1]] - expected_red).abs() < 1e-4);
        assert!((tensor[[0, 2, 1, 1]] - expected_blue).abs() < 1e-4);
    }

    #[test]
    fn test_channel_planes_are_separate() {
        let mut image = solid(2, 1, [0, 0, 0]);
        image.put_pixel(1, 0, Rgb([0, 255, 0]));
        let tensor = image_to_nchw(&image, 2, 1, Normalization::Unit);
        assert_eq!(tensor[[0, 1, 0, 0]], 0.0);
        assert_eq!(tensor[[0, 1, 0, 1]], 1.0);
        assert_eq!(tensor[[0, 0, 0, 1]], 0.0);
    }

    #[test]
    fn test_probability_outputs_pass_through() {
        let probabilities = scores_to_probabilities(vec![0.2, 0.7, 0.1], false).unwrap();
        assert_eq!(probabilities, vec![0.2, 0.7, 0.1]);
    }

    #[test]
    fn test_logit_outputs_rejected_without_softmax() {
        let result = scores_to_probabilities(vec![2.5, -1.0, 0.3], false);
        assert!(matches!(result, Err(ClassifierError::NotNormalized { .. })));

        let result = scores_to_probabilities(vec![0.9, 0.9, 0.9], false);
        assert!(matches!(result, Err(ClassifierError::NotNormalized { sum }) if (sum - 2.7).abs() < 1e-4));
    }

    #[test]
    fn test_softmax_applied_to_logits() {
        let probabilities = scores_to_probabilities(vec![2.5, -1.0, 0.3], true).unwrap();
        let sum: f32 = probabilities.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(probabilities[0] > probabilities[2]);
        assert!(probabilities[2] > probabilities[1]);
    }

    #[test]
    fn test_missing_model_file() {
        let result = OnnxClassifier::load(
            Path::new("/definitely/not/here/model.onnx"),
            vec!["a".to_string()],
            &ModelConfig::default(),
        );
        assert!(matches!(result, Err(ClassifierError::ModelLoad { .. })));
    }
}
