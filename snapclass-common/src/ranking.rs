//! Probability ranking for the prediction breakdown

use serde::Serialize;

/// One row of the probability breakdown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedClass {
    pub label: String,
    pub probability: f32,
    /// `probability * 100`
    pub percentage: f64,
    /// Set on the row matching the current prediction
    pub highlighted: bool,
}

impl RankedClass {
    /// Percentage with two decimals, e.g. `"80.00%"`
    pub fn display_percentage(&self) -> String {
        format_percentage(self.percentage)
    }

    /// CSS width for the bar, four decimals
    pub fn bar_width(&self) -> String {
        format!("{:.4}%", self.percentage.clamp(0.0, 100.0))
    }
}

/// Pair labels with probabilities and sort descending
///
/// The sort is stable, so equal probabilities keep class order.
pub fn rank_probabilities(
    vocab: &[String],
    probabilities: &[f32],
    predicted_label: &str,
) -> Vec<RankedClass> {
    let mut ranked: Vec<RankedClass> = vocab
        .iter()
        .zip(probabilities)
        .map(|(label, &probability)| RankedClass {
            label: label.clone(),
            probability,
            percentage: f64::from(probability) * 100.0,
            highlighted: label == predicted_label,
        })
        .collect();

    ranked.sort_by(|a, b| b.probability.total_cmp(&a.probability));
    ranked
}

pub fn format_percentage(percentage: f64) -> String {
    format!("{:.2}%", percentage)
}
