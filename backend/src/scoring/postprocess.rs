use shared::FreshnessLabel;

use crate::error::ScoringError;

/// Index of the "fresh" class in the classifier output.
pub const FRESH_CLASS: usize = 0;

pub const MAX_PRICE: u32 = 10_000;

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|v| v / sum).collect()
}

/// `floor(softmax(outputs)[FRESH_CLASS] * 100)`, truncated rather than rounded.
pub fn freshness_percentage(outputs: &[f32]) -> Result<u8, ScoringError> {
    if outputs.len() <= FRESH_CLASS {
        return Err(ScoringError::Inference("model returned no scores".to_string()));
    }
    if outputs.iter().any(|v| !v.is_finite()) {
        return Err(ScoringError::Inference(format!(
            "cannot score non-finite outputs {:?}",
            outputs
        )));
    }

    let fresh = softmax(outputs)[FRESH_CLASS];
    // Scaled in f64: an f32 product can round up past the next integer.
    Ok((f64::from(fresh) * 100.0).floor().clamp(0.0, 100.0) as u8)
}

pub fn freshness_label(percentage: u8) -> FreshnessLabel {
    match percentage {
        p if p > 90 => FreshnessLabel::ReallyFresh,
        p if p > 65 => FreshnessLabel::Good,
        p if p > 50 => FreshnessLabel::Fair,
        p if p > 0 => FreshnessLabel::Poor,
        _ => FreshnessLabel::Rotten,
    }
}

/// `floor(p / 100 * MAX_PRICE)`, done in integers so that e.g. 57% is
/// exactly 5700.
pub fn price(percentage: u8) -> u32 {
    u32::from(percentage.min(100)) * MAX_PRICE / 100
}
