// src/metrics.rs
use log::warn;

use crate::types::{Band, BandPowers, NeurofeedbackMetrics};

/// Ratio with IEEE semantics. A zero denominator yields inf/NaN, which is
/// reported instead of aborting the acquisition loop.
fn ratio(name: &str, numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        warn!("{name}: denominator is zero, metric is not finite");
    }
    numerator / denominator
}

/// Neurofeedback protocols computed from smoothed band powers.
///
/// - alpha / delta: relaxation, delta normalises out movement noise
/// - beta / theta: concentration (common ADHD protocol)
/// - gamma: perception / cognitive processing
/// - theta / alpha: stress reduction
pub fn neurofeedback(smoothed: &BandPowers) -> NeurofeedbackMetrics {
    NeurofeedbackMetrics {
        alpha_relaxation: ratio("alpha relaxation", smoothed[Band::Alpha], smoothed[Band::Delta]),
        beta_concentration: ratio("beta concentration", smoothed[Band::Beta], smoothed[Band::Theta]),
        gamma_perception: smoothed[Band::Gamma],
        theta_relaxation: ratio("theta relaxation", smoothed[Band::Theta], smoothed[Band::Alpha]),
    }
}
