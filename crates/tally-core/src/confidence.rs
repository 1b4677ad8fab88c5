//! Estimation confidence heuristic.
//!
//! The raw share of estimated tickets overstates confidence when those
//! tickets are themselves large guesses, so the ratio is discounted by the
//! average estimated ticket size.

use serde::{Deserialize, Serialize};

use crate::rounding::round2;

/// Highest confidence ever reported.
pub const MAX_CONFIDENCE: f64 = 95.0;

/// Bounds for the average-ticket-size discount.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceWeights {
    /// Average ticket size at or below which no discount applies.
    pub story_point_weight: f64,
    /// Average ticket size beyond which the discount stops growing.
    pub story_point_weight_ceiling: f64,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            story_point_weight: 5.0,
            story_point_weight_ceiling: 25.0,
        }
    }
}

/// Computes the estimation confidence, in `[0, 95]`, rounded to 2 decimals.
///
/// `estimated` and `unestimated` count incomplete tickets; `remaining_time`
/// is the outstanding estimate they carry.
pub fn estimation_confidence(
    estimated: u32,
    unestimated: u32,
    remaining_time: f64,
    weights: &ConfidenceWeights,
) -> f64 {
    let total = estimated + unestimated;
    if total == 0 {
        return 0.0;
    }
    let mut confidence = 100.0 * f64::from(estimated) / f64::from(total);

    let avg_ticket_size = if estimated == 0 {
        0.0
    } else {
        remaining_time / f64::from(estimated)
    };
    let floor = weights.story_point_weight;
    let ceiling = weights.story_point_weight_ceiling.max(floor);
    let clamped = avg_ticket_size.clamp(floor, ceiling);
    if confidence != 0.0 && clamped > 0.0 {
        confidence *= floor / clamped;
    }

    round2(confidence.clamp(0.0, MAX_CONFIDENCE))
}
