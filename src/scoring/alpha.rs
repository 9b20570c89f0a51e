use serde::Serialize;

use super::clamp_score;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlphaBucket {
    Degen,
    High,
    Moderate,
    Low,
    Avoid,
}

impl AlphaBucket {
    pub fn label(&self) -> &'static str {
        match self {
            AlphaBucket::Degen => "DEGEN",
            AlphaBucket::High => "HIGH",
            AlphaBucket::Moderate => "MODERATE",
            AlphaBucket::Low => "LOW",
            AlphaBucket::Avoid => "AVOID",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AlphaScore {
    pub score: f64,
    pub bucket: AlphaBucket,
}

/// Composite of the three primary engines, weighted toward momentum.
pub fn alpha_score(momentum: f64, conviction: f64, safety: f64) -> AlphaScore {
    let score = clamp_score(momentum * 0.40 + conviction * 0.35 + safety * 0.25);

    let bucket = if score > 80.0 {
        AlphaBucket::Degen
    } else if score >= 60.0 {
        AlphaBucket::High
    } else if score >= 40.0 {
        AlphaBucket::Moderate
    } else if score >= 20.0 {
        AlphaBucket::Low
    } else {
        AlphaBucket::Avoid
    };

    AlphaScore { score, bucket }
}
