use serde::Serialize;

use super::clamp_score;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MomentumPhase {
    Surging,
    Climbing,
    Flat,
    Cooling,
    Dumping,
}

impl MomentumPhase {
    pub fn label(&self) -> &'static str {
        match self {
            MomentumPhase::Surging => "SURGING",
            MomentumPhase::Climbing => "CLIMBING",
            MomentumPhase::Flat => "FLAT",
            MomentumPhase::Cooling => "COOLING",
            MomentumPhase::Dumping => "DUMPING",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MomentumScore {
    pub score: f64,
    pub raw_momentum: f64,
    pub phase: MomentumPhase,
    pub signals: Vec<String>,
}

/// Raw momentum is the mean of 24h price and volume change, mapped into
/// zones: >=15% surging (76-100), 5-15% climbing (56-75), -5-5% flat
/// (31-55), -10--5% cooling (20-30), below dumping (0-20).
pub fn momentum_score(
    price_change_24h: Option<f64>,
    volume_change_24h: Option<f64>,
) -> MomentumScore {
    if price_change_24h.is_none() && volume_change_24h.is_none() {
        return MomentumScore {
            score: 50.0,
            raw_momentum: 0.0,
            phase: MomentumPhase::Flat,
            signals: vec!["Insufficient market history, neutral momentum assumed".to_string()],
        };
    }

    let price_change = price_change_24h.unwrap_or(0.0);
    let volume_change = volume_change_24h.unwrap_or(0.0);
    let raw = (price_change + volume_change) / 2.0;

    let (score, phase) = if raw >= 15.0 {
        (clamp_score(76.0 + (raw - 15.0) / 85.0 * 24.0), MomentumPhase::Surging)
    } else if raw >= 5.0 {
        (56.0 + (raw - 5.0) / 10.0 * 19.0, MomentumPhase::Climbing)
    } else if raw >= -5.0 {
        (31.0 + (raw + 5.0) / 10.0 * 24.0, MomentumPhase::Flat)
    } else if raw >= -10.0 {
        (20.0 + (raw + 10.0) / 5.0 * 10.0, MomentumPhase::Cooling)
    } else {
        ((20.0 + (raw + 10.0)).clamp(0.0, 20.0), MomentumPhase::Dumping)
    };

    let mut signals = vec![format!(
        "Price {:+.1}% / volume {:+.1}% over 24h",
        price_change, volume_change
    )];
    if raw >= 15.0 {
        signals.push("Strong combined momentum".to_string());
    } else if raw < -10.0 {
        signals.push("Heavy sell-off in progress".to_string());
    }

    MomentumScore {
        score,
        raw_momentum: raw,
        phase,
        signals,
    }
}
