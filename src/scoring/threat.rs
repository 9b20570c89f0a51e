use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ThreatLevel {
    Green,
    Yellow,
    Red,
    Critical,
}

impl ThreatLevel {
    pub fn label(&self) -> &'static str {
        match self {
            ThreatLevel::Green => "GREEN",
            ThreatLevel::Yellow => "YELLOW",
            ThreatLevel::Red => "RED",
            ThreatLevel::Critical => "CRITICAL",
        }
    }
}

/// On-chain security facts, `None` meaning unknown. Unknown liquidity lock
/// status is penalized the same as unlocked.
#[derive(Debug, Clone, Default)]
pub struct ThreatInputs {
    pub mint_authority_active: Option<bool>,
    pub freeze_authority_active: Option<bool>,
    pub top10_holder_pct: Option<f64>,
    pub liquidity_locked: Option<bool>,
    pub ownership_renounced: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThreatAssessment {
    pub safety_score: f64,
    pub level: ThreatLevel,
    pub signals: Vec<String>,
}

/// Starts safe at 100 and subtracts per-fact penalties. Bands on the
/// resulting safety score: >=76 GREEN, 31-75 YELLOW, 1-30 RED, 0 CRITICAL.
pub fn threat_assessment(inputs: &ThreatInputs) -> ThreatAssessment {
    let mut penalty: f64 = 0.0;
    let mut signals = Vec::new();

    if inputs.mint_authority_active == Some(true) {
        penalty += 50.0;
        signals.push("Mint authority still active".to_string());
    }
    if inputs.freeze_authority_active == Some(true) {
        penalty += 40.0;
        signals.push("Freeze authority still active".to_string());
    }
    match inputs.top10_holder_pct {
        Some(pct) if pct > 50.0 => {
            penalty += 30.0;
            signals.push(format!("Top-10 holders control {:.0}% of supply", pct));
        }
        Some(pct) if pct > 30.0 => {
            penalty += 15.0;
            signals.push(format!("Top-10 holders control {:.0}% of supply", pct));
        }
        _ => {}
    }
    if inputs.liquidity_locked != Some(true) {
        penalty += 25.0;
        signals.push("Liquidity unlocked or lock status unknown".to_string());
    }
    if inputs.ownership_renounced != Some(true) {
        penalty += 20.0;
        signals.push("Ownership not renounced".to_string());
    }

    let safety_score = (100.0 - penalty).max(0.0);
    let level = if safety_score >= 76.0 {
        ThreatLevel::Green
    } else if safety_score >= 31.0 {
        ThreatLevel::Yellow
    } else if safety_score > 0.0 {
        ThreatLevel::Red
    } else {
        ThreatLevel::Critical
    };

    ThreatAssessment {
        safety_score,
        level,
        signals,
    }
}
