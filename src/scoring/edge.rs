use serde::Serialize;

use super::clamp_score;
use super::dev_reputation::DeveloperLabel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EdgeVerdict {
    Alpha,
    Edge,
    Neutral,
    Risky,
    Avoid,
}

impl EdgeVerdict {
    pub fn label(&self) -> &'static str {
        match self {
            EdgeVerdict::Alpha => "ALPHA",
            EdgeVerdict::Edge => "EDGE",
            EdgeVerdict::Neutral => "NEUTRAL",
            EdgeVerdict::Risky => "RISKY",
            EdgeVerdict::Avoid => "AVOID",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub action: &'static str,
    pub confidence: f64,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EdgeScore {
    pub score: f64,
    pub verdict: EdgeVerdict,
    pub safety_component: f64,
    pub recommendation: Recommendation,
}

/// Inputs to the master composite. Narrative and smart-flow computation
/// are known upstream gaps; callers pass the neutral defaults until real
/// sources exist.
#[derive(Debug, Clone)]
pub struct EdgeInputs {
    pub dev_reputation: f64,
    pub dev_label: DeveloperLabel,
    pub bundle_risk_score: f64,
    pub threat_safety_score: f64,
    pub narrative_score: f64,
    pub smart_flow_score: f64,
    pub integrity_score: f64,
    pub drain_alert_active: bool,
}

/// Master composite: safety 0.30, narrative 0.20, smart flow 0.30,
/// integrity 0.20, where safety folds developer reputation, bundle risk
/// and the threat engine's safety score together. Hard AVOID overrides on
/// a serial-rugger label, an active drain alert, or safety below 30.
pub fn edge_score(inputs: &EdgeInputs) -> EdgeScore {
    let safety = clamp_score(
        100.0
            - 0.5 * (100.0 - inputs.dev_reputation)
            - 0.3 * inputs.bundle_risk_score
            - 0.2 * (100.0 - inputs.threat_safety_score),
    );

    let score = clamp_score(
        safety * 0.30
            + inputs.narrative_score * 0.20
            + inputs.smart_flow_score * 0.30
            + inputs.integrity_score * 0.20,
    );

    let verdict = if score >= 80.0 {
        EdgeVerdict::Alpha
    } else if score >= 65.0 {
        EdgeVerdict::Edge
    } else if score >= 45.0 {
        EdgeVerdict::Neutral
    } else if score >= 25.0 {
        EdgeVerdict::Risky
    } else {
        EdgeVerdict::Avoid
    };

    let recommendation = recommend(inputs, safety, score, verdict);
    let verdict = if recommendation.action == "AVOID" {
        EdgeVerdict::Avoid
    } else {
        verdict
    };

    EdgeScore {
        score,
        verdict,
        safety_component: safety,
        recommendation,
    }
}

fn recommend(inputs: &EdgeInputs, safety: f64, score: f64, verdict: EdgeVerdict) -> Recommendation {
    // Hard overrides come first and are not negotiable by the composite.
    if inputs.dev_label == DeveloperLabel::SerialRugger {
        return Recommendation {
            action: "AVOID",
            confidence: 95.0,
            reasons: vec!["Developer labeled serial rugger".to_string()],
        };
    }
    if inputs.drain_alert_active {
        return Recommendation {
            action: "AVOID",
            confidence: 95.0,
            reasons: vec!["Active liquidity drain alert".to_string()],
        };
    }
    if safety < 30.0 {
        return Recommendation {
            action: "AVOID",
            confidence: 90.0,
            reasons: vec![format!("Safety component {:.0} below floor", safety)],
        };
    }

    let mut reasons = Vec::new();
    let mut strong_factors = 0;
    for (name, value) in [
        ("safety", safety),
        ("narrative", inputs.narrative_score),
        ("smart flow", inputs.smart_flow_score),
        ("integrity", inputs.integrity_score),
    ] {
        if value >= 70.0 {
            strong_factors += 1;
            reasons.push(format!("Strong {} ({:.0})", name, value));
        }
    }
    if reasons.is_empty() {
        reasons.push(format!("Composite edge score {:.0}", score));
    }

    // Confidence scales with the numeric score and the number of factors
    // actually carrying it.
    let confidence = clamp_score(score * 0.7 + strong_factors as f64 * 7.5);

    let action = match verdict {
        EdgeVerdict::Alpha => {
            if strong_factors >= 3 {
                "STRONG_BUY"
            } else {
                "ACCUMULATE"
            }
        }
        EdgeVerdict::Edge => "ACCUMULATE",
        EdgeVerdict::Neutral => "WATCH",
        EdgeVerdict::Risky => "CAUTION",
        EdgeVerdict::Avoid => "AVOID",
    };

    Recommendation {
        action,
        confidence,
        reasons,
    }
}
