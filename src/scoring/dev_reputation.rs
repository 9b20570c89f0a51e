use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeveloperLabel {
    Unknown,
    Clean,
    SerialRugger,
}

#[derive(Debug, Clone, Serialize)]
pub struct DevReputation {
    pub score: f64,
    pub label: DeveloperLabel,
    pub prior_launches: u32,
    pub signals: Vec<String>,
}

/// Developer-reputation contract. A real creator-history lookup is a known
/// upstream gap; with no history available the engine returns the
/// documented neutral default so the edge composite stays deterministic.
/// `prior_rugs`/`prior_launches` come from whatever history the caller has
/// been able to assemble (currently none in the scheduled pipeline).
pub fn dev_reputation(prior_launches: u32, prior_rugs: u32) -> DevReputation {
    if prior_launches == 0 {
        return DevReputation {
            score: 50.0,
            label: DeveloperLabel::Unknown,
            prior_launches: 0,
            signals: vec!["No creator history available, neutral reputation".to_string()],
        };
    }

    let rug_ratio = prior_rugs as f64 / prior_launches as f64;
    let score = (100.0 - rug_ratio * 100.0).clamp(0.0, 100.0);

    let label = if prior_rugs >= 2 || rug_ratio >= 0.5 {
        DeveloperLabel::SerialRugger
    } else {
        DeveloperLabel::Clean
    };

    let signals = vec![format!(
        "{} prior launches, {} rugged",
        prior_launches, prior_rugs
    )];

    DevReputation {
        score,
        label,
        prior_launches,
        signals,
    }
}
