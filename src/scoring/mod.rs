pub mod alpha;
pub mod conviction;
pub mod dev_reputation;
pub mod edge;
pub mod integrity;
pub mod momentum;
pub mod threat;

pub use alpha::{alpha_score, AlphaBucket, AlphaScore};
pub use conviction::{conviction_score, ConvictionScore};
pub use dev_reputation::{dev_reputation, DevReputation, DeveloperLabel};
pub use edge::{edge_score, EdgeInputs, EdgeScore, EdgeVerdict, Recommendation};
pub use integrity::{integrity_report, IntegrityReport};
pub use momentum::{momentum_score, MomentumPhase, MomentumScore};
pub use threat::{threat_assessment, ThreatAssessment, ThreatInputs, ThreatLevel};

/// All engine outputs carry a bounded [0,100] score.
pub(crate) fn clamp_score(score: f64) -> f64 {
    score.clamp(0.0, 100.0)
}
