use thiserror::Error;

/// Failure taxonomy for the ingestion pipeline.
///
/// Record-level failures (`MalformedRecord`, `Persistence`) never abort a
/// batch or cycle; provider/batch-level systemic failures (`RateLimit`,
/// `UpstreamExhausted`, the circuit breaker) abort the current cycle early
/// and defer to the next scheduled run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("transient network error: {0}")]
    TransientNetwork(String),

    #[error("rate limit exceeded by {provider}")]
    RateLimit { provider: String },

    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("operation timed out: {0}")]
    Timeout(String),

    #[error("all providers exhausted")]
    UpstreamExhausted,
}

impl From<sqlx::Error> for PipelineError {
    fn from(e: sqlx::Error) -> Self {
        PipelineError::Persistence(e.to_string())
    }
}

impl From<reqwest::Error> for PipelineError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            PipelineError::Timeout(e.to_string())
        } else {
            PipelineError::TransientNetwork(e.to_string())
        }
    }
}

impl PipelineError {
    /// Transient errors are retried with backoff; rate limits are not
    /// retried and trigger the fallback chain instead.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PipelineError::TransientNetwork(_) | PipelineError::Timeout(_))
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(self, PipelineError::RateLimit { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_carry_the_source_message_and_stay_retryable() {
        let e = PipelineError::Timeout("deadline elapsed connecting to upstream".to_string());
        assert_eq!(
            e.to_string(),
            "operation timed out: deadline elapsed connecting to upstream"
        );
        assert!(e.is_retryable());
        assert!(!PipelineError::RateLimit { provider: "birdeye".to_string() }.is_retryable());
    }
}
