use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{info, warn};

use super::RecurringJob;
use crate::storage::{Token, TokenStore};

/// Boundary to the language-model provider. The queue is registered only
/// when a key is configured, so a missing AI key simply disables the
/// feature.
#[async_trait]
pub trait Interpreter: Send + Sync {
    async fn interpret(&self, context: &str) -> anyhow::Result<String>;
}

/// Generates a short natural-language summary per scored token and writes
/// it onto the token row. Failures are per-token; a bad response never
/// stops the cycle.
pub struct InterpretationJob {
    interpreter: Arc<dyn Interpreter>,
    store: Arc<dyn TokenStore>,
    interval: Duration,
}

impl InterpretationJob {
    pub fn new(
        interpreter: Arc<dyn Interpreter>,
        store: Arc<dyn TokenStore>,
        interval: Duration,
    ) -> Self {
        Self {
            interpreter,
            store,
            interval,
        }
    }
}

const COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const COMPLETIONS_MODEL: &str = "gpt-4o-mini";
const SYSTEM_PROMPT: &str = "You are a crypto market analyst. Summarize the token's \
    current standing in two sentences, plain language, no hedging boilerplate.";

/// Chat-completions backed interpreter. Parses the response defensively;
/// an empty or unexpected payload is an error, not a blank summary.
pub struct HttpInterpreter {
    client: Client,
    api_key: String,
}

impl HttpInterpreter {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
        }
    }

    fn request_body(context: &str) -> Value {
        json!({
            "model": COMPLETIONS_MODEL,
            "max_tokens": 150,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": context },
            ],
        })
    }

    fn extract_summary(body: &Value) -> Option<String> {
        let content = body
            .get("choices")?
            .get(0)?
            .get("message")?
            .get("content")?
            .as_str()?
            .trim();
        if content.is_empty() {
            None
        } else {
            Some(content.to_string())
        }
    }
}

#[async_trait]
impl Interpreter for HttpInterpreter {
    async fn interpret(&self, context: &str) -> anyhow::Result<String> {
        let response = self
            .client
            .post(COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&Self::request_body(context))
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("completions endpoint returned {}", response.status());
        }

        let body: Value = response.json().await?;
        Self::extract_summary(&body)
            .ok_or_else(|| anyhow::anyhow!("completions response had no usable content"))
    }
}

fn interpretation_context(token: &Token) -> String {
    format!(
        "Token {} ({}) on {}: price ${:.6}, liquidity ${:.0}, 24h volume ${:.0}, \
         market cap ${:.0}, momentum {}, conviction {}, threat {}",
        token.symbol,
        token.name,
        token.chain,
        token.price_usd,
        token.liquidity_usd,
        token.volume_24h_usd,
        token.market_cap_usd,
        token
            .momentum_score
            .map(|s| format!("{:.0}", s))
            .unwrap_or_else(|| "unscored".to_string()),
        token
            .conviction_score
            .map(|s| format!("{:.0}", s))
            .unwrap_or_else(|| "unscored".to_string()),
        token.threat_level.as_deref().unwrap_or("unscored"),
    )
}

#[async_trait]
impl RecurringJob for InterpretationJob {
    fn queue_name(&self) -> &'static str {
        "ai-interpretation"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn run(&self) -> anyhow::Result<()> {
        let since = Utc::now() - ChronoDuration::hours(24);
        let tokens = self.store.tokens_seen_since(since).await?;

        let mut summarized = 0usize;
        for token in &tokens {
            // Only tokens the scoring job has already been over.
            if token.momentum_score.is_none() {
                continue;
            }

            let context = interpretation_context(token);
            let summary = match self.interpreter.interpret(&context).await {
                Ok(summary) => summary,
                Err(e) => {
                    warn!("Interpretation failed for {}: {}", token.symbol, e);
                    continue;
                }
            };

            match self.store.update_ai_summary(token.id, &summary).await {
                Ok(()) => summarized += 1,
                Err(e) => warn!("Summary write failed for {}: {}", token.symbol, e),
            }
        }

        info!(
            "Interpretation cycle: {}/{} tokens summarized",
            summarized,
            tokens.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn context_names_scores_and_falls_back_for_unscored_fields() {
        let token = Token {
            id: Uuid::new_v4(),
            contract_address: "mint1".to_string(),
            chain: "solana".to_string(),
            name: "Example".to_string(),
            symbol: "EXM".to_string(),
            price_usd: 0.0042,
            liquidity_usd: 50_000.0,
            volume_24h_usd: 25_000.0,
            market_cap_usd: 400_000.0,
            pair_address: "pair1".to_string(),
            dex_id: "raydium".to_string(),
            first_seen_at: Utc::now(),
            last_seen_at: Utc::now(),
            last_ingested_at: Utc::now(),
            momentum_score: Some(72.0),
            conviction_score: None,
            threat_level: Some("GREEN".to_string()),
            smart_wallet_flow: None,
            cluster_detected: None,
            ai_summary: None,
            mint_authority_active: None,
            freeze_authority_active: None,
            top10_holder_pct: None,
            liquidity_locked: None,
            ownership_renounced: None,
        };

        let context = interpretation_context(&token);
        assert!(context.contains("EXM"));
        assert!(context.contains("momentum 72"));
        assert!(context.contains("conviction unscored"));
        assert!(context.contains("threat GREEN"));
    }

    #[test]
    fn completions_payload_round_trips_content_only() {
        let body = HttpInterpreter::request_body("EXM context");
        assert_eq!(body["model"], COMPLETIONS_MODEL);
        assert_eq!(body["messages"][1]["content"], "EXM context");

        let response = serde_json::json!({
            "choices": [{ "message": { "content": "  Solid liquidity, no red flags.  " } }]
        });
        assert_eq!(
            HttpInterpreter::extract_summary(&response).as_deref(),
            Some("Solid liquidity, no red flags.")
        );

        let empty = serde_json::json!({ "choices": [{ "message": { "content": "" } }] });
        assert!(HttpInterpreter::extract_summary(&empty).is_none());
        assert!(HttpInterpreter::extract_summary(&serde_json::json!({})).is_none());
    }

    struct CannedInterpreter;

    #[async_trait]
    impl Interpreter for CannedInterpreter {
        async fn interpret(&self, _context: &str) -> anyhow::Result<String> {
            Ok("summary".to_string())
        }
    }

    #[tokio::test]
    async fn one_rejected_summary_write_does_not_abort_the_cycle() {
        let first = crate::jobs::support::sample_token("AAA");
        let second = crate::jobs::support::sample_token("BBB");
        let second_id = second.id;

        let mut store =
            crate::jobs::support::RecordingStore::with_tokens(vec![first.clone(), second]);
        store.fail_summary_for = Some(first.id);
        let store = Arc::new(store);

        let job = InterpretationJob::new(
            Arc::new(CannedInterpreter),
            store.clone(),
            Duration::from_secs(900),
        );
        job.run().await.unwrap();

        let summaries = store.summaries.lock().unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].0, second_id);
    }
}
