use redis::{Client, RedisError};
use serde::Serialize;
use tracing::{debug, warn};

/// Lifetime of a cached per-token intelligence signal (seconds). Stale
/// beats missing, but a signal older than a scoring cycle is noise.
pub const TTL_INTELLIGENCE: u64 = 60;

/// Redis-backed cache, also carrying the publish side of the live-update
/// channel. Every operation is best-effort: a read/write failure is logged
/// and the caller falls through to the cold path. The cache is never a
/// hard dependency.
#[derive(Clone)]
pub struct CacheLayer {
    client: Client,
}

impl CacheLayer {
    pub fn new(redis_url: &str) -> Result<Self, RedisError> {
        let client = Client::open(redis_url)?;
        Ok(CacheLayer { client })
    }

    fn connection(&self) -> anyhow::Result<redis::Connection> {
        self.client
            .get_connection()
            .map_err(|e| anyhow::anyhow!("Redis connection error: {}", e))
    }

    pub fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl_seconds: u64) {
        let run = || -> anyhow::Result<()> {
            let mut conn = self.connection()?;
            let serialized = serde_json::to_string(value)?;
            let _: () = redis::cmd("SET").arg(key).arg(serialized).query(&mut conn)?;
            let _: () = redis::cmd("EXPIRE").arg(key).arg(ttl_seconds).query(&mut conn)?;
            Ok(())
        };
        match run() {
            Ok(()) => debug!("Cached key: {}", key),
            Err(e) => warn!("Cache write failed for {}: {}", key, e),
        }
    }

    pub fn get_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let run = || -> anyhow::Result<Option<T>> {
            let mut conn = self.connection()?;
            match redis::cmd("GET").arg(key).query::<String>(&mut conn) {
                Ok(cached) => Ok(serde_json::from_str(&cached).ok()),
                Err(_) => Ok(None),
            }
        };
        match run() {
            Ok(hit) => {
                if hit.is_some() {
                    debug!("Cache hit for key: {}", key);
                }
                hit
            }
            Err(e) => {
                warn!("Cache read failed for {}: {}", key, e);
                None
            }
        }
    }

    /// Publish a live tick on the channel consumed by the realtime fan-out
    /// process. Best-effort like everything else here.
    pub fn publish<T: Serialize>(&self, channel: &str, payload: &T) {
        let run = || -> anyhow::Result<()> {
            let mut conn = self.connection()?;
            let serialized = serde_json::to_string(payload)?;
            let _: () = redis::cmd("PUBLISH").arg(channel).arg(serialized).query(&mut conn)?;
            Ok(())
        };
        if let Err(e) = run() {
            warn!("Publish failed on {}: {}", channel, e);
        }
    }

    /// Deterministic key for a token's cached intelligence signal.
    pub fn intelligence_key(contract: &str) -> String {
        format!("intel:{}", contract.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intelligence_keys_are_deterministic_and_case_folded() {
        assert_eq!(CacheLayer::intelligence_key("MINT1"), "intel:mint1");
        assert_eq!(
            CacheLayer::intelligence_key("mint1"),
            CacheLayer::intelligence_key("MINT1")
        );
    }
}
