use std::sync::Arc;

use redis::aio::ConnectionManager;
use redis::{cmd, Client, RedisError, Script};
use tokio::sync::RwLock;

const KEY_PREFIX: &str = "classhub";

const FIXED_WINDOW_SCRIPT: &str = r#"
    local current = redis.call("INCR", KEYS[1])
    if current == 1 then
        redis.call("EXPIRE", KEYS[1], ARGV[1])
    end
    return current
"#;

/// Fixed-window limit: at most `max_hits` per `window_seconds`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RateLimit {
    pub(crate) max_hits: u64,
    pub(crate) window_seconds: u64,
}

#[derive(Clone)]
pub(crate) struct RedisHandle {
    url: String,
    manager: Arc<RwLock<Option<ConnectionManager>>>,
}

#[derive(Debug, Clone)]
pub(crate) enum RedisHealth {
    Healthy,
    Disconnected,
    Unhealthy(String),
}

impl RedisHandle {
    pub(crate) fn new(url: String) -> Self {
        Self { url, manager: Arc::new(RwLock::new(None)) }
    }

    pub(crate) async fn connect(&self) -> Result<(), RedisError> {
        let client = Client::open(self.url.clone())?;
        let manager = ConnectionManager::new(client).await?;
        *self.manager.write().await = Some(manager);
        Ok(())
    }

    pub(crate) async fn disconnect(&self) {
        *self.manager.write().await = None;
    }

    async fn connection(&self) -> Option<ConnectionManager> {
        self.manager.read().await.clone()
    }

    pub(crate) async fn health(&self) -> RedisHealth {
        let Some(mut manager) = self.connection().await else {
            return RedisHealth::Disconnected;
        };

        match cmd("PING").query_async::<_, String>(&mut manager).await {
            Ok(_) => RedisHealth::Healthy,
            Err(err) => RedisHealth::Unhealthy(err.to_string()),
        }
    }

    /// Counts a hit against `scope:subject`. Without a connection every hit is allowed.
    pub(crate) async fn check_rate_limit(
        &self,
        scope: &str,
        subject: &str,
        limit: RateLimit,
    ) -> Result<bool, RedisError> {
        let Some(mut manager) = self.connection().await else {
            return Ok(true);
        };

        let key = rate_limit_key(scope, subject);
        let current: i64 = Script::new(FIXED_WINDOW_SCRIPT)
            .key(key)
            .arg(limit.window_seconds as i64)
            .invoke_async(&mut manager)
            .await?;

        Ok(current <= limit.max_hits as i64)
    }
}

fn rate_limit_key(scope: &str, subject: &str) -> String {
    format!("{KEY_PREFIX}:rl:{scope}:{}", subject.trim().to_ascii_lowercase())
}
