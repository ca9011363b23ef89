//! Valkey/Redis slot backend: one hash per session, one field per slot.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::FromRedisValue;
use tokio::sync::Mutex;

use crate::config::DEFAULT_STORE_KEY_PREFIX;
use crate::observability::SessionEvent;

use super::SlotBackend;

/// Session slots in one Valkey hash per session.
#[derive(Debug)]
pub struct ValkeySlotBackend {
    client: redis::Client,
    key_prefix: String,
    ttl_secs: Option<u64>,
    connection: Arc<Mutex<Option<redis::aio::MultiplexedConnection>>>,
}

impl ValkeySlotBackend {
    /// # Errors
    ///
    /// Fails when `url` is not a valid redis URL. No connection is opened yet.
    pub fn new(url: &str, key_prefix: Option<String>, ttl_secs: Option<u64>) -> Result<Self> {
        let client = redis::Client::open(url)
            .with_context(|| format!("invalid redis url for session slot backend: {url}"))?;
        let key_prefix = key_prefix
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_STORE_KEY_PREFIX.to_string());
        Ok(Self {
            client,
            key_prefix,
            ttl_secs: ttl_secs.filter(|v| *v > 0),
            connection: Arc::new(Mutex::new(None)),
        })
    }

    /// Prefix of every session key.
    #[must_use]
    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    fn session_key(&self, session_id: &str) -> String {
        format!("{}:slots:{}", self.key_prefix, session_id)
    }

    async fn ensure_connection(
        &self,
        connection: &mut Option<redis::aio::MultiplexedConnection>,
    ) -> Result<()> {
        if connection.is_some() {
            return Ok(());
        }
        *connection = Some(
            self.client
                .get_multiplexed_async_connection()
                .await
                .context("failed to open redis connection for session slots")?,
        );
        tracing::debug!(
            event = SessionEvent::StoreValkeyConnected.as_str(),
            key_prefix = %self.key_prefix,
            "valkey slot backend connected"
        );
        Ok(())
    }

    /// Run `build()` once, reconnecting and retrying once on failure.
    async fn run_command<T, F>(&self, operation: &'static str, build: F) -> Result<T>
    where
        T: FromRedisValue + Send,
        F: Fn() -> redis::Cmd,
    {
        let mut last_err: Option<anyhow::Error> = None;
        for attempt in 0..2 {
            let mut conn_guard = self.connection.lock().await;
            self.ensure_connection(&mut conn_guard).await?;
            let conn = conn_guard
                .as_mut()
                .ok_or_else(|| anyhow::anyhow!("valkey slot connection unavailable"))?;
            let result: redis::RedisResult<T> = build().query_async(conn).await;
            match result {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::debug!(
                            event = SessionEvent::StoreValkeyCommandRetrySucceeded.as_str(),
                            operation,
                            attempt = attempt + 1,
                            "valkey command succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(err) => {
                    tracing::warn!(
                        event = SessionEvent::StoreValkeyCommandRetryFailed.as_str(),
                        operation,
                        attempt = attempt + 1,
                        error = %err,
                        "valkey command attempt failed; reconnecting"
                    );
                    *conn_guard = None;
                    last_err =
                        Some(anyhow::anyhow!(err).context("redis command failed for session slots"));
                }
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("redis command failed for unknown reason")))
    }
}

#[async_trait]
impl SlotBackend for ValkeySlotBackend {
    fn backend_name(&self) -> &'static str {
        "valkey"
    }

    async fn get(&self, session_id: &str, slot: &str) -> Result<Option<String>> {
        let key = self.session_key(session_id);
        self.run_command("slot_get", || {
            let mut cmd = redis::cmd("HGET");
            cmd.arg(&key).arg(slot);
            cmd
        })
        .await
    }

    async fn set(&self, session_id: &str, slot: &str, value: String) -> Result<()> {
        let key = self.session_key(session_id);
        self.run_command::<(), _>("slot_set", || {
            let mut cmd = redis::cmd("HSET");
            cmd.arg(&key).arg(slot).arg(&value);
            cmd
        })
        .await?;
        if let Some(ttl) = self.ttl_secs {
            self.run_command::<(), _>("slot_expire", || {
                let mut cmd = redis::cmd("EXPIRE");
                cmd.arg(&key).arg(ttl);
                cmd
            })
            .await?;
        }
        Ok(())
    }

    async fn clear(&self, session_id: &str) -> Result<()> {
        let key = self.session_key(session_id);
        self.run_command::<(), _>("slot_clear", || {
            let mut cmd = redis::cmd("DEL");
            cmd.arg(&key);
            cmd
        })
        .await
    }
}
