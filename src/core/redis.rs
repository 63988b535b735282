use std::sync::Arc;

use redis::aio::ConnectionManager;
use redis::{cmd, Client, RedisError};
use tokio::sync::RwLock;

/// Shared Redis connection used for pub/sub notifications. Starts disconnected;
/// `publish` reconnects on demand and fails when Redis cannot be reached.
#[derive(Clone)]
pub(crate) struct RedisHandle {
    url: String,
    manager: Arc<RwLock<Option<ConnectionManager>>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RedisHealth {
    Healthy,
    Disconnected,
    Unhealthy(String),
}

impl RedisHealth {
    pub(crate) fn label(&self) -> String {
        match self {
            Self::Healthy => "healthy".to_string(),
            Self::Disconnected => "disconnected".to_string(),
            Self::Unhealthy(reason) => format!("unhealthy: {reason}"),
        }
    }
}

impl RedisHandle {
    pub(crate) fn new(url: String) -> Self {
        Self { url, manager: Arc::new(RwLock::new(None)) }
    }

    pub(crate) async fn connect(&self) -> Result<(), RedisError> {
        self.ensure_connected().await.map(|_| ())
    }

    pub(crate) async fn disconnect(&self) {
        *self.manager.write().await = None;
    }

    pub(crate) async fn health(&self) -> RedisHealth {
        let Some(mut manager) = self.current().await else {
            return RedisHealth::Disconnected;
        };

        match cmd("PING").query_async::<_, String>(&mut manager).await {
            Ok(_) => RedisHealth::Healthy,
            Err(err) => RedisHealth::Unhealthy(err.to_string()),
        }
    }

    /// Returns the number of subscribers that received the message.
    pub(crate) async fn publish(&self, channel: &str, payload: &str) -> Result<i64, RedisError> {
        let mut manager = match self.current().await {
            Some(manager) => manager,
            None => self.ensure_connected().await?,
        };

        let receivers =
            cmd("PUBLISH").arg(channel).arg(payload).query_async::<_, i64>(&mut manager).await?;
        Ok(receivers)
    }

    async fn current(&self) -> Option<ConnectionManager> {
        self.manager.read().await.clone()
    }

    async fn ensure_connected(&self) -> Result<ConnectionManager, RedisError> {
        let mut slot = self.manager.write().await;
        if let Some(manager) = slot.as_ref() {
            return Ok(manager.clone());
        }

        let client = Client::open(self.url.clone())?;
        let manager = ConnectionManager::new(client).await?;
        *slot = Some(manager.clone());
        Ok(manager)
    }
}
