use std::sync::Arc;

use redis::aio::ConnectionManager;
use redis::{cmd, Client, ErrorKind, RedisError};
use tokio::sync::RwLock;

/// Shared broker connection. `ConnectionManager` reconnects on its own once
/// established; a handle that never connected retries lazily on first use.
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
        let mut guard = self.manager.write().await;
        *guard = Some(manager);
        Ok(())
    }

    pub(crate) async fn disconnect(&self) {
        let mut guard = self.manager.write().await;
        *guard = None;
    }

    pub(crate) async fn health(&self) -> RedisHealth {
        let manager = { self.manager.read().await.clone() };
        let Some(mut manager) = manager else {
            return RedisHealth::Disconnected;
        };

        match cmd("PING").query_async::<_, String>(&mut manager).await {
            Ok(_) => RedisHealth::Healthy,
            Err(err) => RedisHealth::Unhealthy(err.to_string()),
        }
    }

    /// Appends one entry to `stream`, trimming it to roughly `maxlen` entries.
    /// Returns the id Redis assigned to the entry.
    pub(crate) async fn append_to_stream(
        &self,
        stream: &str,
        maxlen: u64,
        fields: &[(&str, &str)],
    ) -> Result<String, RedisError> {
        let mut manager = self.manager_or_connect().await?;

        let mut command = cmd("XADD");
        command.arg(stream);
        if maxlen > 0 {
            command.arg("MAXLEN").arg("~").arg(maxlen);
        }
        command.arg("*");
        for (field, value) in fields {
            command.arg(*field).arg(*value);
        }

        command.query_async::<_, String>(&mut manager).await
    }

    async fn manager_or_connect(&self) -> Result<ConnectionManager, RedisError> {
        if let Some(manager) = self.manager.read().await.clone() {
            return Ok(manager);
        }

        self.connect().await?;
        self.manager.read().await.clone().ok_or_else(|| {
            RedisError::from((ErrorKind::IoError, "redis connection is not established"))
        })
    }
}
