use sqlx::pool::PoolConnection;
use sqlx::{PgPool, Postgres};

/// Advisory lock key shared by every reconciler process.
pub(crate) const RECONCILER_LOCK_KEY: i64 = 0x6a75_6467_6563_6a31;

/// Session-level Postgres advisory lock that elects a single reconciler.
///
/// The lock lives as long as the dedicated connection holding it; losing the
/// connection loses leadership, and the next [`LeaderLease::ensure`] tries to
/// take it again.
pub(crate) struct LeaderLease {
    pool: PgPool,
    key: i64,
    conn: Option<PoolConnection<Postgres>>,
}

impl LeaderLease {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self::with_key(pool, RECONCILER_LOCK_KEY)
    }

    pub(crate) fn with_key(pool: PgPool, key: i64) -> Self {
        Self { pool, key, conn: None }
    }

    /// Returns whether this process is the leader, acquiring the lock if it
    /// is free.
    pub(crate) async fn ensure(&mut self) -> Result<bool, sqlx::Error> {
        if let Some(conn) = self.conn.as_mut() {
            match sqlx::query("SELECT 1").execute(&mut **conn).await {
                Ok(_) => return Ok(true),
                Err(err) => {
                    tracing::warn!(error = %err, "Lost reconciler leader connection");
                    if let Some(conn) = self.conn.take() {
                        drop(conn.detach());
                    }
                }
            }
        }

        let mut conn = self.pool.acquire().await?;
        let acquired: bool = sqlx::query_scalar("SELECT pg_try_advisory_lock($1)")
            .bind(self.key)
            .fetch_one(&mut *conn)
            .await?;

        if acquired {
            tracing::info!(key = self.key, "Acquired reconciler leadership");
            self.conn = Some(conn);
        } else {
            tracing::debug!(key = self.key, "Another reconciler holds leadership");
        }
        Ok(acquired)
    }

    pub(crate) async fn release(&mut self) {
        let Some(mut conn) = self.conn.take() else {
            return;
        };

        let unlocked = sqlx::query_scalar::<_, bool>("SELECT pg_advisory_unlock($1)")
            .bind(self.key)
            .fetch_one(&mut *conn)
            .await;

        match unlocked {
            Ok(true) => tracing::info!(key = self.key, "Released reconciler leadership"),
            Ok(false) | Err(_) => {
                // Closing the session drops any lock it still holds.
                drop(conn.detach());
                tracing::warn!(key = self.key, "Reconciler lock release failed, closed session");
            }
        }
    }
}
