//! Fail-open Redis connection adapter.
//!
//! Redis backs the revocation set, the rate-limit counters, and the response
//! cache - all safety/optimization layers, none a system of record. The
//! server therefore starts (and keeps serving) without it: a failed connect
//! logs a warning and leaves the handle unset, and every dependent store
//! degrades to its permissive path when `handle()` returns `None`.

use std::sync::Arc;
use std::time::Duration;

use redis::aio::MultiplexedConnection;
use tokio::sync::Mutex;

/// Fixed connection-establishment timeout, matching the probe at startup.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Process-wide, lazily (re)established Redis handle.
///
/// Cloning is cheap; all clones share the same underlying connection slot.
/// A dead handle is replaced transparently on next use with at most one
/// reconnect attempt per call - callers are never blocked on a store that
/// stays down.
#[derive(Clone)]
pub struct KvClient {
    client: Option<redis::Client>,
    conn: Arc<Mutex<Option<MultiplexedConnection>>>,
}

impl KvClient {
    /// Connect to Redis and run a liveness probe.
    ///
    /// Never fails: an unreachable store or invalid URL yields a client whose
    /// handle is unset, and dependants fail open.
    pub async fn connect(url: &str) -> Self {
        let client = match redis::Client::open(url) {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!("invalid Redis URL, running without ephemeral stores: {}", e);
                return Self::disconnected();
            }
        };

        let conn = match tokio::time::timeout(
            CONNECT_TIMEOUT,
            client.get_multiplexed_async_connection(),
        )
        .await
        {
            Ok(Ok(mut conn)) => {
                match redis::cmd("PING").query_async::<String>(&mut conn).await {
                    Ok(_) => {
                        tracing::info!("Redis connection established");
                        Some(conn)
                    }
                    Err(e) => {
                        tracing::warn!("Redis ping failed, continuing without it: {}", e);
                        None
                    }
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    "Redis not available, running without cache/rate-limiting: {}",
                    e
                );
                None
            }
            Err(_) => {
                tracing::warn!("Redis connection timed out, continuing without it");
                None
            }
        };

        Self {
            client: Some(client),
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// A client whose handle is permanently absent.
    pub fn disconnected() -> Self {
        Self {
            client: None,
            conn: Arc::new(Mutex::new(None)),
        }
    }

    /// Get the live connection, reconnecting once if it was dropped.
    ///
    /// Returns `None` when the store is unreachable; callers apply their
    /// fail-open policy.
    pub async fn handle(&self) -> Option<MultiplexedConnection> {
        if let Some(conn) = self.conn.lock().await.as_ref() {
            return Some(conn.clone());
        }

        let client = self.client.as_ref()?;

        // Connect without holding the lock: callers racing through an outage
        // each make one bounded attempt and then fail open, instead of
        // queueing behind whichever caller reconnects first.
        match tokio::time::timeout(CONNECT_TIMEOUT, client.get_multiplexed_async_connection())
            .await
        {
            Ok(Ok(conn)) => {
                let mut guard = self.conn.lock().await;
                if let Some(existing) = guard.as_ref() {
                    return Some(existing.clone());
                }
                tracing::info!("Redis connection re-established");
                *guard = Some(conn.clone());
                Some(conn)
            }
            Ok(Err(e)) => {
                tracing::debug!("Redis reconnect failed: {}", e);
                None
            }
            Err(_) => {
                tracing::debug!("Redis reconnect timed out");
                None
            }
        }
    }

    /// Drop the cached connection so the next use reconnects.
    ///
    /// Stores call this after a command error, since the multiplexed
    /// connection may be wedged on a dead socket.
    pub async fn reset(&self) {
        *self.conn.lock().await = None;
    }

    /// Liveness probe for health checks.
    pub async fn ping(&self) -> bool {
        let Some(mut conn) = self.handle().await else {
            return false;
        };

        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disconnected_client_has_no_handle() {
        let kv = KvClient::disconnected();
        assert!(kv.handle().await.is_none());
    }

    #[tokio::test]
    async fn disconnected_client_fails_ping() {
        let kv = KvClient::disconnected();
        assert!(!kv.ping().await);
    }

    #[tokio::test]
    async fn invalid_url_degrades_to_disconnected() {
        let kv = KvClient::connect("not-a-redis-url").await;
        assert!(kv.handle().await.is_none());
    }

    #[tokio::test]
    async fn reset_is_a_noop_when_disconnected() {
        let kv = KvClient::disconnected();
        kv.reset().await;
        assert!(kv.handle().await.is_none());
    }

    #[tokio::test]
    async fn concurrent_callers_do_not_queue_behind_one_reconnect() {
        // A listener that accepts and then stays silent, so each reconnect
        // attempt blocks until CONNECT_TIMEOUT instead of failing fast.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let kv = KvClient {
            client: Some(redis::Client::open(format!("redis://{addr}")).unwrap()),
            conn: Arc::new(Mutex::new(None)),
        };

        // Three callers at once must each get their one bounded attempt in
        // parallel; queueing would take three timeouts back to back.
        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..3 {
            let kv = kv.clone();
            tasks.spawn(async move { kv.handle().await });
        }

        let all = async {
            while let Some(result) = tasks.join_next().await {
                result.unwrap();
            }
        };
        tokio::time::timeout(CONNECT_TIMEOUT * 2, all)
            .await
            .expect("callers serialized on the connection lock");
    }
}
