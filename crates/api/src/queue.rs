//! Durable message publishing to the notification broker.
//!
//! Fire-and-forget: by the time a handler publishes, its business effect has
//! already committed, so a broker failure is logged and swallowed - it never
//! fails or rolls back the request. The queue is declared durable on every
//! publish (idempotent) and messages are sent with persistent delivery so
//! they survive a broker restart. One channel is held and reused; a stale
//! channel or connection triggers a single transparent reconnect.

use async_trait::async_trait;
use lapin::options::{BasicPublishOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use tokio::sync::Mutex;

use shared::queue::NotificationMessage;

/// Publisher trait for queued notification events.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Enqueue a message. Returns whether the publish succeeded; failures
    /// are logged, never propagated.
    async fn publish(&self, queue: &str, message: &NotificationMessage) -> bool;
}

struct Link {
    connection: Connection,
    channel: Channel,
}

impl Link {
    fn is_usable(&self) -> bool {
        self.connection.status().connected() && self.channel.status().connected()
    }
}

/// AMQP implementation of EventPublisher.
pub struct AmqpPublisher {
    url: String,
    link: Mutex<Option<Link>>,
}

impl AmqpPublisher {
    /// Create a publisher. The connection is established lazily on first
    /// publish, so a down broker does not block process startup.
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            link: Mutex::new(None),
        }
    }

    /// Return the reusable channel, reconnecting if necessary.
    async fn channel(&self) -> anyhow::Result<Channel> {
        let mut guard = self.link.lock().await;

        if let Some(link) = guard.as_ref() {
            if link.is_usable() {
                return Ok(link.channel.clone());
            }
        }

        let connection = Connection::connect(&self.url, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;
        let reusable = channel.clone();

        *guard = Some(Link { connection, channel });

        Ok(reusable)
    }

    async fn try_publish(&self, queue: &str, message: &NotificationMessage) -> anyhow::Result<()> {
        let channel = self.channel().await?;

        channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        let body = serde_json::to_vec(message)?;

        channel
            .basic_publish(
                "",
                queue,
                BasicPublishOptions::default(),
                &body,
                // delivery_mode 2 = persistent
                BasicProperties::default().with_delivery_mode(2),
            )
            .await?
            .await?;

        Ok(())
    }
}

#[async_trait]
impl EventPublisher for AmqpPublisher {
    async fn publish(&self, queue: &str, message: &NotificationMessage) -> bool {
        match self.try_publish(queue, message).await {
            Ok(()) => {
                tracing::info!(queue, event = %message.event, "published message");
                true
            }
            Err(e) => {
                tracing::warn!(queue, "failed to publish message: {}", e);
                // Force a fresh connection on the next attempt.
                *self.link.lock().await = None;
                false
            }
        }
    }
}
