//! Delivery handling, separated from the AMQP plumbing so it can be tested
//! with a mocked sender.
//!
//! The rules:
//! - unparseable body: drop without requeue, it will never parse
//! - missing recipient: drop without requeue, it can never be delivered
//! - send failure: requeue, SMTP trouble is usually transient
//! - success: ack

use shared::queue::NotificationMessage;

use crate::email::EmailSender;

/// What to do with a delivery after processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Acknowledge; the message is done.
    Ack,
    /// Reject without requeue; the message can never succeed.
    Drop,
    /// Reject with requeue; a later attempt may succeed.
    Requeue,
}

pub fn process(body: &[u8], sender: &dyn EmailSender) -> Disposition {
    let message: NotificationMessage = match serde_json::from_slice(body) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!("dropping malformed message: {}", e);
            return Disposition::Drop;
        }
    };

    if message.email.is_empty() {
        tracing::warn!(event = %message.event, "dropping message without recipient");
        return Disposition::Drop;
    }

    match sender.send(&message) {
        Ok(()) => {
            tracing::info!(event = %message.event, email = %message.email, "email sent");
            Disposition::Ack
        }
        Err(e) => {
            tracing::warn!(
                event = %message.event,
                email = %message.email,
                "send failed, requeueing: {}", e
            );
            Disposition::Requeue
        }
    }
}
