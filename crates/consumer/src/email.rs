//! Email sending over SMTP (lettre).

use anyhow::Result;
use lettre::{
    Message, SmtpTransport, Transport,
    message::{Mailbox, header::ContentType},
};

use shared::queue::NotificationMessage;

/// Email sender abstraction; mocked in handler tests.
#[cfg_attr(test, mockall::automock)]
pub trait EmailSender: Send + Sync {
    /// Render and send the notification to its recipient.
    fn send(&self, message: &NotificationMessage) -> Result<()>;
}

/// SMTP sender using lettre.
pub struct SmtpSender {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpSender {
    pub fn new(smtp_url: &str, from: &str) -> Result<Self> {
        let transport = SmtpTransport::from_url(smtp_url)?.build();
        let from = Mailbox::new(Some("bankd".to_owned()), from.parse()?);

        Ok(Self { transport, from })
    }
}

impl EmailSender for SmtpSender {
    fn send(&self, message: &NotificationMessage) -> Result<()> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(Mailbox::new(None, message.email.parse()?))
            .subject(format!("bankd - {}", message.event))
            .header(ContentType::TEXT_PLAIN)
            .body(format!(
                "Hello {} {},\n\nEvent: {}\nRegistered at: {}\n\nThank you for using bankd.",
                message.first_name, message.last_name, message.event, message.registered_at
            ))?;

        self.transport.send(&email)?;

        Ok(())
    }
}
