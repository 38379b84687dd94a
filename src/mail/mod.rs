//! Mail composition and delivery.
//!
//! The digest goes out as a single UTF-8 plain-text message through an
//! SMTP relay, usually the MTA on the local host.

use lettre::address::AddressError;
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, Mailboxes};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised while composing or sending the digest mail.
#[derive(Error, Debug)]
pub enum MailError {
    #[error("Invalid mail address '{address}': {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: AddressError,
    },

    #[error("No recipients given")]
    NoRecipients,

    #[error("Failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("Failed to send message via {host}:{port}: {source}")]
    Send {
        host: String,
        port: u16,
        #[source]
        source: lettre::transport::smtp::Error,
    },
}

/// SMTP relay settings.
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
}

/// Compose the digest message.
///
/// `to` may hold several comma-separated mailboxes.
pub fn compose_message(subject: &str, from: &str, to: &str, body: String) -> Result<Message, MailError> {
    let from_mailbox: Mailbox = from.parse().map_err(|source| MailError::InvalidAddress {
        address: from.to_string(),
        source,
    })?;

    let recipients: Mailboxes = to.parse().map_err(|source| MailError::InvalidAddress {
        address: to.to_string(),
        source,
    })?;

    let mut builder = Message::builder()
        .from(from_mailbox)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN);

    let mut count = 0;
    for recipient in recipients {
        builder = builder.to(recipient);
        count += 1;
    }
    if count == 0 {
        return Err(MailError::NoRecipients);
    }

    debug!("Composed message for {} recipient(s)", count);
    Ok(builder.body(body)?)
}

/// Deliver a composed message through the SMTP relay.
pub async fn send_message(settings: &SmtpSettings, message: Message) -> Result<(), MailError> {
    info!("Sending digest via {}:{}", settings.host, settings.port);

    let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
        .port(settings.port)
        .build();

    let response = transport
        .send(message)
        .await
        .map_err(|source| MailError::Send {
            host: settings.host.clone(),
            port: settings.port,
            source,
        })?;

    debug!("SMTP response code: {}", response.code());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FROM: &str = "LQFB Announce <announce@lqfb.example.org>";

    #[test]
    fn test_compose_message_headers() {
        let message = compose_message(
            "LQFB Zusammenfassung (05.03.2024)",
            FROM,
            "list@example.org",
            "Hallo".to_string(),
        )
        .unwrap();

        assert_eq!(
            message.headers().get_raw("Subject"),
            Some("LQFB Zusammenfassung (05.03.2024)")
        );
        assert_eq!(message.envelope().to().len(), 1);

        let formatted = String::from_utf8(message.formatted()).unwrap();
        assert!(formatted.contains("text/plain; charset=utf-8"));
    }

    #[test]
    fn test_compose_message_multiple_recipients() {
        let message = compose_message(
            "Subject",
            FROM,
            "a@example.org, Bob <b@example.org>",
            "Body".to_string(),
        )
        .unwrap();

        assert_eq!(message.envelope().to().len(), 2);
    }

    #[test]
    fn test_compose_message_invalid_from() {
        let err = compose_message("Subject", "not an address", "a@example.org", String::new())
            .unwrap_err();

        assert!(matches!(err, MailError::InvalidAddress { ref address, .. } if address == "not an address"));
    }

    #[test]
    fn test_compose_message_without_recipients() {
        let err = compose_message("Subject", FROM, "", String::new()).unwrap_err();
        assert!(matches!(
            err,
            MailError::NoRecipients | MailError::InvalidAddress { .. }
        ));
    }
}
