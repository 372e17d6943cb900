// # SMTP Notifier
//
// This crate provides an email Notifier for citewatch.
//
// ## Transport
//
// - Port 465: implicit TLS
// - Any other port: STARTTLS, required before credentials are sent
//
// The sender address doubles as the SMTP username. For Gmail accounts with
// 2FA the password must be an app password.
//
// ## Error Mapping
//
// | SMTP reply            | NotifyError         |
// |-----------------------|---------------------|
// | 530, 534, 535, 538    | Auth                |
// | 550, 551, 553, 554    | RecipientRejected   |
// | anything else / none  | Connection          |

use citewatch_core::config::SmtpConfig;
use citewatch_core::error::NotifyError;
use citewatch_core::message::NotificationMessage;
use citewatch_core::traits::Notifier;
use citewatch_core::{Error, Result};

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;

/// Port that speaks TLS from the first byte
const IMPLICIT_TLS_PORT: u16 = 465;

/// Upper bound for one SMTP conversation step
const SMTP_TIMEOUT_SECS: u64 = 30;

/// Email notifier over SMTP
pub struct SmtpNotifier {
    /// Configured transport
    transport: AsyncSmtpTransport<Tokio1Executor>,

    /// Envelope and header sender
    sender: Mailbox,

    /// Notification destination
    receiver: Mailbox,
}

impl SmtpNotifier {
    /// Create a notifier from mail settings
    ///
    /// Validates the settings and both addresses. No connection is opened
    /// until the first notification.
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        config.validate()?;

        let sender: Mailbox = config
            .sender
            .trim()
            .parse()
            .map_err(|e| Error::config(format!("Invalid sender email {:?}: {}", config.sender, e)))?;
        let receiver: Mailbox = config.receiver.trim().parse().map_err(|e| {
            Error::config(format!("Invalid receiver email {:?}: {}", config.receiver, e))
        })?;

        let builder = if config.port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.server)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.server)
        }
        .map_err(|e| Error::config(format!("Invalid SMTP server {}: {}", config.server, e)))?;

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(
                config.sender.trim().to_string(),
                config.password.clone(),
            ))
            .timeout(Some(Duration::from_secs(SMTP_TIMEOUT_SECS)))
            .build();

        tracing::debug!(
            "SMTP notifier configured for {}:{} ({} -> {})",
            config.server,
            config.port,
            sender,
            receiver
        );

        Ok(Self {
            transport,
            sender,
            receiver,
        })
    }

    /// Build the email for a notification
    fn build_email(&self, message: &NotificationMessage) -> std::result::Result<Message, NotifyError> {
        Message::builder()
            .from(self.sender.clone())
            .to(self.receiver.clone())
            .subject(message.subject())
            .header(ContentType::TEXT_PLAIN)
            .body(message.body())
            .map_err(|e| NotifyError::connection(format!("Failed to build email: {}", e)))
    }
}

#[async_trait::async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(&self, message: &NotificationMessage) -> std::result::Result<(), NotifyError> {
        let email = self.build_email(message)?;

        tracing::info!("Sending email to {}", self.receiver);
        self.transport
            .send(email)
            .await
            .map_err(|e| classify_smtp_error(&e))?;

        tracing::info!("Email sent successfully");
        Ok(())
    }

    fn notifier_name(&self) -> &'static str {
        "smtp"
    }
}

/// Map a transport error onto the notifier error kinds
fn classify_smtp_error(err: &lettre::transport::smtp::Error) -> NotifyError {
    let code = err.status().and_then(|code| code.to_string().parse::<u16>().ok());
    match code {
        Some(code) => classify_reply(code, err.to_string()),
        None if err.is_timeout() => NotifyError::connection(format!("SMTP timeout: {}", err)),
        None => NotifyError::connection(err.to_string()),
    }
}

/// Map an SMTP reply code onto the notifier error kinds
fn classify_reply(code: u16, detail: String) -> NotifyError {
    match code {
        530 | 534 | 535 | 538 => NotifyError::auth(detail),
        550 | 551 | 553 | 554 => NotifyError::recipient_rejected(detail),
        _ => NotifyError::connection(detail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SmtpConfig {
        SmtpConfig {
            server: "smtp.example.org".into(),
            port: 587,
            sender: "watcher@example.org".into(),
            password: "app-password".into(),
            receiver: "me@example.org".into(),
        }
    }

    #[test]
    fn test_new_accepts_valid_config() {
        assert!(SmtpNotifier::new(&config()).is_ok());

        let mut implicit_tls = config();
        implicit_tls.port = 465;
        assert!(SmtpNotifier::new(&implicit_tls).is_ok());
    }

    #[test]
    fn test_new_rejects_bad_addresses() {
        let mut bad_sender = config();
        bad_sender.sender = "not an address".into();
        let err = SmtpNotifier::new(&bad_sender).err().expect("sender rejected");
        assert!(err.is_fatal());

        let mut bad_receiver = config();
        bad_receiver.receiver = "@@".into();
        assert!(SmtpNotifier::new(&bad_receiver).is_err());
    }

    #[test]
    fn test_new_rejects_missing_password() {
        let mut cfg = config();
        cfg.password.clear();
        assert!(matches!(SmtpNotifier::new(&cfg), Err(Error::Config(_))));
    }

    #[test]
    fn test_build_email() {
        let notifier = SmtpNotifier::new(&config()).unwrap();
        let message = NotificationMessage::new("Ada Lovelace", "ID: abc", Some(40), 42);

        let email = notifier.build_email(&message).unwrap();
        let raw = String::from_utf8(email.formatted()).unwrap();

        assert!(raw.contains("Subject: Citation Increase for Ada Lovelace (+2)"));
        assert!(raw.contains("From: watcher@example.org"));
        assert!(raw.contains("To: me@example.org"));
        assert!(raw.contains("previously 40, increase of 2"));
    }

    #[test]
    fn test_classify_reply() {
        assert_eq!(classify_reply(535, "bad".into()).kind(), "auth");
        assert_eq!(classify_reply(530, "auth required".into()).kind(), "auth");
        assert_eq!(classify_reply(550, "no mailbox".into()).kind(), "recipient_rejected");
        assert_eq!(classify_reply(553, "bad address".into()).kind(), "recipient_rejected");
        assert_eq!(classify_reply(421, "closing".into()).kind(), "connection");
        assert_eq!(classify_reply(451, "try later".into()).kind(), "connection");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_connection_error() {
        let mut cfg = config();
        cfg.server = "127.0.0.1".into();
        cfg.port = 1;
        let notifier = SmtpNotifier::new(&cfg).unwrap();

        let message = NotificationMessage::new("Ada", "ID: abc", None, 1);
        let err = notifier.notify(&message).await.unwrap_err();

        assert_eq!(err.kind(), "connection");
    }
}
