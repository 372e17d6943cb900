// # Notifier Trait
//
// Defines the interface for delivering a citation increase notification.
//
// ## Implementations
//
// - SMTP email: `citewatch-notify-smtp` crate

use async_trait::async_trait;

use crate::error::NotifyError;
use crate::message::NotificationMessage;

/// Trait for notification transports
///
/// A successful return means the transport accepted the whole message.
/// Anything short of that must be reported as a [`NotifyError`] so the
/// engine keeps its stored count and tries again next cycle.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one notification
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The message was accepted by the transport
    /// - `Err(NotifyError)`: Auth, Connection or RecipientRejected
    async fn notify(&self, message: &NotificationMessage) -> Result<(), NotifyError>;

    /// Name of the notifier, for logs
    fn notifier_name(&self) -> &'static str;
}
