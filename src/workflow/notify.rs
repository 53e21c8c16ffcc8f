use tracing::{info, warn};

/// Outbound message handed to the notification dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipients: Vec<u64>,
    pub subject: String,
    pub lines: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Writes notifications to the log; delivery belongs to the mail service.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        info!(
            recipients = ?notification.recipients,
            subject = %notification.subject,
            details = ?notification.lines,
            "Notification queued"
        );
        Ok(())
    }
}

pub(crate) fn dispatch(notifier: &dyn Notifier, notification: Notification) {
    if notification.recipients.is_empty() {
        return;
    }
    let subject = notification.subject.clone();
    if let Err(e) = notifier.notify(notification) {
        warn!(error = %e, subject = %subject, "Notification dropped");
    }
}
