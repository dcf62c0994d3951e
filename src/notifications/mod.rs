//! Task-assignment notifications.
//!
//! The gateway hands a [`NotificationRequest`] to the [`NotificationDispatcher`]
//! after a task mutation has been stored. Dispatch is a single attempt whose
//! outcome is returned as a value: transport errors, and a panicking
//! transport, end up in [`DispatchOutcome::message`] and never reach the
//! caller as an error.

mod smtp;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

pub use smtp::{SmtpConfig, SmtpMailer};

/// One assignment email to send. Never persisted, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationRequest {
    pub recipient: String,
    pub task_title: String,
    pub assigned_by: String,
}

impl NotificationRequest {
    pub fn new(recipient: impl Into<String>, task_title: impl Into<String>, assigned_by: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            task_title: task_title.into(),
            assigned_by: assigned_by.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchOutcome {
    pub succeeded: bool,
    pub status_code: u16,
    pub message: String,
}

impl DispatchOutcome {
    pub fn sent() -> Self {
        Self {
            succeeded: true,
            status_code: 200,
            message: "Email sent successfully.".to_string(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            status_code: 500,
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The SMTP exchange failed: connection, TLS, authentication or rejection.
    #[error("{0}")]
    Smtp(String),

    #[error("invalid email address: {0}")]
    Address(String),

    #[error("failed to build message: {0}")]
    Message(String),
}

/// Delivery channel for assignment emails.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, request: &NotificationRequest) -> Result<(), NotifyError>;
}

pub struct NotificationDispatcher {
    transport: Arc<dyn MailTransport>,
}

impl NotificationDispatcher {
    pub fn new(transport: Arc<dyn MailTransport>) -> Self {
        Self { transport }
    }

    #[tracing::instrument(name = "notify_assignment", skip(self, request), fields(recipient = %request.recipient))]
    pub async fn dispatch(&self, request: &NotificationRequest) -> DispatchOutcome {
        let transport = Arc::clone(&self.transport);
        let owned = request.clone();

        // Run on its own task so a panicking transport is reported as a
        // JoinError instead of unwinding through the request handler.
        let joined = tokio::spawn(async move { transport.send(&owned).await }).await;

        let outcome = match joined {
            Ok(Ok(())) => DispatchOutcome::sent(),
            Ok(Err(NotifyError::Smtp(err))) => DispatchOutcome::failed(format!("SMTP Error: {err}")),
            Ok(Err(err)) => DispatchOutcome::failed(format!("Error: {err}")),
            Err(join_err) => DispatchOutcome::failed(format!("Error: {join_err}")),
        };

        if outcome.succeeded {
            tracing::info!("assignment email sent");
        } else {
            tracing::warn!(message = %outcome.message, "assignment email failed");
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<NotificationRequest>>,
    }

    #[async_trait]
    impl MailTransport for Recorder {
        async fn send(&self, request: &NotificationRequest) -> Result<(), NotifyError> {
            self.sent.lock().unwrap().push(request.clone());
            Ok(())
        }
    }

    struct Refusing(fn() -> NotifyError);

    #[async_trait]
    impl MailTransport for Refusing {
        async fn send(&self, _request: &NotificationRequest) -> Result<(), NotifyError> {
            Err((self.0)())
        }
    }

    struct Exploding;

    #[async_trait]
    impl MailTransport for Exploding {
        async fn send(&self, _request: &NotificationRequest) -> Result<(), NotifyError> {
            panic!("transport exploded");
        }
    }

    fn request() -> NotificationRequest {
        NotificationRequest::new("dev@example.com", "Ship it", "lead")
    }

    #[tokio::test]
    async fn successful_dispatch_reports_sent() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = NotificationDispatcher::new(recorder.clone());

        let outcome = dispatcher.dispatch(&request()).await;

        assert_eq!(outcome, DispatchOutcome::sent());
        assert_eq!(recorder.sent.lock().unwrap().as_slice(), &[request()]);
    }

    #[tokio::test]
    async fn smtp_failures_are_contained() {
        let dispatcher = NotificationDispatcher::new(Arc::new(Refusing(|| {
            NotifyError::Smtp("535 authentication failed".to_string())
        })));

        let outcome = dispatcher.dispatch(&request()).await;

        assert!(!outcome.succeeded);
        assert_eq!(outcome.status_code, 500);
        assert_eq!(outcome.message, "SMTP Error: 535 authentication failed");
    }

    #[tokio::test]
    async fn other_failures_are_contained() {
        let dispatcher = NotificationDispatcher::new(Arc::new(Refusing(|| {
            NotifyError::Address("not-an-address".to_string())
        })));

        let outcome = dispatcher.dispatch(&request()).await;

        assert!(!outcome.succeeded);
        assert!(outcome.message.starts_with("Error: "));
        assert!(outcome.message.contains("not-an-address"));
    }

    #[tokio::test]
    async fn panicking_transport_is_contained() {
        let dispatcher = NotificationDispatcher::new(Arc::new(Exploding));

        let outcome = dispatcher.dispatch(&request()).await;

        assert!(!outcome.succeeded);
        assert_eq!(outcome.status_code, 500);
        assert!(outcome.message.starts_with("Error: "));
    }
}
