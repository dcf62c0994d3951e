use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{MailTransport, NotificationRequest, NotifyError};
use crate::errors::AppError;

const DEFAULT_HOST: &str = "smtp.gmail.com";
const DEFAULT_PORT: u16 = 465;
const DEFAULT_FROM_ADDRESS: &str = "no-reply@localhost";
const DEFAULT_DASHBOARD_URL: &str = "http://127.0.0.1:8000/auth/login/";
const FROM_NAME: &str = "Task Management";

/// SMTP settings for assignment emails.
///
/// Credentials may be empty; the send is still attempted and fails at the
/// server rather than being skipped locally.
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
    pub dashboard_url: String,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .field("dashboard_url", &self.dashboard_url)
            .finish()
    }
}

impl SmtpConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let host = std::env::var("EMAIL_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let port = std::env::var("EMAIL_PORT")
            .map(|val| val.parse::<u16>())
            .unwrap_or(Ok(DEFAULT_PORT))
            .map_err(|_| AppError::configuration("EMAIL_PORT must be a valid port number"))?;
        let username = std::env::var("EMAIL_HOST_USER").unwrap_or_default();
        let password = std::env::var("EMAIL_HOST_PASSWORD").unwrap_or_default();
        let from_address = std::env::var("EMAIL_FROM_ADDRESS")
            .ok()
            .filter(|value| !value.is_empty())
            .or_else(|| Some(username.clone()).filter(|value| !value.is_empty()))
            .unwrap_or_else(|| DEFAULT_FROM_ADDRESS.to_string());
        let dashboard_url =
            std::env::var("EMAIL_DASHBOARD_URL").unwrap_or_else(|_| DEFAULT_DASHBOARD_URL.to_string());

        Ok(Self {
            host,
            port,
            username,
            password,
            from_address,
            dashboard_url,
        })
    }
}

pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Self {
        tracing::debug!(host = %config.host, port = config.port, "SMTP mailer configured");
        Self { config }
    }

    pub fn subject(request: &NotificationRequest) -> String {
        format!("📌 New Task Assigned: {}", request.task_title)
    }

    pub fn render_text(&self, request: &NotificationRequest) -> String {
        format!(
            "Hello,\n\n\
             You have been assigned a new task titled \"{}\" by {}.\n\n\
             Log in to your Task Management dashboard to view the details:\n{}\n\n\
             This is an automated message. Please do not reply to this email.",
            request.task_title, request.assigned_by, self.config.dashboard_url
        )
    }

    pub fn render_html(&self, request: &NotificationRequest) -> String {
        format!(
            r#"<html>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
  <div style="max-width: 600px; margin: 0 auto; padding: 20px; border: 1px solid #e0e0e0; border-radius: 8px;">
    <h2 style="color: #4CAF50;">🔔 Task Assignment Notification</h2>
    <p>Hello,</p>
    <p>You have been assigned a new task titled <strong style="color: #2F80ED;">{title}</strong> by <strong>{by}</strong>.</p>
    <p>Kindly log in to your Task Management Dashboard to view more details.</p>
    <a href="{url}" style="display: inline-block; padding: 10px 15px; background-color: #4CAF50; color: white; text-decoration: none; border-radius: 4px;">View Task</a>
    <p style="margin-top: 30px; font-size: 12px; color: #999;">This is an automated message. Please do not reply to this email.</p>
  </div>
</body>
</html>"#,
            title = escape_html(&request.task_title),
            by = escape_html(&request.assigned_by),
            url = self.config.dashboard_url,
        )
    }

    fn build_message(&self, request: &NotificationRequest) -> Result<Message, NotifyError> {
        let from: Mailbox = format!("{} <{}>", FROM_NAME, self.config.from_address)
            .parse()
            .map_err(|e| NotifyError::Address(format!("{e}")))?;
        let to: Mailbox = request
            .recipient
            .parse()
            .map_err(|e| NotifyError::Address(format!("{e}")))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(Self::subject(request))
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(self.render_text(request)),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(self.render_html(request)),
                    ),
            )
            .map_err(|e| NotifyError::Message(format!("{e}")))
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    #[tracing::instrument(name = "smtp_send_assignment", skip(self, request), fields(to = %request.recipient))]
    async fn send(&self, request: &NotificationRequest) -> Result<(), NotifyError> {
        let message = self.build_message(request)?;

        // Built per send so that configuration problems surface as a failed
        // dispatch rather than at startup.
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.host)
            .map_err(|e| NotifyError::Smtp(format!("{e}")))?
            .port(self.config.port)
            .credentials(Credentials::new(
                self.config.username.clone(),
                self.config.password.clone(),
            ))
            .build();

        transport
            .send(message)
            .await
            .map_err(|e| NotifyError::Smtp(format!("{e}")))?;

        Ok(())
    }
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
