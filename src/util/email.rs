use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{error, info, instrument};

use crate::config::{ConfigError, EmailConfig};
use crate::model::otp::OtpPurpose;
use crate::model::user::Role;

/// Email service errors
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("SMTP error: {0}")]
    SmtpError(String),

    #[error("Message building error: {0}")]
    MessageError(String),

    #[error("Address error: {0}")]
    AddressError(String),
}

impl From<ConfigError> for EmailError {
    fn from(err: ConfigError) -> Self {
        EmailError::ConfigError(err.to_string())
    }
}

/// Email message builder
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text_body: Option<String>,
    pub html_body: Option<String>,
}

impl EmailMessage {
    pub fn new(to: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            text_body: None,
            html_body: None,
        }
    }

    pub fn with_text_body(mut self, body: String) -> Self {
        self.text_body = Some(body);
        self
    }

    pub fn with_html_body(mut self, body: String) -> Self {
        self.html_body = Some(body);
        self
    }
}

/// Summary of a generated report sent to its recipients
#[derive(Debug, Clone)]
pub struct ReportMail {
    pub report_id: String,
    pub report_type: String,
    pub start_date: String,
    pub end_date: String,
    pub total_incidents: i64,
    pub download_url: String,
}

/// Outgoing mail used by the auth and report flows
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_credentials(
        &self,
        to: &str,
        name: &str,
        username: &str,
        password: &str,
        role: Role,
    ) -> Result<(), EmailError>;

    async fn send_otp(&self, to: &str, code: &str, purpose: OtpPurpose) -> Result<(), EmailError>;

    async fn send_report(&self, to: &str, report: &ReportMail) -> Result<(), EmailError>;
}

/// SMTP email service implementation
pub struct SmtpEmailService {
    pub config: EmailConfig,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpEmailService {
    /// Create a new SMTP email service
    #[instrument(skip(config), fields(host = %config.smtp_host, port = config.smtp_port))]
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        info!("Initializing SMTP email service");

        config.validate().map_err(EmailError::from)?;

        let mut transport_builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
            .port(config.smtp_port)
            .timeout(Some(std::time::Duration::from_secs(config.connection_timeout_secs)));

        if config.use_tls {
            let tls_parameters = TlsParameters::new(config.smtp_host.clone())
                .map_err(|e| EmailError::ConfigError(format!("TLS configuration error: {}", e)))?;

            if config.use_starttls {
                transport_builder = transport_builder.tls(Tls::Required(tls_parameters));
            } else {
                transport_builder = transport_builder.tls(Tls::Wrapper(tls_parameters));
            }
        } else {
            transport_builder = transport_builder.tls(Tls::None);
        }

        if !config.smtp_username.is_empty() && !config.smtp_password.is_empty() {
            let credentials = Credentials::new(config.smtp_username.clone(), config.smtp_password.clone());
            transport_builder = transport_builder.credentials(credentials);
        }

        let transport = transport_builder.build();

        info!("SMTP email service initialized successfully");
        Ok(Self { config, transport })
    }

    /// Send an email message
    #[instrument(skip(self, message), fields(to = %message.to, subject = %message.subject))]
    pub async fn send_email(&self, message: EmailMessage) -> Result<(), EmailError> {
        validate_email_address(&message.to)?;

        let email_message = self.build_message(message)?;

        self.transport.send(email_message).await.map_err(|e| {
            error!("Failed to send email: {}", e);
            EmailError::SmtpError(format!("Failed to send email: {}", e))
        })?;

        info!("Email sent successfully");
        Ok(())
    }

    fn build_message(&self, email_message: EmailMessage) -> Result<Message, EmailError> {
        let from_mailbox: Mailbox = format!("{} <{}>", self.config.from_name, self.config.from_email)
            .parse()
            .map_err(|e| EmailError::AddressError(format!("Invalid from address: {}", e)))?;

        let to_mailbox: Mailbox = email_message
            .to
            .parse()
            .map_err(|e| EmailError::AddressError(format!("Invalid to address: {}", e)))?;

        let message_builder = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(&email_message.subject);

        match (email_message.text_body, email_message.html_body) {
            (Some(text), Some(html)) => message_builder
                .multipart(
                    MultiPart::alternative()
                        .singlepart(SinglePart::builder().header(ContentType::TEXT_PLAIN).body(text))
                        .singlepart(SinglePart::builder().header(ContentType::TEXT_HTML).body(html)),
                )
                .map_err(|e| EmailError::MessageError(format!("Failed to build multipart message: {}", e))),
            (Some(text), None) => message_builder
                .body(text)
                .map_err(|e| EmailError::MessageError(format!("Failed to build text message: {}", e))),
            (None, Some(html)) => message_builder
                .singlepart(SinglePart::builder().header(ContentType::TEXT_HTML).body(html))
                .map_err(|e| EmailError::MessageError(format!("Failed to build HTML message: {}", e))),
            (None, None) => Err(EmailError::MessageError("No message body provided".to_string())),
        }
    }
}

#[async_trait]
impl Mailer for SmtpEmailService {
    #[instrument(skip(self, password), fields(to = %to, role = %role))]
    async fn send_credentials(
        &self,
        to: &str,
        name: &str,
        username: &str,
        password: &str,
        role: Role,
    ) -> Result<(), EmailError> {
        let (text, html) = credentials_template(name, username, password, role, &self.config.dashboard_url);
        let message = EmailMessage::new(to, "Your Swachhta Prahari account")
            .with_text_body(text)
            .with_html_body(html);
        self.send_email(message).await
    }

    #[instrument(skip(self, code), fields(to = %to, purpose = ?purpose))]
    async fn send_otp(&self, to: &str, code: &str, purpose: OtpPurpose) -> Result<(), EmailError> {
        let (text, html) = otp_template(code, purpose);
        let message = EmailMessage::new(to, "Your verification code")
            .with_text_body(text)
            .with_html_body(html);
        self.send_email(message).await
    }

    #[instrument(skip(self, report), fields(to = %to, report_id = %report.report_id))]
    async fn send_report(&self, to: &str, report: &ReportMail) -> Result<(), EmailError> {
        let (text, html) = report_template(report);
        let message = EmailMessage::new(to, format!("Swachhta Prahari report {}", report.report_id))
            .with_text_body(text)
            .with_html_body(html);
        self.send_email(message).await
    }
}

pub fn validate_email_address(email: &str) -> Result<(), EmailError> {
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(EmailError::AddressError("Invalid email format".to_string()));
    }
    Ok(())
}

fn credentials_template(name: &str, username: &str, password: &str, role: Role, dashboard_url: &str) -> (String, String) {
    let text = format!(
        r#"Hello {name},

An account has been created for you on the Swachhta Prahari dashboard.

Username: {username}
Password: {password}
Role: {role}

Sign in at {dashboard_url} and change your password after the first login.

---
This is an automated message. Please do not reply to this email."#
    );

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; color: #333;">
  <h2>Welcome to Swachhta Prahari</h2>
  <p>Hello {name},</p>
  <p>An account has been created for you on the dashboard.</p>
  <table>
    <tr><td><strong>Username</strong></td><td>{username}</td></tr>
    <tr><td><strong>Password</strong></td><td>{password}</td></tr>
    <tr><td><strong>Role</strong></td><td>{role}</td></tr>
  </table>
  <p><a href="{dashboard_url}">Open the dashboard</a> and change your password after the first login.</p>
</body>
</html>"#,
        name = html_escape::encode_text(name),
        username = html_escape::encode_text(username),
        password = html_escape::encode_text(password),
        role = role,
        dashboard_url = html_escape::encode_double_quoted_attribute(dashboard_url),
    );

    (text, html)
}

fn otp_template(code: &str, purpose: OtpPurpose) -> (String, String) {
    let action = match purpose {
        OtpPurpose::Signup => "complete your signup",
        OtpPurpose::Login => "sign in",
        OtpPurpose::ForgotPassword => "reset your password",
    };

    let text = format!(
        "Use the code {code} to {action}.\n\nThe code expires in 10 minutes. If you did not request it, ignore this email."
    );
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; color: #333;">
  <p>Use the code below to {action}.</p>
  <p style="font-size: 28px; letter-spacing: 6px;"><strong>{code}</strong></p>
  <p>The code expires in 10 minutes. If you did not request it, ignore this email.</p>
</body>
</html>"#,
        code = html_escape::encode_text(code),
    );

    (text, html)
}

fn report_template(report: &ReportMail) -> (String, String) {
    let text = format!(
        r#"Report {id} ({kind}) is ready.

Period: {start} to {end}
Incidents: {total}

Download: {url}"#,
        id = report.report_id,
        kind = report.report_type,
        start = report.start_date,
        end = report.end_date,
        total = report.total_incidents,
        url = report.download_url,
    );

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; color: #333;">
  <h2>Report {id}</h2>
  <p>Type: {kind}<br>Period: {start} to {end}<br>Incidents: {total}</p>
  <p><a href="{url}">Download the report</a></p>
</body>
</html>"#,
        id = html_escape::encode_text(&report.report_id),
        kind = html_escape::encode_text(&report.report_type),
        start = html_escape::encode_text(&report.start_date),
        end = html_escape::encode_text(&report.end_date),
        total = report.total_incidents,
        url = html_escape::encode_double_quoted_attribute(&report.download_url),
    );

    (text, html)
}
