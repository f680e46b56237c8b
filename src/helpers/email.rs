use async_trait::async_trait;
use lettre::{
    address::AddressError,
    message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::{self, authentication::Credentials},
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};

use crate::config::MailConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("failed to read attachment: {0}")]
    Attachment(#[from] std::io::Error),

    #[error("invalid email address: {0}")]
    Address(#[from] AddressError),

    #[error("failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("invalid content type: {0}")]
    ContentType(String),

    #[error("SMTP error: {0}")]
    Transport(#[from] smtp::Error),
}

/// Delivers one message with a file attachment.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        attachment_path: &Path,
    ) -> Result<(), MailError>;
}

/// Sends through the configured relay, one STARTTLS session per message.
pub struct SmtpMailer<'a> {
    config: &'a MailConfig,
}

impl<'a> SmtpMailer<'a> {
    pub fn new(config: &'a MailConfig) -> Self {
        info!(
            "Creating SMTP mailer for relay {}:{}",
            config.smtp_server, config.smtp_port
        );
        Self { config }
    }

    fn build_message(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        attachment_path: &Path,
    ) -> Result<Message, MailError> {
        let content = std::fs::read(attachment_path)?;
        let filename = attachment_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Payslip.pdf".to_string());
        let content_type = ContentType::parse("application/pdf")
            .map_err(|e| MailError::ContentType(e.to_string()))?;

        info!(
            "Attaching {} ({} bytes) for {}",
            filename,
            content.len(),
            to
        );

        let message = Message::builder()
            .from(self.config.email_address.parse::<Mailbox>()?)
            .to(to.parse::<Mailbox>()?)
            .subject(subject)
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(body.to_string()))
                    .singlepart(Attachment::new(filename).body(content, content_type)),
            )?;

        Ok(message)
    }
}

#[async_trait]
impl Mailer for SmtpMailer<'_> {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        attachment_path: &Path,
    ) -> Result<(), MailError> {
        let message = self.build_message(to, subject, body, attachment_path)?;

        let transport =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_server)?
                .port(self.config.smtp_port)
                .credentials(Credentials::new(
                    self.config.email_address.clone(),
                    self.config.app_password.clone(),
                ))
                .build();

        let response = transport.send(message).await?;
        info!("Relay accepted message for {}: {:?}", to, response.code());
        Ok(())
    }
}

/// Sends one payslip and reports whether it went out. Failures are logged
/// with the recipient and never propagated.
pub async fn notify<M: Mailer + ?Sized>(
    mailer: &M,
    to: &str,
    subject: &str,
    body: &str,
    attachment_path: &Path,
) -> Result<(), String> {
    match mailer.send(to, subject, body, attachment_path).await {
        Ok(()) => {
            info!("Email sent to {}", to);
            Ok(())
        }
        Err(e) => {
            error!("Error sending email to {}: {}", to, e);
            Err(e.to_string())
        }
    }
}
