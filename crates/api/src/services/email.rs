//! Invitation email delivery.
//!
//! Uses SMTP via lettre with Askama HTML and plain-text templates. Services
//! depend on the [`InvitationMailer`] trait; delivery failures are reported to
//! the caller and never roll back the invitation.

use async_trait::async_trait;
use askama::Template;
use chrono::{DateTime, Utc};
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use larder_core::{Email, HouseholdRole};

use crate::config::EmailConfig;

/// HTML template for the invitation email.
#[derive(Template)]
#[template(path = "email/invitation.html")]
struct InvitationEmailHtml<'a> {
    household_name: &'a str,
    inviter: &'a str,
    role: &'a str,
    accept_url: &'a str,
    expires_on: &'a str,
}

/// Plain text template for the invitation email.
#[derive(Template)]
#[template(path = "email/invitation.txt")]
struct InvitationEmailText<'a> {
    household_name: &'a str,
    inviter: &'a str,
    role: &'a str,
    accept_url: &'a str,
    expires_on: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// No SMTP configuration.
    #[error("email delivery is not configured")]
    Disabled,
}

/// Everything needed to notify an invitee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvitationNotice {
    pub to: Email,
    pub household_name: String,
    /// Display string for whoever sent the invitation.
    pub inviter: String,
    pub role: HouseholdRole,
    pub accept_url: String,
    pub expires_at: DateTime<Utc>,
}

/// Outbound notification collaborator.
#[async_trait]
pub trait InvitationMailer: Send + Sync {
    async fn send_invitation(&self, notice: &InvitationNotice) -> Result<(), EmailError>;
}

/// SMTP-backed mailer.
#[derive(Clone)]
pub struct SmtpMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpMailer {
    /// Create a new mailer from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &Email,
        subject: &str,
        text_body: String,
        html_body: String,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .as_str()
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.redacted()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to.redacted(), subject = %subject, "Email sent successfully");
        Ok(())
    }
}

#[async_trait]
impl InvitationMailer for SmtpMailer {
    async fn send_invitation(&self, notice: &InvitationNotice) -> Result<(), EmailError> {
        let (html, text) = render_invitation(notice)?;
        let subject = format!("You're invited to join {} on Larder", notice.household_name);
        self.send_multipart_email(&notice.to, &subject, text, html)
            .await
    }
}

/// Mailer used when SMTP is not configured. Every send fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledMailer;

#[async_trait]
impl InvitationMailer for DisabledMailer {
    async fn send_invitation(&self, notice: &InvitationNotice) -> Result<(), EmailError> {
        tracing::debug!(to = %notice.to.redacted(), "Email disabled, invitation not sent");
        Err(EmailError::Disabled)
    }
}

fn render_invitation(notice: &InvitationNotice) -> Result<(String, String), EmailError> {
    let role = notice.role.to_string();
    let expires_on = notice.expires_at.format("%B %-d, %Y").to_string();

    let html = InvitationEmailHtml {
        household_name: &notice.household_name,
        inviter: &notice.inviter,
        role: &role,
        accept_url: &notice.accept_url,
        expires_on: &expires_on,
    }
    .render()?;
    let text = InvitationEmailText {
        household_name: &notice.household_name,
        inviter: &notice.inviter,
        role: &role,
        accept_url: &notice.accept_url,
        expires_on: &expires_on,
    }
    .render()?;

    Ok((html, text))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Mutex, PoisonError};

    use super::*;

    /// Records every notice; optionally fails each send.
    #[derive(Debug, Default)]
    pub struct RecordingMailer {
        sent: Mutex<Vec<InvitationNotice>>,
        fail: bool,
    }

    impl RecordingMailer {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub fn sent(&self) -> Vec<InvitationNotice> {
            self.sent
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    #[async_trait]
    impl InvitationMailer for RecordingMailer {
        async fn send_invitation(&self, notice: &InvitationNotice) -> Result<(), EmailError> {
            self.sent
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(notice.clone());
            if self.fail {
                return Err(EmailError::InvalidAddress(notice.to.redacted()));
            }
            Ok(())
        }
    }
}
