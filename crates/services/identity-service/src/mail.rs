//! Mail dispatcher: sends the email-verification link via SMTP.
//!
//! Dispatch is fire-and-forget from the caller's perspective — sign-up does
//! not fail when mail delivery fails, it only logs.

use lettre::{
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use common::MailConfig;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
pub trait MailDispatcher: Send + Sync {
    /// Send the verification link to `to`. Fire-and-forget: the caller
    /// should not treat a failure here as fatal to the calling operation.
    fn dispatch_verification(&self, to: String, key: String);
}

/// `lettre`-backed SMTP mail dispatcher.
#[derive(Clone)]
pub struct LettreMailDispatcher {
    config: MailConfig,
}

impl LettreMailDispatcher {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }

    async fn send(config: MailConfig, to: String, key: String) {
        let link = config.verification_link(&key);
        let body = format!(
            "Welcome! Confirm your address by visiting the following link:\n\n{}\n\nThis link expires shortly.",
            link
        );

        let email = match Message::builder()
            .from(match config.user.parse() {
                Ok(addr) => addr,
                Err(e) => {
                    tracing::error!(error = %e, "Invalid MAIL_USER address; dropping verification email");
                    return;
                }
            })
            .to(match to.parse() {
                Ok(addr) => addr,
                Err(e) => {
                    tracing::error!(error = %e, to = %to, "Invalid recipient address; dropping verification email");
                    return;
                }
            })
            .subject("Verify your email address")
            .header(ContentType::TEXT_PLAIN)
            .body(body)
        {
            Ok(message) => message,
            Err(e) => {
                tracing::error!(error = %e, "Failed to build verification email");
                return;
            }
        };

        let creds = Credentials::new(config.user.clone(), config.pass.clone());

        let mailer = match AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host) {
            Ok(builder) => builder.port(config.port).credentials(creds).build(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to build SMTP transport");
                return;
            }
        };

        match mailer.send(email).await {
            Ok(_) => tracing::info!(to = %to, "Verification email sent"),
            Err(e) => tracing::error!(error = %e, to = %to, "Failed to send verification email"),
        }
    }
}

impl MailDispatcher for LettreMailDispatcher {
    fn dispatch_verification(&self, to: String, key: String) {
        let config = self.config.clone();
        tokio::spawn(async move {
            Self::send(config, to, key).await;
        });
    }
}
