//! SMTP delivery of initial student credentials.

use anyhow::Context;
use async_trait::async_trait;
use campusdesk_config::EmailConfig;
use campusdesk_enrollment::{CredentialsIssued, Notifier};
use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{info, instrument};

pub struct EmailNotifier {
    from: Mailbox,
    frontend_url: String,
    mailer: SmtpTransport,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig) -> anyhow::Result<Self> {
        let from: Mailbox = format!("{} <{}>", config.from_name, config.from_email)
            .parse()
            .context("Invalid FROM_EMAIL / FROM_NAME")?;

        let mailer = if config.smtp_username.is_empty() {
            SmtpTransport::builder_dangerous(&config.smtp_host)
                .port(config.smtp_port)
                .build()
        } else {
            let creds = Credentials::new(config.smtp_username.clone(), config.smtp_password.clone());
            SmtpTransport::relay(&config.smtp_host)
                .context("Failed to create SMTP relay")?
                .port(config.smtp_port)
                .credentials(creds)
                .build()
        };

        Ok(Self {
            from,
            frontend_url: config.frontend_url,
            mailer,
        })
    }

    fn compose(&self, event: &CredentialsIssued) -> anyhow::Result<Message> {
        let to: Mailbox = format!("{} <{}>", event.student_name, event.email)
            .parse()
            .with_context(|| format!("Invalid recipient address {}", event.email))?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(format!("Your {} {} login details", event.grade, event.class_name))
            .header(ContentType::TEXT_PLAIN)
            .body(credentials_body(event, &self.frontend_url))
            .context("Failed to build email")
    }
}

fn credentials_body(event: &CredentialsIssued, frontend_url: &str) -> String {
    format!(
        "Hi {},\n\n\
         You have been enrolled in {} {}, section {}.\n\n\
         Sign in at {} with:\n\
         Email: {}\n\
         Password: {}\n\n\
         Please change your password after your first sign-in.\n\n\
         Campusdesk",
        event.student_name,
        event.grade,
        event.class_name,
        event.section_name,
        frontend_url,
        event.email,
        event.initial_password
    )
}

#[async_trait]
impl Notifier for EmailNotifier {
    #[instrument(skip(self))]
    async fn credentials_issued(&self, event: &CredentialsIssued) -> anyhow::Result<()> {
        let message = self.compose(event)?;
        let mailer = self.mailer.clone();

        tokio::task::spawn_blocking(move || mailer.send(&message))
            .await
            .context("Email task failed")?
            .context("Failed to send email")?;

        info!(student_id = %event.student_id, "Credentials email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campusdesk_models::ids::{OrganizationId, SectionId, UserId};

    fn event() -> CredentialsIssued {
        CredentialsIssued {
            student_id: UserId::new(),
            organization_id: OrganizationId::new(),
            email: "ada@example.com".to_string(),
            student_name: "Ada Obi".to_string(),
            class_name: "Gold".to_string(),
            grade: "JSS1".to_string(),
            section_id: SectionId::new(),
            section_name: "B".to_string(),
            initial_password: "s3cretpass".to_string(),
        }
    }

    fn config() -> EmailConfig {
        EmailConfig {
            enabled: true,
            smtp_host: "localhost".to_string(),
            smtp_port: 1025,
            smtp_username: String::new(),
            smtp_password: String::new(),
            from_email: "noreply@campusdesk.dev".to_string(),
            from_name: "Campusdesk".to_string(),
            frontend_url: "https://app.campusdesk.dev".to_string(),
        }
    }

    #[test]
    fn test_body_contains_placement_and_credentials() {
        let body = credentials_body(&event(), "https://app.campusdesk.dev");
        assert!(body.contains("JSS1 Gold, section B"));
        assert!(body.contains("Password: s3cretpass"));
        assert!(body.contains("https://app.campusdesk.dev"));
    }

    #[test]
    fn test_compose_builds_plain_text_message() {
        let notifier = EmailNotifier::new(config()).unwrap();
        let message = notifier.compose(&event()).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("<ada@example.com>"));
        assert!(raw.contains("Content-Type: text/plain"));
    }

    #[test]
    fn test_invalid_recipient_is_an_error() {
        let notifier = EmailNotifier::new(config()).unwrap();
        let mut bad = event();
        bad.email = "not an address".to_string();
        assert!(notifier.compose(&bad).is_err());
    }
}
