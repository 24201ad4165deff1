//! Credential notifications sent after a successful enrollment.
//!
//! Delivery runs on a detached task. A failed delivery is logged and never
//! undoes the enrollment.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use campusdesk_models::ids::{OrganizationId, SectionId, UserId};
use tracing::{info, warn};

#[derive(Clone)]
pub struct CredentialsIssued {
    pub student_id: UserId,
    pub organization_id: OrganizationId,
    pub email: String,
    pub student_name: String,
    pub class_name: String,
    pub grade: String,
    pub section_id: SectionId,
    pub section_name: String,
    pub initial_password: String,
}

impl fmt::Debug for CredentialsIssued {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsIssued")
            .field("student_id", &self.student_id)
            .field("email", &self.email)
            .field("section_id", &self.section_id)
            .field("initial_password", &"<redacted>")
            .finish()
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn credentials_issued(&self, event: &CredentialsIssued) -> anyhow::Result<()>;
}

/// Used when SMTP is disabled: records that credentials were issued.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn credentials_issued(&self, event: &CredentialsIssued) -> anyhow::Result<()> {
        info!(
            student_id = %event.student_id,
            email = %event.email,
            section = %event.section_name,
            "Credentials issued (email delivery disabled)"
        );
        Ok(())
    }
}

/// Fire-and-forget delivery.
pub(crate) fn dispatch(notifier: Arc<dyn Notifier>, event: CredentialsIssued) {
    tokio::spawn(async move {
        if let Err(e) = notifier.credentials_issued(&event).await {
            metrics::counter!("notifications_failed_total").increment(1);
            warn!(
                student_id = %event.student_id,
                error = %e,
                "Failed to deliver student credentials"
            );
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> CredentialsIssued {
        CredentialsIssued {
            student_id: UserId::new(),
            organization_id: OrganizationId::new(),
            email: "kemi@example.com".into(),
            student_name: "Kemi Ade".into(),
            class_name: "Gold".into(),
            grade: "JSS1".into(),
            section_id: SectionId::new(),
            section_name: "A".into(),
            initial_password: "hunter2hunter2".into(),
        }
    }

    #[test]
    fn test_debug_redacts_password() {
        let rendered = format!("{:?}", event());
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }

    #[tokio::test]
    async fn test_log_notifier_succeeds() {
        assert!(LogNotifier.credentials_issued(&event()).await.is_ok());
    }
}
