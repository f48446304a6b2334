//! The notification service handlers call after a state change.
//!
//! Every send is awaited inline. Failures are logged and swallowed so an
//! unreachable mail server never fails the request that triggered the email.

use std::sync::Arc;

use clearance_core::documents::DocumentStatus;
use clearance_core::tokens::{token_link, TokenPurpose};

use crate::mailer::Mailer;
use crate::templates::{self, RenderedEmail};

/// Recipient details shared by every notification.
#[derive(Debug, Clone, Copy)]
pub struct Recipient<'a> {
    pub email: &'a str,
    pub first_name: &'a str,
}

/// Facts about a reviewed document needed to render the student's email.
#[derive(Debug, Clone, Copy)]
pub struct ReviewedDocument<'a> {
    pub status: DocumentStatus,
    pub requirement_name: &'a str,
    pub department_name: &'a str,
    pub notes: Option<&'a str>,
    pub rejection_reason: Option<&'a str>,
}

pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    app_url: String,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>, app_url: impl Into<String>) -> Self {
        Self {
            mailer,
            app_url: app_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn clearance_link(&self) -> String {
        format!("{}/clearance", self.app_url)
    }

    /// Welcome email with a set-password magic link.
    pub async fn welcome(&self, to: Recipient<'_>, token: &str) {
        let link = token_link(&self.app_url, TokenPurpose::Welcome, token);
        let email = templates::welcome(&templates::WelcomeEmail {
            first_name: to.first_name,
            link: &link,
            valid_hours: TokenPurpose::Welcome.ttl().num_hours(),
        });
        self.deliver(to.email, "welcome", email).await;
    }

    /// Welcome email for an officer, naming the department they serve.
    pub async fn officer_welcome(&self, to: Recipient<'_>, department_name: &str, token: &str) {
        let link = token_link(&self.app_url, TokenPurpose::Welcome, token);
        let email = templates::officer_welcome(&templates::OfficerWelcomeEmail {
            first_name: to.first_name,
            department_name,
            link: &link,
            valid_hours: TokenPurpose::Welcome.ttl().num_hours(),
        });
        self.deliver(to.email, "officer-welcome", email).await;
    }

    pub async fn password_reset(&self, to: Recipient<'_>, token: &str) {
        let link = token_link(&self.app_url, TokenPurpose::PasswordReset, token);
        let email = templates::password_reset(&templates::PasswordResetEmail {
            first_name: to.first_name,
            link: &link,
            valid_hours: TokenPurpose::PasswordReset.ttl().num_hours(),
        });
        self.deliver(to.email, "password-reset", email).await;
    }

    /// Tell a student about a review decision. `pending` sends nothing.
    pub async fn document_reviewed(&self, to: Recipient<'_>, document: ReviewedDocument<'_>) {
        let link = self.clearance_link();
        let data = templates::DocumentReviewEmail {
            first_name: to.first_name,
            requirement_name: document.requirement_name,
            department_name: document.department_name,
            notes: document.notes,
            rejection_reason: document.rejection_reason,
            link: &link,
        };
        let (kind, email) = match document.status {
            DocumentStatus::Approved => ("document-approved", templates::document_approved(&data)),
            DocumentStatus::Rejected => ("document-rejected", templates::document_rejected(&data)),
            DocumentStatus::UnderReview => (
                "document-under-review",
                templates::document_under_review(&data),
            ),
            DocumentStatus::Pending => return,
        };
        self.deliver(to.email, kind, email).await;
    }

    pub async fn clearance_completed(&self, to: Recipient<'_>) {
        let link = self.clearance_link();
        let email = templates::clearance_completed(&templates::ClearanceCompletedEmail {
            first_name: to.first_name,
            link: &link,
        });
        self.deliver(to.email, "clearance-completed", email).await;
    }

    async fn deliver(&self, to: &str, kind: &'static str, email: RenderedEmail) {
        if let Err(e) = self.mailer.send(to, &email).await {
            tracing::warn!(to, kind, error = %e, "Failed to send notification email");
        }
    }
}
