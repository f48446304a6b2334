//! Outbound email for the clearance platform.
//!
//! - [`templates`] renders typed notification data into subject, HTML and text.
//! - [`mailer`] defines the [`Mailer`] transport seam with an SMTP
//!   implementation and a logging fallback.
//! - [`notifier`] is the service handlers call; it never fails the caller.

pub mod mailer;
pub mod notifier;
pub mod templates;

pub use mailer::{EmailConfig, LogMailer, MailError, Mailer, SmtpMailer};
pub use notifier::{Notifier, Recipient, ReviewedDocument};
pub use templates::RenderedEmail;
