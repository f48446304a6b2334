//! Email templates.
//!
//! Each template is a pure function from a typed data record to a
//! [`RenderedEmail`]. All caller-supplied values are HTML-escaped before they
//! are placed in the HTML body.

/// Subject plus HTML and plain-text bodies of one email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
}

const BRAND: &str = "Student Clearance";

/// A newly provisioned account with its set-password link.
#[derive(Debug, Clone)]
pub struct WelcomeEmail<'a> {
    pub first_name: &'a str,
    pub link: &'a str,
    pub valid_hours: i64,
}

/// A welcome email for a new officer, naming their department.
#[derive(Debug, Clone)]
pub struct OfficerWelcomeEmail<'a> {
    pub first_name: &'a str,
    pub department_name: &'a str,
    pub link: &'a str,
    pub valid_hours: i64,
}

#[derive(Debug, Clone)]
pub struct PasswordResetEmail<'a> {
    pub first_name: &'a str,
    pub link: &'a str,
    pub valid_hours: i64,
}

/// Outcome of a document review as seen by the student.
#[derive(Debug, Clone)]
pub struct DocumentReviewEmail<'a> {
    pub first_name: &'a str,
    pub requirement_name: &'a str,
    pub department_name: &'a str,
    pub notes: Option<&'a str>,
    pub rejection_reason: Option<&'a str>,
    pub link: &'a str,
}

#[derive(Debug, Clone)]
pub struct ClearanceCompletedEmail<'a> {
    pub first_name: &'a str,
    pub link: &'a str,
}

pub fn welcome(data: &WelcomeEmail<'_>) -> RenderedEmail {
    let intro = "An account has been created for you on the student clearance portal. \
                 Set your password to sign in.";
    render(
        format!("Welcome to {BRAND}"),
        data.first_name,
        &[intro.to_string(), link_expiry(data.valid_hours)],
        Some(("Set your password", data.link)),
    )
}

pub fn officer_welcome(data: &OfficerWelcomeEmail<'_>) -> RenderedEmail {
    let intro = format!(
        "You have been added as a clearance officer for {}. \
         Set your password to start reviewing documents.",
        data.department_name
    );
    render(
        format!("{BRAND}: officer account for {}", data.department_name),
        data.first_name,
        &[intro, link_expiry(data.valid_hours)],
        Some(("Set your password", data.link)),
    )
}

pub fn password_reset(data: &PasswordResetEmail<'_>) -> RenderedEmail {
    let intro = "We received a request to reset your password. \
                 If you did not ask for this you can ignore this email.";
    render(
        format!("{BRAND}: reset your password"),
        data.first_name,
        &[intro.to_string(), link_expiry(data.valid_hours)],
        Some(("Reset your password", data.link)),
    )
}

pub fn document_approved(data: &DocumentReviewEmail<'_>) -> RenderedEmail {
    let mut paragraphs = vec![format!(
        "Your document for \"{}\" has been approved by {}.",
        data.requirement_name, data.department_name
    )];
    if let Some(notes) = data.notes {
        paragraphs.push(format!("Reviewer notes: {notes}"));
    }
    render(
        format!("Document approved: {}", data.requirement_name),
        data.first_name,
        &paragraphs,
        Some(("View your clearance", data.link)),
    )
}

pub fn document_rejected(data: &DocumentReviewEmail<'_>) -> RenderedEmail {
    let mut paragraphs = vec![format!(
        "Your document for \"{}\" was rejected by {}.",
        data.requirement_name, data.department_name
    )];
    if let Some(reason) = data.rejection_reason {
        paragraphs.push(format!("Reason: {reason}"));
    }
    if let Some(notes) = data.notes {
        paragraphs.push(format!("Reviewer notes: {notes}"));
    }
    paragraphs.push("Please upload a corrected document.".to_string());
    render(
        format!("Document rejected: {}", data.requirement_name),
        data.first_name,
        &paragraphs,
        Some(("Upload a new version", data.link)),
    )
}

pub fn document_under_review(data: &DocumentReviewEmail<'_>) -> RenderedEmail {
    let paragraphs = [format!(
        "{} is now reviewing your document for \"{}\".",
        data.department_name, data.requirement_name
    )];
    render(
        format!("Document under review: {}", data.requirement_name),
        data.first_name,
        &paragraphs,
        Some(("View your clearance", data.link)),
    )
}

pub fn clearance_completed(data: &ClearanceCompletedEmail<'_>) -> RenderedEmail {
    let paragraphs = ["Congratulations, all of your clearance requirements have been \
                       approved and your clearance is complete."
        .to_string()];
    render(
        format!("{BRAND}: clearance completed"),
        data.first_name,
        &paragraphs,
        Some(("View your clearance", data.link)),
    )
}

fn link_expiry(hours: i64) -> String {
    if hours == 1 {
        "This link expires in 1 hour and can be used once.".to_string()
    } else {
        format!("This link expires in {hours} hours and can be used once.")
    }
}

/// Shared layout: greeting, paragraphs and an optional call-to-action link.
fn render(
    subject: String,
    first_name: &str,
    paragraphs: &[String],
    action: Option<(&str, &str)>,
) -> RenderedEmail {
    let mut text = format!("Hello {first_name},\n\n");
    let mut html = format!(
        "<!DOCTYPE html><html><body style=\"font-family:sans-serif\">\
         <h2>{}</h2><p>Hello {},</p>",
        escape_html(&subject),
        escape_html(first_name)
    );

    for paragraph in paragraphs {
        text.push_str(paragraph);
        text.push_str("\n\n");
        html.push_str(&format!("<p>{}</p>", escape_html(paragraph)));
    }

    if let Some((label, url)) = action {
        text.push_str(&format!("{label}: {url}\n\n"));
        html.push_str(&format!(
            "<p><a href=\"{}\">{}</a></p>",
            escape_html(url),
            escape_html(label)
        ));
    }

    text.push_str(&format!("-- {BRAND}"));
    html.push_str(&format!("<p>{BRAND}</p></body></html>"));

    RenderedEmail {
        subject,
        html,
        text,
    }
}

/// Escape the five HTML-significant characters.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
