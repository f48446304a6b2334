//! Document lifecycle and upload constraints.
//!
//! Status machine:
//!
//! ```text
//! pending ──► under-review ──► approved
//!    │             └─────────► rejected
//!    ├────────────────────────► approved
//!    └────────────────────────► rejected
//! ```
//!
//! `approved` and `rejected` are final for a version; a re-upload creates a
//! new version instead of reopening the old one.

use crate::error::CoreError;

/// File extensions accepted anywhere in the system.
pub const ACCEPTED_FILE_TYPES: &[&str] = &["pdf", "doc", "docx", "jpg", "jpeg", "png"];

/// Default per-requirement size limit.
pub const DEFAULT_MAX_FILE_SIZE_MB: i32 = 10;

pub const BYTES_PER_MB: i64 = 1024 * 1024;

/// Longest accepted rejection reason or review note.
pub const MAX_REVIEW_TEXT_LENGTH: usize = 2_000;

define_text_enum! {
    /// Review status of one uploaded document version.
    DocumentStatus ("document status") {
        Pending = "pending",
        UnderReview = "under-review",
        Approved = "approved",
        Rejected = "rejected",
    }
}

impl DocumentStatus {
    /// No further review transition is possible.
    pub fn is_final(self) -> bool {
        matches!(self, DocumentStatus::Approved | DocumentStatus::Rejected)
    }

    pub fn can_transition_to(self, next: DocumentStatus) -> bool {
        use DocumentStatus::*;
        matches!(
            (self, next),
            (Pending, UnderReview) | (Pending, Approved) | (Pending, Rejected)
                | (UnderReview, Approved)
                | (UnderReview, Rejected)
        )
    }
}

/// Validate a review decision against the document's current status.
///
/// Rejections must carry a non-empty reason; free text is length-limited.
pub fn validate_review(
    current: DocumentStatus,
    next: DocumentStatus,
    rejection_reason: Option<&str>,
    notes: Option<&str>,
) -> Result<(), CoreError> {
    if current.is_final() {
        return Err(CoreError::BadRequest(format!(
            "Document is already {current}; upload a new version instead"
        )));
    }
    if !current.can_transition_to(next) {
        return Err(CoreError::BadRequest(format!(
            "Cannot move a document from '{current}' to '{next}'"
        )));
    }

    if next == DocumentStatus::Rejected
        && rejection_reason.map(str::trim).unwrap_or_default().is_empty()
    {
        return Err(CoreError::Validation(
            "A rejection reason is required when rejecting a document".into(),
        ));
    }

    for text in [rejection_reason, notes].into_iter().flatten() {
        if text.chars().count() > MAX_REVIEW_TEXT_LENGTH {
            return Err(CoreError::Validation(format!(
                "Review text must be at most {MAX_REVIEW_TEXT_LENGTH} characters"
            )));
        }
    }

    Ok(())
}

/// Lowercased extension of a file name, if any.
pub fn file_extension(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Validate the file-type list of a requirement.
pub fn validate_allowed_types(types: &[String]) -> Result<(), CoreError> {
    if types.is_empty() {
        return Err(CoreError::Validation(
            "At least one allowed file type is required".into(),
        ));
    }
    for t in types {
        if !ACCEPTED_FILE_TYPES.contains(&t.as_str()) {
            return Err(CoreError::Validation(format!(
                "Unsupported file type '{t}'. Must be one of: {}",
                ACCEPTED_FILE_TYPES.join(", ")
            )));
        }
    }
    Ok(())
}

/// Validate a requirement's size limit against the server-wide ceiling.
pub fn validate_max_file_size(max_mb: i32, ceiling_mb: i32) -> Result<(), CoreError> {
    if max_mb < 1 || max_mb > ceiling_mb {
        return Err(CoreError::Validation(format!(
            "max_file_size_mb must be between 1 and {ceiling_mb}"
        )));
    }
    Ok(())
}

/// Check an uploaded file against a requirement's constraints.
///
/// Returns the normalised extension on success.
pub fn validate_upload(
    file_name: &str,
    size_bytes: i64,
    allowed_types: &[String],
    max_file_size_mb: i32,
) -> Result<String, CoreError> {
    let ext = file_extension(file_name).ok_or_else(|| {
        CoreError::Validation(format!("File '{file_name}' has no extension"))
    })?;

    if !ACCEPTED_FILE_TYPES.contains(&ext.as_str()) || !allowed_types.iter().any(|t| *t == ext) {
        return Err(CoreError::Validation(format!(
            "File type '.{ext}' is not allowed. Allowed types: {}",
            allowed_types.join(", ")
        )));
    }

    if size_bytes <= 0 {
        return Err(CoreError::Validation("Uploaded file is empty".into()));
    }

    let limit = i64::from(max_file_size_mb) * BYTES_PER_MB;
    if size_bytes > limit {
        return Err(CoreError::Validation(format!(
            "File exceeds the {max_file_size_mb}MB limit"
        )));
    }

    Ok(ext)
}

/// MIME type served for a stored extension.
pub fn content_type_for(ext: &str) -> &'static str {
    match ext {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        _ => "application/octet-stream",
    }
}

/// Version number for the next upload given the current highest version.
pub fn next_version(current_max: Option<i32>) -> i32 {
    current_max.unwrap_or(0) + 1
}
