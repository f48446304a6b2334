//! User account rules: account status, field requirements per role, and
//! input normalisation.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;
use crate::roles::Role;
use crate::types::DbId;

/// Minimum password length for first-time setup and resets.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum number of students accepted by one bulk-create call.
pub const MAX_BULK_STUDENTS: usize = 500;

static MATRIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9/\-]{3,19}$").expect("valid regex"));

define_text_enum! {
    /// Account lifecycle. Users are never hard-deleted.
    AccountStatus ("account status") {
        Active = "active",
        Suspended = "suspended",
    }
}

/// Lowercase and trim an email address for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate a matriculation number (4-20 chars, alphanumeric plus `/` and `-`).
pub fn validate_matric_number(matric: &str) -> Result<(), CoreError> {
    if MATRIC_RE.is_match(matric) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid matriculation number '{matric}'"
        )))
    }
}

/// Check the role-dependent fields of a user being created or re-assigned.
///
/// - students need a department and a matriculation number,
/// - staff need a department,
/// - only students carry a matriculation number.
pub fn validate_role_fields(
    role: Role,
    department_id: Option<DbId>,
    matric_number: Option<&str>,
) -> Result<(), CoreError> {
    if role.requires_department() && department_id.is_none() {
        return Err(CoreError::Validation(format!(
            "A {role} account must belong to a department"
        )));
    }

    match (role, matric_number) {
        (Role::Student, Some(matric)) => validate_matric_number(matric),
        (Role::Student, None) => Err(CoreError::Validation(
            "Students must have a matriculation number".into(),
        )),
        (_, Some(_)) => Err(CoreError::Validation(
            "Only students may have a matriculation number".into(),
        )),
        (_, None) => Ok(()),
    }
}

/// Validate a first or last name.
pub fn validate_name(field: &str, value: &str) -> Result<(), CoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(format!("{field} must not be empty")));
    }
    if trimmed.chars().count() > 100 {
        return Err(CoreError::Validation(format!(
            "{field} must be at most 100 characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn email_is_trimmed_and_lowercased() {
        assert_eq!(normalize_email("  Ada.L@Uni.EDU "), "ada.l@uni.edu");
    }

    #[test]
    fn matric_numbers() {
        assert!(validate_matric_number("CSC/2019/001").is_ok());
        assert!(validate_matric_number("U2020-1234").is_ok());
        assert!(validate_matric_number("ab").is_err());
        assert!(validate_matric_number("has space").is_err());
        assert!(validate_matric_number("/leading").is_err());
    }

    #[test]
    fn student_needs_department_and_matric() {
        assert!(validate_role_fields(Role::Student, Some(1), Some("CSC/2019/001")).is_ok());
        assert_matches!(
            validate_role_fields(Role::Student, None, Some("CSC/2019/001")),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            validate_role_fields(Role::Student, Some(1), None),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn staff_need_department_but_no_matric() {
        assert!(validate_role_fields(Role::Officer, Some(2), None).is_ok());
        assert!(validate_role_fields(Role::StudentAffairs, None, None).is_err());
        assert!(validate_role_fields(Role::Officer, Some(2), Some("CSC/2019/001")).is_err());
    }

    #[test]
    fn admin_needs_nothing() {
        assert!(validate_role_fields(Role::Admin, None, None).is_ok());
    }

    #[test]
    fn names() {
        assert!(validate_name("first_name", "Ada").is_ok());
        assert!(validate_name("first_name", "   ").is_err());
        assert!(validate_name("last_name", &"x".repeat(101)).is_err());
    }
}
