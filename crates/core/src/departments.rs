//! Department code rules and the officer self-provisioning policy.

use std::sync::LazyLock;

use serde::Serialize;

use crate::error::CoreError;

static CODE_RE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^[A-Z0-9][A-Z0-9_-]{1,15}$").expect("valid regex"));

/// Upper-case and trim a department code.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Validate a normalised department code (2-16 chars, `A-Z0-9_-`).
pub fn validate_code(code: &str) -> Result<(), CoreError> {
    if CODE_RE.is_match(code) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid department code '{code}'. Use 2-16 characters: A-Z, 0-9, '_' or '-'"
        )))
    }
}

/// Validate an optional officer cap.
pub fn validate_max_officers(max_officers: Option<i32>) -> Result<(), CoreError> {
    match max_officers {
        Some(n) if n < 1 => Err(CoreError::Validation(
            "max_officers must be at least 1 when set".into(),
        )),
        _ => Ok(()),
    }
}

/// Whether officers of a department may provision further officers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OfficerCreationPolicy {
    pub enabled: bool,
    pub max_officers: Option<i32>,
    /// Officers currently assigned to the department.
    pub current_officers: i64,
}

impl OfficerCreationPolicy {
    pub fn allows_creation(&self) -> bool {
        self.enabled && self.remaining().map_or(true, |left| left > 0)
    }

    /// Slots left under the cap; `None` when uncapped.
    pub fn remaining(&self) -> Option<i64> {
        self.max_officers
            .map(|max| (i64::from(max) - self.current_officers).max(0))
    }

    /// The cap is reached. Binds every role, admins included.
    pub fn is_full(&self) -> bool {
        self.remaining() == Some(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes() {
        assert_eq!(normalize_code(" law "), "LAW");
        assert!(validate_code("LAW").is_ok());
        assert!(validate_code("CS-2").is_ok());
        assert!(validate_code("L").is_err());
        assert!(validate_code("law").is_err());
        assert!(validate_code("-LAW").is_err());
        assert!(validate_code("ABCDEFGHIJKLMNOPQ").is_err());
    }

    #[test]
    fn cap_must_be_positive() {
        assert!(validate_max_officers(None).is_ok());
        assert!(validate_max_officers(Some(1)).is_ok());
        assert!(validate_max_officers(Some(0)).is_err());
    }

    #[test]
    fn disabled_policy_never_allows() {
        let p = OfficerCreationPolicy {
            enabled: false,
            max_officers: None,
            current_officers: 0,
        };
        assert!(!p.allows_creation());
    }

    #[test]
    fn uncapped_policy_always_allows() {
        let p = OfficerCreationPolicy {
            enabled: true,
            max_officers: None,
            current_officers: 40,
        };
        assert!(p.allows_creation());
        assert_eq!(p.remaining(), None);
        assert!(!p.is_full());
    }

    #[test]
    fn capped_policy_counts_down() {
        let mut p = OfficerCreationPolicy {
            enabled: true,
            max_officers: Some(2),
            current_officers: 1,
        };
        assert_eq!(p.remaining(), Some(1));
        assert!(p.allows_creation());

        p.current_officers = 2;
        assert_eq!(p.remaining(), Some(0));
        assert!(!p.allows_creation());
        assert!(p.is_full());

        p.current_officers = 5;
        assert_eq!(p.remaining(), Some(0));
    }
}
