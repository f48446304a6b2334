//! Clearance status, audit actions, and progress aggregation.

use serde::Serialize;

use crate::error::CoreError;

define_text_enum! {
    /// A student's overall clearance state. Stored in `users.clearance_status`.
    ClearanceStatus ("clearance status") {
        NotStarted = "not-started",
        InProgress = "in-progress",
        Completed = "completed",
        OnHold = "on-hold",
    }
}

define_text_enum! {
    /// Action recorded in the append-only clearance log.
    ClearanceAction ("clearance action") {
        Upload = "upload",
        Review = "review",
        Approval = "approval",
        Rejection = "rejection",
        DepartmentClearance = "department-clearance",
        FinalClearance = "final-clearance",
        StatusChange = "status-change",
        Note = "note",
    }
}

impl ClearanceAction {
    /// Actions that staff may append by hand.
    ///
    /// Upload, review outcomes and final clearance are only ever written by
    /// the operations that perform them.
    pub fn is_manual(self) -> bool {
        matches!(
            self,
            ClearanceAction::Note
                | ClearanceAction::StatusChange
                | ClearanceAction::DepartmentClearance
        )
    }
}

/// Computed completion of one student against their department's active
/// requirements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClearanceProgress {
    pub total_requirements: i64,
    pub approved_requirements: i64,
    /// Percentage in `[0, 100]`, two decimals.
    pub completion_rate: f64,
    pub is_completed: bool,
}

impl ClearanceProgress {
    /// Build progress from the number of active requirements and the number
    /// of distinct requirements with an approved latest document.
    pub fn compute(total_requirements: i64, approved_requirements: i64) -> Self {
        let total = total_requirements.max(0);
        let approved = approved_requirements.clamp(0, total);
        Self {
            total_requirements: total,
            approved_requirements: approved,
            completion_rate: completion_rate(approved, total),
            is_completed: total > 0 && approved == total,
        }
    }

    /// Fail with `BAD_REQUEST` unless every active requirement is approved.
    pub fn ensure_completable(&self) -> Result<(), CoreError> {
        if self.is_completed {
            return Ok(());
        }
        if self.total_requirements == 0 {
            return Err(CoreError::BadRequest(
                "Department has no active requirements; clearance cannot be completed".into(),
            ));
        }
        Err(CoreError::BadRequest(format!(
            "Clearance cannot be completed: {} of {} requirements approved",
            self.approved_requirements, self.total_requirements
        )))
    }
}

/// `approved / total * 100`, rounded to two decimals; zero when there is
/// nothing to approve.
pub fn completion_rate(approved: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    let rate = approved as f64 / total as f64 * 100.0;
    (rate * 100.0).round() / 100.0
}

/// Status a student moves to after uploading, if it changes.
pub fn status_after_upload(current: ClearanceStatus) -> Option<ClearanceStatus> {
    match current {
        ClearanceStatus::NotStarted => Some(ClearanceStatus::InProgress),
        _ => None,
    }
}
