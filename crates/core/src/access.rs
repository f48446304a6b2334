//! Access-control predicates.
//!
//! Every predicate is a pure function of the acting user and the target's
//! ownership facts (id, role, department). Handlers load the target, build
//! the small scope struct and ask here before reading or writing.

use crate::departments::OfficerCreationPolicy;
use crate::documents::DocumentStatus;
use crate::roles::Role;
use crate::types::DbId;

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: DbId,
    pub role: Role,
    pub department_id: Option<DbId>,
}

/// Ownership facts of a user record.
#[derive(Debug, Clone, Copy)]
pub struct UserScope {
    pub id: DbId,
    pub role: Role,
    pub department_id: Option<DbId>,
}

/// Ownership facts of a document record.
#[derive(Debug, Clone, Copy)]
pub struct DocumentScope {
    pub student_id: DbId,
    pub department_id: DbId,
}

/// Row filter applied to list queries for an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScope {
    /// No filter.
    All,
    /// Rows belonging to one department.
    Department(DbId),
    /// Rows belonging to one student.
    Student(DbId),
    /// Nothing is visible (staff without a department).
    Nothing,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// True when the actor is staff attached to `department_id`.
    fn is_staff_of(&self, department_id: DbId) -> bool {
        self.role.is_staff() && self.department_id == Some(department_id)
    }

    /// Row filter for listing students, documents and clearance progress.
    pub fn list_scope(&self) -> ListScope {
        match self.role {
            Role::Admin => ListScope::All,
            Role::Officer | Role::StudentAffairs => match self.department_id {
                Some(dept) => ListScope::Department(dept),
                None => ListScope::Nothing,
            },
            Role::Student => ListScope::Student(self.id),
        }
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Admins see everyone, users see themselves, staff see students of their
/// department.
pub fn can_view_user(actor: &Actor, target: &UserScope) -> bool {
    if actor.is_admin() || actor.id == target.id {
        return true;
    }
    match target.department_id {
        Some(dept) => target.role == Role::Student && actor.is_staff_of(dept),
        None => false,
    }
}

/// Listing users is a staff or admin capability.
pub fn can_list_users(actor: &Actor) -> bool {
    actor.role != Role::Student
}

/// Profile fields (names, phone) are editable by admins and by the user.
pub fn can_update_profile(actor: &Actor, target: &UserScope) -> bool {
    actor.is_admin() || actor.id == target.id
}

/// Role, department, matriculation number and account status are admin-only.
pub fn can_update_privileged_fields(actor: &Actor) -> bool {
    actor.is_admin()
}

/// Admins may suspend anyone except themselves.
pub fn can_delete_user(actor: &Actor, target: &UserScope) -> bool {
    actor.is_admin() && actor.id != target.id
}

/// Admins create students anywhere; student-affairs staff into their own
/// department.
pub fn can_create_student(actor: &Actor, department_id: DbId) -> bool {
    match actor.role {
        Role::Admin => true,
        Role::StudentAffairs => actor.department_id == Some(department_id),
        Role::Officer | Role::Student => false,
    }
}

/// Admins create officers anywhere; an officer may provision a colleague for
/// their own department when the department policy allows it.
pub fn can_create_officer(
    actor: &Actor,
    department_id: DbId,
    policy: &OfficerCreationPolicy,
) -> bool {
    match actor.role {
        Role::Admin => true,
        Role::Officer => actor.department_id == Some(department_id) && policy.allows_creation(),
        Role::StudentAffairs | Role::Student => false,
    }
}

/// Aggregate user statistics are admin-only.
pub fn can_view_user_stats(actor: &Actor) -> bool {
    actor.is_admin()
}

/// Password-related fields are visible to admins and to the user.
pub fn can_view_password_fields(actor: &Actor, target_id: DbId) -> bool {
    actor.is_admin() || actor.id == target_id
}

// ---------------------------------------------------------------------------
// Departments and requirements
// ---------------------------------------------------------------------------

pub fn can_manage_departments(actor: &Actor) -> bool {
    actor.is_admin()
}

pub fn can_manage_requirements(actor: &Actor) -> bool {
    actor.is_admin()
}

/// Officer-provisioning flags are visible to admins and the department's staff.
pub fn can_view_department_provisioning(actor: &Actor, department_id: DbId) -> bool {
    actor.is_admin() || actor.is_staff_of(department_id)
}

/// Department statistics are visible to admins and the department's staff.
pub fn can_view_department_stats(actor: &Actor, department_id: DbId) -> bool {
    can_view_department_provisioning(actor, department_id)
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

pub fn can_view_document(actor: &Actor, doc: &DocumentScope) -> bool {
    match actor.role {
        Role::Admin => true,
        Role::Student => actor.id == doc.student_id,
        Role::Officer | Role::StudentAffairs => actor.is_staff_of(doc.department_id),
    }
}

/// Students upload for themselves only; admins may upload on a student's behalf.
pub fn can_upload_for(actor: &Actor, student_id: DbId) -> bool {
    match actor.role {
        Role::Admin => true,
        Role::Student => actor.id == student_id,
        Role::Officer | Role::StudentAffairs => false,
    }
}

/// Reviews are performed by the document department's staff or by admins.
pub fn can_review_document(actor: &Actor, department_id: DbId) -> bool {
    actor.is_admin() || actor.is_staff_of(department_id)
}

/// Admins delete any document; students only their own pending uploads.
pub fn can_delete_document(actor: &Actor, doc: &DocumentScope, status: DocumentStatus) -> bool {
    match actor.role {
        Role::Admin => true,
        Role::Student => actor.id == doc.student_id && status == DocumentStatus::Pending,
        Role::Officer | Role::StudentAffairs => false,
    }
}

// ---------------------------------------------------------------------------
// Clearance
// ---------------------------------------------------------------------------

/// Clearance views follow user visibility, restricted to student targets.
pub fn can_view_clearance(actor: &Actor, student: &UserScope) -> bool {
    student.role == Role::Student && can_view_user(actor, student)
}

/// Status changes, completion and manual log entries are staff/admin actions.
pub fn can_manage_clearance(actor: &Actor, student: &UserScope) -> bool {
    if student.role != Role::Student {
        return false;
    }
    match student.department_id {
        Some(dept) => actor.is_admin() || actor.is_staff_of(dept),
        None => actor.is_admin(),
    }
}
