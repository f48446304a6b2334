//! The role model.
//!
//! Roles form a flat set: admins have blanket access, officers and
//! student-affairs staff are scoped to their department, students to
//! themselves. Per-role behaviour is expressed with `match`, see
//! [`crate::access`].

define_text_enum! {
    /// A user's role. Stored in `users.role`.
    Role ("role") {
        Student = "student",
        Officer = "officer",
        StudentAffairs = "student-affairs",
        Admin = "admin",
    }
}

impl Role {
    /// Departmental staff: officers and student-affairs.
    pub fn is_staff(self) -> bool {
        matches!(self, Role::Officer | Role::StudentAffairs)
    }

    /// Whether the role must be attached to a department.
    pub fn requires_department(self) -> bool {
        !matches!(self, Role::Admin)
    }

    /// Whether login is allowed before the user has set a password.
    ///
    /// Only admins are seeded with a usable password.
    pub fn may_login_without_password_setup(self) -> bool {
        self == Role::Admin
    }
}
