//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- the authenticated user from the session cookie or a Bearer token.
//! - [`rbac::RequireAdmin`] -- requires the `admin` role.
//! - [`rbac::RequireStaff`] -- requires `officer`, `student-affairs` or `admin`.

pub mod auth;
pub mod rbac;
