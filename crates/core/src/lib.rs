//! Domain rules for the student clearance service.
//!
//! This crate has no I/O. It holds the role model, access predicates,
//! document and clearance state rules, pagination cursors and token helpers
//! shared by the database and API layers.

#[macro_use]
pub mod types;

pub mod access;
pub mod clearance;
pub mod departments;
pub mod documents;
pub mod error;
pub mod pagination;
pub mod roles;
pub mod tokens;
pub mod users;
