//! One `router()` per resource; [`crate::router`] mounts them.

pub mod auth;
pub mod clearance;
pub mod departments;
pub mod documents;
pub mod health;
pub mod requirements;
pub mod users;
