pub mod auth;
pub mod clearance;
pub mod departments;
pub mod documents;
pub mod requirements;
pub mod users;
