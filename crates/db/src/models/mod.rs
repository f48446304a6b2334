//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` entity struct matching the database row
//! - A create DTO for inserts
//! - An update DTO (all `Option` fields) for patches, where the entity is mutable

pub mod auth_token;
pub mod clearance_record;
pub mod department;
pub mod document;
pub mod requirement;
pub mod user;
