//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` (or any `PgExecutor` when the call must join a
//! caller's transaction) as the first argument.

pub mod auth_token_repo;
pub mod clearance_record_repo;
pub mod department_repo;
pub mod document_repo;
pub mod requirement_repo;
pub mod user_repo;

pub use auth_token_repo::AuthTokenRepo;
pub use clearance_record_repo::ClearanceRecordRepo;
pub use department_repo::DepartmentRepo;
pub use document_repo::DocumentRepo;
pub use requirement_repo::RequirementRepo;
pub use user_repo::UserRepo;
