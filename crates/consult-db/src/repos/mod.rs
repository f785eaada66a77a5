//! Repository modules implementing the coordinator's operations.
//!
//! Each module adds methods to `ConsultService` via `impl ConsultService` blocks.

pub mod consultation;
pub mod directory;
pub mod patient;
pub mod read_model;
