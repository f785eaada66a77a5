//! Entity structs for Consult domain objects.
//!
//! `Consultation` and `Participant` map to tables owned by `consult-db`.
//! `Doctor`, `DoctorCandidate` and `PatientSnapshot` are read-only projections
//! of reference data owned by other subsystems.

mod consultation;
mod doctor;
mod participant;
mod patient;

pub use consultation::Consultation;
pub use doctor::{Doctor, DoctorCandidate};
pub use participant::Participant;
pub use patient::PatientSnapshot;
