//! # consult-core
//!
//! Core types, ID prefixes, and error types for Consult.
//!
//! This crate provides the foundational types shared across all Consult crates:
//! - Entity structs (consultations, participants, doctors, patient snapshots)
//! - Status enums with state machine transitions
//! - ID prefix constants
//! - The caller identity passed into every coordinator operation
//! - Notification events and the collaborator ports (dispatcher, patient provider)
//! - Request payloads and read-model responses
//! - Cross-cutting error types

pub mod entities;
pub mod enums;
pub mod errors;
pub mod events;
pub mod identity;
pub mod ids;
pub mod ports;
pub mod requests;
pub mod responses;
