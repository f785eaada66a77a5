//! ID prefixes for generated entity identifiers.
//!
//! IDs take the form `{prefix}-{8 hex chars}`, e.g. `con-a3f8b2c1`. Doctor and
//! patient IDs are owned by other subsystems and are stored verbatim.

pub const PREFIX_CONSULTATION: &str = "con";
pub const PREFIX_PARTICIPANT: &str = "cpt";

/// Every prefix generated by this workspace.
pub const ALL_PREFIXES: &[&str] = &[PREFIX_CONSULTATION, PREFIX_PARTICIPANT];
