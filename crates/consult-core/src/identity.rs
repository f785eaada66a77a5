use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The authenticated doctor invoking an operation.
///
/// Resolved by the upstream auth layer and passed explicitly into every
/// coordinator and search call. `privileged` is the capability flag for
/// administrative/testing roles; the role vocabulary itself stays outside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Caller {
    pub doctor_id: String,
    #[serde(default)]
    pub privileged: bool,
}

impl Caller {
    #[must_use]
    pub fn doctor(doctor_id: impl Into<String>) -> Self {
        Self {
            doctor_id: doctor_id.into(),
            privileged: false,
        }
    }

    #[must_use]
    pub fn privileged(doctor_id: impl Into<String>) -> Self {
        Self {
            doctor_id: doctor_id.into(),
            privileged: true,
        }
    }
}
