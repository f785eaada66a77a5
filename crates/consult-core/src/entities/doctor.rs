use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A doctor from the directory.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Doctor {
    pub id: String,
    pub name: String,
    pub lname: String,
    pub email: String,
    pub phone: String,
    pub workplace: Option<String>,
    pub verified: bool,
}

/// A doctor joined with the values the search ranking sorts on.
///
/// `score` is the latest recorded aggregate score, `None` when the doctor has
/// never been scored. `patient_count` is the number of patient cases owned.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct DoctorCandidate {
    #[serde(flatten)]
    pub doctor: Doctor,
    pub score: Option<f64>,
    pub patient_count: u32,
}

impl DoctorCandidate {
    /// Score used for ranking; unscored doctors rank as zero.
    #[must_use]
    pub fn effective_score(&self) -> f64 {
        self.score.unwrap_or(0.0)
    }
}
