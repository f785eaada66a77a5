//! Pure matching and ranking over doctor candidates.
//!
//! A candidate matches when any query token is a case-insensitive substring
//! of any of its name, last name, email or phone. Matches are ordered by
//! latest score (missing counts as zero), then by patient count, both
//! descending. The sort is stable, so ties keep the input order.

use std::cmp::Ordering;

use consult_core::entities::DoctorCandidate;

use crate::error::SearchError;

/// Split a free-text query into lowercase tokens.
///
/// # Errors
///
/// Returns [`SearchError::InvalidQuery`] if the query has no tokens.
pub fn tokenize(query: &str) -> Result<Vec<String>, SearchError> {
    let tokens: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
    if tokens.is_empty() {
        return Err(SearchError::InvalidQuery(
            "search query cannot be empty".to_string(),
        ));
    }
    Ok(tokens)
}

/// Whether any token appears in any searchable field.
#[must_use]
pub fn matches(candidate: &DoctorCandidate, tokens: &[String]) -> bool {
    let doctor = &candidate.doctor;
    let fields = [
        doctor.name.to_lowercase(),
        doctor.lname.to_lowercase(),
        doctor.email.to_lowercase(),
        doctor.phone.to_lowercase(),
    ];
    tokens
        .iter()
        .any(|token| fields.iter().any(|field| field.contains(token.as_str())))
}

fn by_suitability(a: &DoctorCandidate, b: &DoctorCandidate) -> Ordering {
    b.effective_score()
        .total_cmp(&a.effective_score())
        .then_with(|| b.patient_count.cmp(&a.patient_count))
}

/// Keep matching candidates and order them by suitability.
#[must_use]
pub fn rank(candidates: Vec<DoctorCandidate>, tokens: &[String]) -> Vec<DoctorCandidate> {
    let mut hits: Vec<_> = candidates
        .into_iter()
        .filter(|c| matches(c, tokens))
        .collect();
    hits.sort_by(by_suitability);
    hits
}
