//! # consult-search
//!
//! Doctor search for Consult: free-text keywords to candidate consult
//! doctors ordered by suitability.
//!
//! The candidate list (directory entry, latest score, patient count) is read
//! from consult-db in one query; matching and ranking are pure functions in
//! [`ranker`].

pub mod error;
pub mod ranker;

use consult_core::identity::Caller;
use consult_core::responses::DoctorSearchHit;
use consult_db::service::ConsultService;

use crate::error::SearchError;

/// Search the doctor directory for candidate consult doctors.
///
/// The caller is excluded from the results unless privileged.
///
/// # Errors
///
/// Returns [`SearchError::InvalidQuery`] if the query is empty.
/// Returns [`SearchError::Database`] if the candidate query fails.
pub async fn search_doctors(
    service: &ConsultService,
    query: &str,
    caller: &Caller,
) -> Result<Vec<DoctorSearchHit>, SearchError> {
    let tokens = ranker::tokenize(query)?;

    let candidates: Vec<_> = service
        .list_doctor_candidates()
        .await?
        .into_iter()
        .filter(|c| caller.privileged || c.doctor.id != caller.doctor_id)
        .collect();

    let ranked = ranker::rank(candidates, &tokens);
    tracing::debug!(query, hits = ranked.len(), "doctor search");
    Ok(ranked.into_iter().map(DoctorSearchHit::from).collect())
}
