use super::types::{Candidates, ProofRequest, SelectedCredentials};

/// `select_first_match` picks the first candidate of every requested attribute
///
/// Attributes are visited in the request's referent order. The first referent without
/// any candidate is returned as the error.
pub fn select_first_match(
    request: &ProofRequest,
    candidates: &Candidates,
) -> Result<SelectedCredentials, String> {
    let mut selected = SelectedCredentials::new();
    for referent in request.requested_attributes.keys() {
        let first = candidates
            .get(referent)
            .and_then(|found| found.first())
            .ok_or_else(|| referent.to_owned())?;

        selected.insert(referent.to_owned(), first.to_owned());
    }

    Ok(selected)
}
