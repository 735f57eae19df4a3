//! Dataset fingerprinting: deterministic identification of reconciliation inputs.
//!
//! The hash covers every vintage point (in indicator, period, publication
//! order) and every survey response (in input order), so two runs with the
//! same fingerprint and policy produce identical `RGDPL` columns.

use crate::domain::DatasetHash;
use crate::vintage::{RevisionHistoryStore, SurveyRoundIndex};

/// BLAKE3 over the canonical contents of the store and the survey index.
pub fn dataset_hash(store: &RevisionHistoryStore, index: &SurveyRoundIndex) -> DatasetHash {
    let mut hasher = blake3::Hasher::new();

    for record in store.records() {
        hasher.update(record.indicator.as_str().as_bytes());
        hasher.update(record.period.to_string().as_bytes());
        hasher.update(record.publication_date.to_string().as_bytes());
        hasher.update(&record.value.to_le_bytes());
    }

    // Separator so store/survey boundaries cannot alias.
    hasher.update(b"|survey|");

    for response in index.responses() {
        hasher.update(response.round.to_string().as_bytes());
        hasher.update(response.respondent.0.as_bytes());
        match response.stated_value {
            Some(v) => hasher.update(&v.to_le_bytes()),
            None => hasher.update(b"NA"),
        };
    }

    DatasetHash(hasher.finalize().to_hex().to_string())
}
