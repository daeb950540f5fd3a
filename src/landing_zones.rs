use std::collections::BTreeMap;

use tracing::{error, info};

use crate::domain::AssayUuid;
use crate::error::{SodarError, TargetLevel};
use crate::models::Investigation;

/// Outcome of picking the only entry of a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<T> {
    Resolved(T),
    NoCandidates,
    ManyCandidates(usize),
}

impl<T> Resolution<T> {
    pub fn into_result(self, level: TargetLevel) -> Result<T, SodarError> {
        match self {
            Resolution::Resolved(value) => Ok(value),
            Resolution::NoCandidates => Err(ambiguous(level, 0)),
            Resolution::ManyCandidates(found) => Err(ambiguous(level, found)),
        }
    }
}

fn ambiguous(level: TargetLevel, found: usize) -> SodarError {
    error!("Expected one {level}, found {found}");
    info!("Try specifying an explicit --assay parameter");
    SodarError::AmbiguousTarget { level, found }
}

pub fn single_entry<K, V>(map: &BTreeMap<K, V>) -> Resolution<(&K, &V)> {
    let mut entries = map.iter();
    match (entries.next(), map.len()) {
        (Some(entry), 1) => Resolution::Resolved(entry),
        (None, _) => Resolution::NoCandidates,
        (_, found) => Resolution::ManyCandidates(found),
    }
}

/// Picks the assay for a new landing zone when none was given: the
/// investigation must hold exactly one study with exactly one assay.
pub fn resolve_assay(investigation: &Investigation) -> Result<AssayUuid, SodarError> {
    let (_, study) = single_entry(&investigation.studies).into_result(TargetLevel::Study)?;
    let (assay_uuid, _) = single_entry(&study.assays).into_result(TargetLevel::Assay)?;
    assay_uuid.parse()
}
