use std::collections::BTreeMap;

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SodarError;
use crate::isatab::{AssaySheet, InvestigationInfo, IsaTabReader, StudySheet};
use crate::landing_zones::{Resolution, single_entry};

/// One file of the JSON sample sheet export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSheetFile {
    pub tsv: String,
    pub path: String,
}

/// Body of the sample sheet JSON export; studies and assays are keyed by path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSampleSheet {
    pub investigation: RawSheetFile,
    #[serde(default)]
    pub studies: BTreeMap<String, RawSheetFile>,
    #[serde(default)]
    pub assays: BTreeMap<String, RawSheetFile>,
}

/// Investigation, studies and assays of one project, parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IsaData {
    investigation: InvestigationInfo,
    investigation_filename: String,
    studies: BTreeMap<String, StudySheet>,
    assays: BTreeMap<String, AssaySheet>,
}

impl IsaData {
    pub fn investigation(&self) -> &InvestigationInfo {
        &self.investigation
    }

    pub fn investigation_filename(&self) -> &str {
        &self.investigation_filename
    }

    pub fn studies(&self) -> &BTreeMap<String, StudySheet> {
        &self.studies
    }

    pub fn assays(&self) -> &BTreeMap<String, AssaySheet> {
        &self.assays
    }
}

/// Parses a raw sample sheet. Only sheets with exactly one study are supported.
pub fn assemble(raw: &RawSampleSheet, reader: &dyn IsaTabReader) -> Result<IsaData, SodarError> {
    let investigation =
        reader.read_investigation(&raw.investigation.tsv, &raw.investigation.path)?;

    let (study_path, study_file) = match single_entry(&raw.studies) {
        Resolution::Resolved(entry) => entry,
        Resolution::NoCandidates => {
            return Err(SodarError::UnsupportedFeature(
                "no study found in sample sheet".to_string(),
            ));
        }
        Resolution::ManyCandidates(found) => {
            return Err(SodarError::UnsupportedFeature(format!(
                "more than one study found ({found})"
            )));
        }
    };
    let study = reader.read_study(study_path, &study_file.tsv, study_path)?;
    debug!("read study {}", study.file);

    let assays = raw
        .assays
        .iter()
        .map(|(path, details)| {
            reader
                .read_assay(&study.file, path, &details.tsv, path)
                .map(|assay| (path.clone(), assay))
        })
        .collect::<Result<BTreeMap<_, _>, SodarError>>()?;

    let mut studies = BTreeMap::new();
    studies.insert(study_path.clone(), study);

    Ok(IsaData {
        investigation,
        investigation_filename: raw.investigation.path.clone(),
        studies,
        assays,
    })
}

/// Files of a raw sample sheet as `(relative path, content)`, investigation first.
pub fn export_files(raw: &RawSampleSheet) -> Result<Vec<(Utf8PathBuf, &str)>, SodarError> {
    std::iter::once(&raw.investigation)
        .chain(raw.studies.values())
        .chain(raw.assays.values())
        .map(|file| Ok((safe_relative_path(&file.path)?, file.tsv.as_str())))
        .collect()
}

fn safe_relative_path(path: &str) -> Result<Utf8PathBuf, SodarError> {
    let candidate = Utf8Path::new(path);
    let is_plain = candidate
        .components()
        .all(|component| matches!(component, Utf8Component::Normal(_) | Utf8Component::CurDir))
        && candidate
            .components()
            .any(|component| matches!(component, Utf8Component::Normal(_)));
    if !is_plain {
        return Err(SodarError::Filesystem(format!(
            "refusing to write sheet file to unsafe path: {path:?}"
        )));
    }
    Ok(candidate.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str) -> RawSheetFile {
        RawSheetFile {
            tsv: "Sample Name\n".to_string(),
            path: path.to_string(),
        }
    }

    #[test]
    fn export_lists_investigation_first() {
        let raw = RawSampleSheet {
            investigation: file("i_Investigation.txt"),
            studies: [("s_Study.txt".to_string(), file("s_Study.txt"))].into(),
            assays: [("a_assay.txt".to_string(), file("a_assay.txt"))].into(),
        };
        let files = export_files(&raw).unwrap();
        let names: Vec<_> = files.iter().map(|(path, _)| path.as_str()).collect();
        assert_eq!(names, ["i_Investigation.txt", "s_Study.txt", "a_assay.txt"]);
    }

    #[test]
    fn export_rejects_escaping_paths() {
        assert!(safe_relative_path("../i_Investigation.txt").is_err());
        assert!(safe_relative_path("/etc/passwd").is_err());
        assert!(safe_relative_path("").is_err());
        assert!(safe_relative_path("sub/a_assay.txt").is_ok());
    }

    #[test]
    fn export_rejects_paths_naming_the_output_directory() {
        for path in [".", "./", "./."] {
            assert!(safe_relative_path(path).is_err(), "{path}");
        }
        assert_eq!(
            safe_relative_path("./s_Study.txt").unwrap(),
            Utf8PathBuf::from("./s_Study.txt")
        );
    }
}
