use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Investigation as returned by the sample sheet API. Studies are keyed by their UUID.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Investigation {
    #[serde(default)]
    pub sodar_uuid: Option<String>,
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub irods_status: Option<bool>,
    #[serde(default)]
    pub parser_version: Option<String>,
    #[serde(default)]
    pub archive_name: Option<String>,
    #[serde(default)]
    pub comments: Option<Value>,
    #[serde(default)]
    pub studies: BTreeMap<String, Study>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Study {
    #[serde(default)]
    pub sodar_uuid: Option<String>,
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub comments: Option<Value>,
    #[serde(default)]
    pub assays: BTreeMap<String, Assay>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Assay {
    #[serde(default)]
    pub sodar_uuid: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub technology_platform: Option<String>,
    #[serde(default)]
    pub technology_type: Option<Value>,
    #[serde(default)]
    pub measurement_type: Option<Value>,
    #[serde(default)]
    pub comments: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LandingZone {
    pub sodar_uuid: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub user: Option<Value>,
    pub assay: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub status_info: Option<String>,
    #[serde(default)]
    pub date_modified: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub configuration: Option<String>,
    #[serde(default)]
    pub config_data: Option<Value>,
}

impl LandingZone {
    pub fn modified_at(&self) -> Option<DateTime<FixedOffset>> {
        self.date_modified
            .as_deref()
            .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_investigation_with_missing_fields() {
        let json = r#"{
            "sodar_uuid": "c339b4de-23a9-4cc3-8801-5f65b4739680",
            "file_name": "i_Investigation.txt",
            "studies": {
                "9b6b3de7-0e5c-4f43-a9f0-5f1e3d2c4a11": {
                    "file_name": "s_Study.txt",
                    "assays": {
                        "0a3b5b4e-1f8b-4c1e-9c2a-7d1e3f4a5b6c": {"file_name": "a_assay.txt"}
                    }
                }
            }
        }"#;
        let investigation: Investigation = serde_json::from_str(json).unwrap();
        assert_eq!(investigation.studies.len(), 1);
        let study = investigation.studies.values().next().unwrap();
        assert_eq!(study.assays.len(), 1);
        assert_eq!(investigation.title, None);
    }

    #[test]
    fn landing_zone_modified_at() {
        let zone = LandingZone {
            sodar_uuid: "a".to_string(),
            assay: "b".to_string(),
            date_modified: Some("2019-11-14T16:56:39.313214+01:00".to_string()),
            ..Default::default()
        };
        let modified = zone.modified_at().unwrap();
        assert_eq!(modified.format("%Y-%m-%d").to_string(), "2019-11-14");

        let zone = LandingZone {
            date_modified: Some("yesterday".to_string()),
            ..zone
        };
        assert!(zone.modified_at().is_none());
    }
}
