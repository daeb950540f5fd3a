use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum SodarError {
    #[error("invalid UUID: {0}")]
    InvalidUuid(String),

    #[error("missing parameter: {0}")]
    MissingParameter(String),

    #[error("missing configuration: {0}")]
    #[diagnostic(help("pass it on the command line, via the environment or in ~/.sodar-sync.json"))]
    MissingConfig(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("SODAR request failed: {0}")]
    Http(String),

    #[error("SODAR returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("unexpected SODAR response: {0}")]
    Decode(String),

    #[error("expected one {level}, found {found}")]
    #[diagnostic(help("try specifying an explicit --assay parameter"))]
    AmbiguousTarget { level: TargetLevel, found: usize },

    #[error("unsupported ISA-tab feature: {0}")]
    UnsupportedFeature(String),

    #[error("malformed ISA-tab file {file} (line {line}): {message}")]
    IsaTab {
        file: String,
        line: usize,
        message: String,
    },

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("required tool not found: {0}")]
    MissingTool(String),
}

impl SodarError {
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            SodarError::Http(_) | SodarError::Status { .. } | SodarError::Decode(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetLevel {
    Study,
    Assay,
}

impl std::fmt::Display for TargetLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetLevel::Study => write!(f, "study"),
            TargetLevel::Assay => write!(f, "assay"),
        }
    }
}
