use std::path::PathBuf;

use serde::Serialize;
use tracing::warn;

use crate::error::SodarError;

pub const IRODS_ICOMMANDS: [&str; 4] = ["iinit", "iput", "iget", "irsync"];

#[derive(Debug, Clone, Serialize)]
pub struct ToolStatus {
    pub name: String,
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolReport {
    pub tools: Vec<ToolStatus>,
}

impl ToolReport {
    pub fn missing(&self) -> Vec<&str> {
        self.tools
            .iter()
            .filter(|tool| tool.path.is_none())
            .map(|tool| tool.name.as_str())
            .collect()
    }
}

/// Looks up the iRODS icommands on `PATH`. Missing tools are a warning
/// unless `strict` is set.
pub fn check_irods_icommands(strict: bool) -> Result<ToolReport, SodarError> {
    check_tools(&IRODS_ICOMMANDS, strict)
}

pub fn check_tools(names: &[&str], strict: bool) -> Result<ToolReport, SodarError> {
    let report = ToolReport {
        tools: names
            .iter()
            .map(|name| ToolStatus {
                name: name.to_string(),
                path: find_in_path(name),
            })
            .collect(),
    };

    let missing = report.missing();
    if !missing.is_empty() {
        let message = missing.join(", ");
        if strict {
            return Err(SodarError::MissingTool(message));
        }
        warn!("Could not find executables: {message}");
    }
    Ok(report)
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let exe = path.join(format!("{name}.exe"));
        if exe.exists() {
            return Some(exe);
        }
        let plain = path.join(name);
        if plain.is_file() {
            return Some(plain);
        }
    }
    None
}
