//! Structural reader for ISA-tab files.
//!
//! Only the tabular shape is read here: investigation files become ordered
//! sections of key/value rows, study and assay files become a header plus data
//! rows. Column semantics (materials, processes, ontology terms) are left to
//! the caller.

use serde::Serialize;

use crate::error::SodarError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvestigationInfo {
    pub file_name: String,
    pub sections: Vec<Section>,
}

impl InvestigationInfo {
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub name: String,
    pub rows: Vec<SectionRow>,
}

impl Section {
    pub fn values(&self, key: &str) -> Option<&[String]> {
        self.rows
            .iter()
            .find(|row| row.key == key)
            .map(|row| row.values.as_slice())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionRow {
    pub key: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudySheet {
    pub study_id: String,
    pub file: String,
    pub table: Table,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssaySheet {
    pub study_id: String,
    pub assay_id: String,
    pub file: String,
    pub table: Table,
}

pub trait IsaTabReader {
    fn read_investigation(&self, text: &str, filename: &str)
    -> Result<InvestigationInfo, SodarError>;
    fn read_study(&self, study_id: &str, text: &str, filename: &str)
    -> Result<StudySheet, SodarError>;
    fn read_assay(
        &self,
        study_id: &str,
        assay_id: &str,
        text: &str,
        filename: &str,
    ) -> Result<AssaySheet, SodarError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TsvReader;

impl IsaTabReader for TsvReader {
    fn read_investigation(
        &self,
        text: &str,
        filename: &str,
    ) -> Result<InvestigationInfo, SodarError> {
        let mut sections: Vec<Section> = Vec::new();
        for (line_no, cells) in content_lines(text) {
            if cells.len() == 1 && is_section_name(&cells[0]) {
                sections.push(Section {
                    name: cells[0].clone(),
                    rows: Vec::new(),
                });
                continue;
            }
            let section = sections
                .last_mut()
                .ok_or_else(|| malformed(filename, line_no, "row outside of any section"))?;
            let mut cells = cells.into_iter();
            let key = cells.next().unwrap_or_default();
            if key.is_empty() {
                return Err(malformed(filename, line_no, "row without key"));
            }
            section.rows.push(SectionRow {
                key,
                values: cells.collect(),
            });
        }
        if sections.is_empty() {
            return Err(malformed(filename, 0, "no sections found"));
        }
        Ok(InvestigationInfo {
            file_name: filename.to_string(),
            sections,
        })
    }

    fn read_study(
        &self,
        study_id: &str,
        text: &str,
        filename: &str,
    ) -> Result<StudySheet, SodarError> {
        Ok(StudySheet {
            study_id: study_id.to_string(),
            file: filename.to_string(),
            table: read_table(text, filename)?,
        })
    }

    fn read_assay(
        &self,
        study_id: &str,
        assay_id: &str,
        text: &str,
        filename: &str,
    ) -> Result<AssaySheet, SodarError> {
        Ok(AssaySheet {
            study_id: study_id.to_string(),
            assay_id: assay_id.to_string(),
            file: filename.to_string(),
            table: read_table(text, filename)?,
        })
    }
}

fn read_table(text: &str, filename: &str) -> Result<Table, SodarError> {
    let mut lines = content_lines(text);
    let (header_line, header) = lines
        .next()
        .ok_or_else(|| malformed(filename, 0, "missing header row"))?;
    if header.iter().any(|cell| cell.is_empty()) {
        return Err(malformed(filename, header_line, "empty header cell"));
    }

    let mut rows = Vec::new();
    for (line_no, mut cells) in lines {
        if cells.len() > header.len() {
            return Err(malformed(
                filename,
                line_no,
                &format!("{} cells but header has {}", cells.len(), header.len()),
            ));
        }
        cells.resize(header.len(), String::new());
        rows.push(cells);
    }
    Ok(Table { header, rows })
}

/// Yields `(1-based line number, cells)` for non-blank, non-comment lines.
/// Trailing empty cells are dropped and surrounding quotes removed.
fn content_lines(text: &str) -> impl Iterator<Item = (usize, Vec<String>)> + '_ {
    text.lines().enumerate().filter_map(|(idx, line)| {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() || line.starts_with('#') {
            return None;
        }
        let mut cells: Vec<String> = line.split('\t').map(unquote).collect();
        while cells.last().is_some_and(|cell| cell.is_empty()) {
            cells.pop();
        }
        Some((idx + 1, cells))
    })
}

fn unquote(cell: &str) -> String {
    let cell = cell.trim();
    cell.strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(cell)
        .to_string()
}

fn is_section_name(cell: &str) -> bool {
    !cell.is_empty()
        && cell
            .chars()
            .all(|ch| ch.is_ascii_uppercase() || ch == ' ' || ch == '_')
}

fn malformed(file: &str, line: usize, message: &str) -> SodarError {
    SodarError::IsaTab {
        file: file.to_string(),
        line,
        message: message.to_string(),
    }
}
