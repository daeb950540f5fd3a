use std::io::{self, Write};

use serde::Serialize;

use crate::models::{Investigation, LandingZone};
use crate::sheets::IsaData;
use crate::tools::ToolReport;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Human,
    Json,
}

#[derive(Debug, Clone, Serialize)]
pub struct SheetSummary {
    pub investigation: String,
    pub studies: Vec<TableSummary>,
    pub assays: Vec<TableSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    pub path: String,
    pub columns: usize,
    pub rows: usize,
}

impl From<&IsaData> for SheetSummary {
    fn from(data: &IsaData) -> Self {
        Self {
            investigation: data.investigation_filename().to_string(),
            studies: data
                .studies()
                .iter()
                .map(|(path, study)| TableSummary {
                    path: path.clone(),
                    columns: study.table.header.len(),
                    rows: study.table.rows.len(),
                })
                .collect(),
            assays: data
                .assays()
                .iter()
                .map(|(path, assay)| TableSummary {
                    path: path.clone(),
                    columns: assay.table.header.len(),
                    rows: assay.table.rows.len(),
                })
                .collect(),
        }
    }
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_investigation(investigation: &Investigation) -> io::Result<()> {
        Self::print_json(investigation)
    }

    pub fn print_landing_zones(zones: &[LandingZone]) -> io::Result<()> {
        Self::print_json(&zones)
    }

    pub fn print_landing_zone(zone: &LandingZone) -> io::Result<()> {
        Self::print_json(zone)
    }

    pub fn print_sheet(summary: &SheetSummary) -> io::Result<()> {
        Self::print_json(summary)
    }

    pub fn print_tools(report: &ToolReport) -> io::Result<()> {
        Self::print_json(report)
    }

    fn print_json<T: Serialize + ?Sized>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

pub struct TextOutput;

impl TextOutput {
    pub fn print_investigation(investigation: &Investigation) -> io::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(
            out,
            "investigation {} ({})",
            investigation.identifier.as_deref().unwrap_or("-"),
            investigation.file_name.as_deref().unwrap_or("-")
        )?;
        if let Some(title) = &investigation.title {
            writeln!(out, "  title: {title}")?;
        }
        for (uuid, study) in &investigation.studies {
            writeln!(
                out,
                "  study {uuid} {}",
                study.file_name.as_deref().unwrap_or("-")
            )?;
            for (uuid, assay) in &study.assays {
                writeln!(
                    out,
                    "    assay {uuid} {}",
                    assay.file_name.as_deref().unwrap_or("-")
                )?;
            }
        }
        Ok(())
    }

    pub fn print_landing_zones(zones: &[LandingZone]) -> io::Result<()> {
        let mut out = io::stdout().lock();
        if zones.is_empty() {
            writeln!(out, "no landing zones")?;
            return Ok(());
        }
        for zone in zones {
            Self::write_zone(&mut out, zone)?;
        }
        Ok(())
    }

    pub fn print_landing_zone(zone: &LandingZone) -> io::Result<()> {
        Self::write_zone(&mut io::stdout().lock(), zone)
    }

    fn write_zone(out: &mut impl Write, zone: &LandingZone) -> io::Result<()> {
        let modified = zone
            .modified_at()
            .map(|date| date.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            out,
            "{}\t{}\t{}\tassay={}\t{}",
            zone.sodar_uuid,
            zone.status.as_deref().unwrap_or("-"),
            modified,
            zone.assay,
            zone.title.as_deref().unwrap_or("")
        )
    }

    pub fn print_sheet(summary: &SheetSummary) -> io::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "investigation: {}", summary.investigation)?;
        for study in &summary.studies {
            writeln!(
                out,
                "study: {} ({} rows, {} columns)",
                study.path, study.rows, study.columns
            )?;
        }
        for assay in &summary.assays {
            writeln!(
                out,
                "assay: {} ({} rows, {} columns)",
                assay.path, assay.rows, assay.columns
            )?;
        }
        Ok(())
    }

    pub fn print_tools(report: &ToolReport) -> io::Result<()> {
        let mut out = io::stdout().lock();
        for tool in &report.tools {
            match &tool.path {
                Some(path) => writeln!(out, "{}\t{}", tool.name, path.display())?,
                None => writeln!(out, "{}\tmissing", tool.name)?,
            }
        }
        Ok(())
    }
}
