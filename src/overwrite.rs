use std::fmt;
use std::fs;
use std::io::{self, BufRead, Read, Seek, SeekFrom, Write};

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

use crate::diff::{self, DiffMode};
use crate::domain::format_size;
use crate::error::SodarError;

/// Destination name that means "standard output".
pub const STDOUT_SENTINEL: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Stdout,
    File(Utf8PathBuf),
}

impl Destination {
    pub fn parse(value: &str) -> Self {
        if value == STDOUT_SENTINEL {
            Destination::Stdout
        } else {
            Destination::File(Utf8PathBuf::from(value))
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Destination::Stdout => STDOUT_SENTINEL,
            Destination::File(path) => path.as_str(),
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    pub do_write: bool,
    pub show_diff: bool,
    pub side_by_side: bool,
    pub assume_yes: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffStatus {
    NotShown,
    Unchanged,
    Changed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// `do_write` was off; nothing was touched.
    Skipped,
    Streamed,
    Written,
    /// The user did not confirm the overwrite.
    Declined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteReport {
    pub diff: DiffStatus,
    pub outcome: WriteOutcome,
    /// Size of the staged content.
    pub bytes: u64,
}

/// Where diffs, streamed content and confirmation prompts go.
pub trait Console {
    fn diagnostics(&mut self) -> &mut dyn Write;
    fn stdout(&mut self) -> &mut dyn Write;
    fn confirm(&mut self, question: &str) -> Result<bool, SodarError>;

    fn columns(&self) -> usize {
        diff::terminal_columns()
    }

    fn colored(&self) -> bool {
        true
    }
}

pub struct TerminalConsole {
    stderr: io::Stderr,
    stdout: io::Stdout,
}

impl TerminalConsole {
    pub fn new() -> Self {
        Self {
            stderr: io::stderr(),
            stdout: io::stdout(),
        }
    }
}

impl Default for TerminalConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for TerminalConsole {
    fn diagnostics(&mut self) -> &mut dyn Write {
        &mut self.stderr
    }

    fn stdout(&mut self) -> &mut dyn Write {
        &mut self.stdout
    }

    fn confirm(&mut self, question: &str) -> Result<bool, SodarError> {
        write!(self.stderr, "{question}").map_err(fs_error)?;
        self.stderr.flush().map_err(fs_error)?;
        let mut answer = String::new();
        io::stdin()
            .lock()
            .read_line(&mut answer)
            .map_err(fs_error)?;
        Ok(is_affirmative(&answer))
    }
}

pub fn is_affirmative(answer: &str) -> bool {
    answer.to_lowercase().starts_with('y')
}

/// Stages `contents`, optionally shows a diff against the current
/// destination, and writes it after confirmation.
pub fn overwrite_helper(
    destination: &Destination,
    contents: &str,
    options: WriteOptions,
    console: &mut dyn Console,
) -> Result<WriteReport, SodarError> {
    let mut staged = tempfile::Builder::new()
        .prefix("sodar-sync-stage")
        .tempfile()
        .map_err(fs_error)?;
    staged.write_all(contents.as_bytes()).map_err(fs_error)?;
    staged.flush().map_err(fs_error)?;
    let bytes = contents.len() as u64;

    let diff = if options.show_diff {
        show_diff(destination, &mut staged, options.side_by_side, console)?
    } else {
        DiffStatus::NotShown
    };

    if !options.do_write {
        return Ok(WriteReport {
            diff,
            outcome: WriteOutcome::Skipped,
            bytes,
        });
    }

    info!(
        "About to write {} of file contents to {destination}",
        format_size(bytes)
    );
    staged.seek(SeekFrom::Start(0)).map_err(fs_error)?;
    let outcome = match destination {
        Destination::Stdout => {
            let out = console.stdout();
            io::copy(staged.as_file_mut(), &mut *out).map_err(fs_error)?;
            out.flush().map_err(fs_error)?;
            WriteOutcome::Streamed
        }
        Destination::File(path) => {
            info!("See above for the diff that will be applied.");
            if options.assume_yes || console.confirm("Is this OK? [yN] ")? {
                persist_copy(&mut staged, path)?;
                WriteOutcome::Written
            } else {
                info!("Not writing {destination}");
                WriteOutcome::Declined
            }
        }
    };

    Ok(WriteReport {
        diff,
        outcome,
        bytes,
    })
}

fn show_diff(
    destination: &Destination,
    staged: &mut NamedTempFile,
    side_by_side: bool,
    console: &mut dyn Console,
) -> Result<DiffStatus, SodarError> {
    let old_text = match destination {
        Destination::File(path) if path.as_std_path().exists() => {
            fs::read_to_string(path.as_std_path()).map_err(fs_error)?
        }
        _ => String::new(),
    };
    let mut new_text = String::new();
    staged.seek(SeekFrom::Start(0)).map_err(fs_error)?;
    staged
        .as_file_mut()
        .read_to_string(&mut new_text)
        .map_err(fs_error)?;

    let old_lines: Vec<&str> = old_text.lines().collect();
    let new_lines: Vec<&str> = new_text.lines().collect();
    let mode = if side_by_side {
        DiffMode::SideBySide {
            columns: console.columns(),
        }
    } else {
        DiffMode::Unified
    };

    let colored = console.colored();
    let out = console.diagnostics();
    let mut emitted = 0usize;
    for line in diff::render(&old_lines, &new_lines, destination.label(), mode) {
        let text = if colored { line.styled() } else { line.text };
        writeln!(out, "{text}").map_err(fs_error)?;
        emitted += 1;
    }
    out.flush().map_err(fs_error)?;

    if emitted == 0 {
        info!("File {destination} not changed, no diff...");
        return Ok(DiffStatus::Unchanged);
    }
    Ok(DiffStatus::Changed)
}

/// Copies the staged content next to `path` and renames it into place.
fn persist_copy(staged: &mut NamedTempFile, path: &Utf8Path) -> Result<(), SodarError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent.to_path_buf(),
        _ => Utf8PathBuf::from("."),
    };
    fs::create_dir_all(parent.as_std_path()).map_err(fs_error)?;
    let mut target = tempfile::Builder::new()
        .prefix(".sodar-sync")
        .tempfile_in(parent.as_std_path())
        .map_err(fs_error)?;
    staged.seek(SeekFrom::Start(0)).map_err(fs_error)?;
    io::copy(staged.as_file_mut(), target.as_file_mut()).map_err(fs_error)?;
    if let Ok(metadata) = fs::metadata(path.as_std_path()) {
        target
            .as_file()
            .set_permissions(metadata.permissions())
            .map_err(fs_error)?;
    }
    target.as_file().sync_all().map_err(fs_error)?;
    target
        .persist(path.as_std_path())
        .map_err(|err| SodarError::Filesystem(format!("persist {path}: {}", err.error)))?;
    Ok(())
}

fn fs_error(err: io::Error) -> SodarError {
    SodarError::Filesystem(err.to_string())
}
