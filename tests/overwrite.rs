use std::collections::VecDeque;
use std::fs;
use std::io::Write;

use camino::Utf8PathBuf;

use sodar_sync::domain::format_size;
use sodar_sync::error::SodarError;
use sodar_sync::overwrite::{
    Console, Destination, DiffStatus, WriteOptions, WriteOutcome, overwrite_helper,
};

#[derive(Default)]
struct BufferConsole {
    diagnostics: Vec<u8>,
    stdout: Vec<u8>,
    answers: VecDeque<String>,
    prompts: usize,
}

impl BufferConsole {
    fn answering(answer: &str) -> Self {
        Self {
            answers: VecDeque::from([answer.to_string()]),
            ..Default::default()
        }
    }

    fn diagnostics_text(&self) -> String {
        String::from_utf8(self.diagnostics.clone()).unwrap()
    }
}

impl Console for BufferConsole {
    fn diagnostics(&mut self) -> &mut dyn Write {
        &mut self.diagnostics
    }

    fn stdout(&mut self) -> &mut dyn Write {
        &mut self.stdout
    }

    fn confirm(&mut self, _question: &str) -> Result<bool, SodarError> {
        self.prompts += 1;
        let answer = self.answers.pop_front().unwrap_or_default();
        Ok(sodar_sync::overwrite::is_affirmative(&answer))
    }

    fn columns(&self) -> usize {
        100
    }

    fn colored(&self) -> bool {
        false
    }
}

fn scratch_file(content: Option<&str>) -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(temp.path().join("s_Study.txt")).unwrap();
    if let Some(content) = content {
        fs::write(path.as_std_path(), content).unwrap();
    }
    (temp, path)
}

#[test]
fn dry_run_never_touches_destination() {
    for show_diff in [false, true] {
        for side_by_side in [false, true] {
            let (_temp, path) = scratch_file(Some("old\n"));
            let mut console = BufferConsole::answering("y");
            let report = overwrite_helper(
                &Destination::File(path.clone()),
                "new\n",
                WriteOptions {
                    do_write: false,
                    show_diff,
                    side_by_side,
                    assume_yes: true,
                },
                &mut console,
            )
            .unwrap();
            assert_eq!(report.outcome, WriteOutcome::Skipped);
            assert_eq!(fs::read_to_string(path.as_std_path()).unwrap(), "old\n");
            assert_eq!(console.prompts, 0);
        }
    }
}

#[test]
fn stdout_streams_without_prompt() {
    let mut console = BufferConsole::default();
    let report = overwrite_helper(
        &Destination::parse("-"),
        "Sample Name\nS1\n",
        WriteOptions {
            do_write: true,
            show_diff: true,
            side_by_side: false,
            assume_yes: false,
        },
        &mut console,
    )
    .unwrap();
    assert_eq!(report.outcome, WriteOutcome::Streamed);
    assert_eq!(report.diff, DiffStatus::Changed);
    assert_eq!(console.prompts, 0);
    assert_eq!(console.stdout, b"Sample Name\nS1\n");
    assert!(console.diagnostics_text().contains("+Sample Name"));
}

#[test]
fn confirmed_write_replaces_content() {
    let (_temp, path) = scratch_file(Some("a\nb\n"));
    let mut console = BufferConsole::answering("Yes");
    let report = overwrite_helper(
        &Destination::File(path.clone()),
        "a\nc\n",
        WriteOptions {
            do_write: true,
            show_diff: true,
            side_by_side: false,
            assume_yes: false,
        },
        &mut console,
    )
    .unwrap();
    assert_eq!(report.outcome, WriteOutcome::Written);
    assert_eq!(console.prompts, 1);
    assert_eq!(fs::read_to_string(path.as_std_path()).unwrap(), "a\nc\n");
    let diff = console.diagnostics_text();
    assert!(diff.contains("-b\n"));
    assert!(diff.contains("+c\n"));
}

#[test]
fn declined_write_is_not_an_error() {
    let (_temp, path) = scratch_file(Some("a\n"));
    let mut console = BufferConsole::answering("no");
    let report = overwrite_helper(
        &Destination::File(path.clone()),
        "b\n",
        WriteOptions {
            do_write: true,
            ..Default::default()
        },
        &mut console,
    )
    .unwrap();
    assert_eq!(report.outcome, WriteOutcome::Declined);
    assert_eq!(report.diff, DiffStatus::NotShown);
    assert_eq!(fs::read_to_string(path.as_std_path()).unwrap(), "a\n");
}

#[test]
fn assume_yes_skips_prompt() {
    let (_temp, path) = scratch_file(None);
    let nested = path.parent().unwrap().join("out").join("a_assay.txt");
    let mut console = BufferConsole::default();
    let report = overwrite_helper(
        &Destination::File(nested.clone()),
        "Sample Name\n",
        WriteOptions {
            do_write: true,
            show_diff: false,
            side_by_side: false,
            assume_yes: true,
        },
        &mut console,
    )
    .unwrap();
    assert_eq!(report.outcome, WriteOutcome::Written);
    assert_eq!(report.bytes, 12);
    assert_eq!(format_size(report.bytes), "12.0B");
    assert_eq!(console.prompts, 0);
    assert_eq!(
        fs::read_to_string(nested.as_std_path()).unwrap(),
        "Sample Name\n"
    );
}

#[test]
fn identical_content_reports_unchanged() {
    let (_temp, path) = scratch_file(Some("Source Name\tSample Name\nS1\tS1-N1\n"));
    for side_by_side in [false, true] {
        let mut console = BufferConsole::answering("y");
        let report = overwrite_helper(
            &Destination::File(path.clone()),
            "Source Name\tSample Name\nS1\tS1-N1",
            WriteOptions {
                do_write: true,
                show_diff: true,
                side_by_side,
                assume_yes: false,
            },
            &mut console,
        )
        .unwrap();
        assert_eq!(report.diff, DiffStatus::Unchanged);
        assert!(console.diagnostics.is_empty());
        assert_eq!(report.outcome, WriteOutcome::Written);
    }
}

#[test]
fn missing_destination_diffs_against_empty() {
    let (_temp, path) = scratch_file(None);
    let mut console = BufferConsole::default();
    let report = overwrite_helper(
        &Destination::File(path.clone()),
        "x\ny\n",
        WriteOptions {
            do_write: false,
            show_diff: true,
            side_by_side: false,
            assume_yes: false,
        },
        &mut console,
    )
    .unwrap();
    assert_eq!(report.diff, DiffStatus::Changed);
    assert!(!path.as_std_path().exists());
    let diff = console.diagnostics_text();
    assert!(diff.contains("@@ -0,0 +1,2 @@"));
    assert!(diff.contains("+x\n+y\n"));
}
