#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use markstat::{report::ReportMetadata, sheet::RawSheet};
use tempfile::{TempDir, tempdir};

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Builds an in-memory sheet from literal rows.
pub fn sheet(rows: &[&[&str]]) -> RawSheet {
    RawSheet::from_rows(
        rows.iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect(),
    )
}

pub fn metadata() -> ReportMetadata {
    ReportMetadata {
        institution: "Institute of Technology".into(),
        program: "B.Tech (CSE)".into(),
        batch: "2022-2026".into(),
        semester: "5".into(),
    }
}

/// Command-line flags carrying [`metadata`].
pub fn metadata_args() -> Vec<&'static str> {
    vec![
        "--institution",
        "Institute of Technology",
        "--program",
        "B.Tech (CSE)",
        "--batch",
        "2022-2026",
        "--semester",
        "5",
    ]
}

/// Scratch directory for sheets and report output, removed on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    pub fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.temp_dir.path().join(relative)).expect("read output file")
    }
}
