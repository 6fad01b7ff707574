//! Import and export of mock definitions as JSON files.

use crate::model::Mock;
use crate::store::MockStore;
use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Outcome of reading an import directory.
#[derive(Debug, Default)]
pub struct ImportReport {
    /// Definitions that parsed and validated
    pub mocks: Vec<Mock>,
    /// One `[OK]` or `[FAILED]` line per validated file
    pub statuses: Vec<String>,
}

/// File name a mock is exported under.
pub fn export_file_name(mock: &Mock) -> String {
    let url_path = match mock.exact_path() {
        Some(path) => path.replace('/', "_"),
        None => mock
            .regex_pattern()
            .unwrap_or_default()
            .replace('\\', "")
            .replace('/', "_"),
    };
    format!("{}_{}{}.json", mock.id, mock.method, url_path)
}

/// Write each mock to its own file under `dir`.
///
/// Returns the files written. Mocks that fail to write are logged and skipped.
pub fn export_mocks(dir: &Path, mocks: &[Mock]) -> anyhow::Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory {}", dir.display()))?;

    let mut files = Vec::new();
    for mock in mocks {
        let path = dir.join(export_file_name(mock));
        let written = serde_json::to_vec_pretty(mock)
            .map_err(anyhow::Error::from)
            .and_then(|data| fs::write(&path, data).map_err(anyhow::Error::from));
        match written {
            Ok(()) => files.push(path),
            Err(e) => warn!(
                mock_id = mock.id,
                file = %path.display(),
                error = %e,
                "Failed to export mock"
            ),
        }
    }

    info!(dir = %dir.display(), exported = files.len(), "Exported mocks");
    Ok(files)
}

/// Read and validate every `*.json` file in `dir`, in name order.
pub fn import_mocks(dir: &Path) -> anyhow::Result<ImportReport> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read import directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut report = ImportReport::default();
    for path in paths {
        let content = match fs::read(&path) {
            Ok(c) => c,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Failed to read mock file");
                continue;
            }
        };
        let mock: Mock = match serde_json::from_slice(&content) {
            Ok(m) => m,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Failed to parse mock file");
                continue;
            }
        };

        let violations = mock.validate();
        let status = if violations.is_empty() {
            report.mocks.push(mock);
            "[OK]"
        } else {
            warn!(
                file = %path.display(),
                violations = ?violations,
                "Import failed, found validation errors"
            );
            "[FAILED]"
        };
        report.statuses.push(format!("{:<8} {}", status, path.display()));
    }

    Ok(report)
}

/// Import every valid mock from `dir` into `store`.
pub fn import_into_store(store: &dyn MockStore, dir: &Path) -> anyhow::Result<Vec<String>> {
    let report = import_mocks(dir)?;
    for mock in report.mocks {
        store.save(mock).context("Failed to save imported mock")?;
    }
    info!(dir = %dir.display(), files = report.statuses.len(), "Imported mocks");
    Ok(report.statuses)
}
