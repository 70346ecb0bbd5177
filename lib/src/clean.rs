use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, Chainable};
use crate::report::Report;

/// Deletes everything below each directory in `dirs`, keeping the
/// directories themselves, and reports every removed path, deepest first.
///
/// Directories that are empty or don't exist are skipped, so cleaning twice
/// in a row removes nothing the second time.
pub fn clean<P: AsRef<Path>>(dirs: &[P]) -> Result<Report> {
    let mut report = Report::new();
    for dir in dirs {
        let dir = dir.as_ref();
        if dir.as_os_str().is_empty() || dir.parent().is_none() {
            return err!("refusing to clean a file system root", "path" => dir.display());
        }

        if !dir.is_dir() {
            tracing::debug!(dir = %dir.display(), "nothing to clean");
            continue;
        }

        let mut entries: Vec<PathBuf> = jwalk::WalkDir::new(dir)
            .min_depth(1)
            .skip_hidden(false)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .collect();

        entries.sort_by(|a, b| b.components().count().cmp(&a.components().count()).then(a.cmp(b)));

        let children = fs::read_dir(dir).chain_with(|| error! {
            "failed to read output directory",
            "path" => dir.display(),
        })?;

        for child in children {
            let child = child.chain_with(|| error! {
                "failed to read output directory",
                "path" => dir.display(),
            })?;

            let path = child.path();
            let removed = match child.file_type().map(|t| t.is_dir()) {
                Ok(true) => fs::remove_dir_all(&path),
                _ => fs::remove_file(&path),
            };

            removed.chain_with(|| error! {
                "failed to remove output",
                "path" => path.display(),
            })?;
        }

        tracing::debug!(dir = %dir.display(), entries = entries.len(), "cleaned");
        for entry in entries {
            report.record_removal(entry);
        }
    }

    Ok(report)
}
