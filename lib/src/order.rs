//! Load-order preserving copies of vendor scripts.
//!
//! Every file matched by the `i`th of `n` patterns is renamed with the prefix
//! `pad(i, digits(n), '0') + "-"`. With fixed-width prefixes a lexical sort
//! of the copied files reproduces pattern order, so a later glob over the
//! destination (which is sorted) concatenates the scripts in load order.

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::error::Result;
use crate::fileset::{FileSet, Globs, Matched};
use crate::pipeline::Pipeline;
use crate::report::Report;
use crate::transform::Rename;
use crate::util::{digits, pad, PathExt};

/// The prefix for the `index`th of `count` patterns.
pub fn order_prefix(index: usize, count: usize) -> String {
    format!("{}-", pad(index, digits(count), '0'))
}

/// Resolves each including pattern of `globs` on its own and pairs every
/// matched file with the prefix of its pattern. Excluding patterns apply to
/// all of them. A pattern that matches nothing contributes nothing.
pub fn vendor_manifest(root: &Path, globs: &Globs) -> Result<Vec<(Matched, String)>> {
    let patterns: Vec<&str> = globs.includes().collect();
    let excludes: Vec<String> = globs.excludes().map(|p| format!("!{p}")).collect();
    let count = patterns.len();

    let resolved = patterns.par_iter()
        .enumerate()
        .map(|(i, pattern)| {
            let globs = Globs::one(*pattern).concat(&Globs(excludes.clone()));
            let files = FileSet::resolve(root, &globs)?;
            let prefix = order_prefix(i, count);
            Ok(files.files.into_iter().map(|m| (m, prefix.clone())).collect::<Vec<_>>())
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(resolved.into_iter().flatten().collect())
}

/// The path a manifest entry is copied to below `dest`.
pub fn ordered_path(dest: &Path, entry: &(Matched, String)) -> PathBuf {
    let (matched, prefix) = entry;
    let relative = matched.path.strip_prefix(&matched.base).unwrap_or(&matched.path);
    dest.join(relative.with_prefix(prefix))
}

/// Copies the vendor scripts matched by `globs` into `dest`, prefixed in
/// pattern order. Returns once every copy is written.
pub fn order_vendor(root: &Path, globs: &Globs, dest: &Path) -> Result<Report> {
    let manifest = vendor_manifest(root, globs)?;
    tracing::debug!(files = manifest.len(), dest = %dest.display(), "ordering vendor scripts");

    let mut groups: Vec<(String, FileSet)> = vec![];
    for (matched, prefix) in manifest {
        match groups.last_mut() {
            Some((last, set)) if *last == prefix => set.files.push(matched),
            _ => groups.push((prefix, FileSet { files: vec![matched] })),
        }
    }

    let reports = groups.par_iter()
        .map(|(prefix, files)| {
            let report = Pipeline::src("order-vendor", files)?
                .pipe(Rename::new().prefix(prefix.as_str()))
                .dest(dest)?
                .finish();

            Ok(report)
        })
        .collect::<Result<Vec<Report>>>()?;

    Ok(reports.into_iter().collect())
}
