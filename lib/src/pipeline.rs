use std::path::Path;
use std::sync::Arc;

use rayon::prelude::*;

use crate::asset::Asset;
use crate::error::Result;
use crate::fileset::FileSet;
use crate::report::Report;
use crate::transform::{Batch, Transform};

/// A stream of assets read from a [`FileSet`], rewritten by a chain of
/// [`Transform`]s, and written to one or more destinations.
///
/// ```rust,no_run
/// use std::path::Path;
/// use sluice::fileset::{FileSet, Globs};
/// use sluice::pipeline::Pipeline;
/// use sluice::transform::{Concat, Lint};
///
/// let root = Path::new(".");
/// let files = FileSet::resolve(root, &Globs::one("src/js/**/*.js"))?;
/// let report = Pipeline::src("scripts", &files)?
///     .pipe(Lint::js())
///     .pipe(Concat::new("app.js"))
///     .dest(&root.join("build/js"))?
///     .finish();
///
/// println!("{report}");
/// # Ok::<(), sluice::error::Error>(())
/// ```
#[derive(Debug)]
pub struct Pipeline {
    name: Arc<str>,
    batch: Batch,
    report: Report,
}

impl Pipeline {
    /// Reads every file in `files`, in order.
    pub fn src<N: Into<Arc<str>>>(name: N, files: &FileSet) -> Result<Self> {
        Ok(Pipeline::from_assets(name, files.read()?))
    }

    /// Reads every file of each set, set after set. Files keep their order
    /// within a set and sets keep their order in the stream.
    pub fn queue<N: Into<Arc<str>>>(name: N, sets: &[FileSet]) -> Result<Self> {
        let mut assets = vec![];
        for set in sets {
            assets.extend(set.read()?);
        }

        Ok(Pipeline::from_assets(name, assets))
    }

    pub fn from_assets<N: Into<Arc<str>>>(name: N, assets: Vec<Asset>) -> Self {
        let name = name.into();
        tracing::debug!(pipeline = &*name, files = assets.len(), "reading sources");
        Pipeline { name, batch: Batch::new(assets), report: Report::new() }
    }

    pub fn pipe<T: Transform>(mut self, transform: T) -> Self {
        let batch = std::mem::take(&mut self.batch);
        self.batch = transform.apply(batch);
        tracing::debug!(
            pipeline = &*self.name,
            stage = transform.name(),
            files = self.batch.assets.len(),
            "applied stage"
        );

        self
    }

    /// Applies `transform` if there is one.
    pub fn pipe_opt<T: Transform>(self, transform: Option<T>) -> Self {
        match transform {
            Some(transform) => self.pipe(transform),
            None => self,
        }
    }

    /// Writes every asset below `dir`. The assets stay in the stream, so the
    /// pipeline can continue or write to another destination.
    pub fn dest(mut self, dir: &Path) -> Result<Self> {
        let written: Vec<_> = self.batch.assets.par_iter()
            .map(|asset| asset.write_to(dir))
            .collect::<Result<_>>()?;

        for path in written {
            tracing::debug!(pipeline = &*self.name, file = %path.display(), "wrote");
            self.report.record_write(path);
        }

        Ok(self)
    }

    pub fn assets(&self) -> &[Asset] {
        &self.batch.assets
    }

    /// Ends the stream. Failures recorded along the way were logged as they
    /// happened and are handed over to the report.
    pub fn finish(mut self) -> Report {
        self.report.failures.append(&mut self.batch.failures);
        self.report
    }
}

/// Runs two independent pieces of work in parallel and joins their reports.
/// If both fail, the second error is chained behind the first.
pub fn merge<A, B>(a: A, b: B) -> Result<Report>
    where A: FnOnce() -> Result<Report> + Send, B: FnOnce() -> Result<Report> + Send
{
    match rayon::join(a, b) {
        (Ok(a), Ok(b)) => Ok(a.merge(b)),
        (Ok(_), Err(e)) | (Err(e), Ok(_)) => Err(e),
        (Err(e1), Err(e2)) => Err(e1.chain(e2)),
    }
}
