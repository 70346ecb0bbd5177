use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::Error;

/// A problem with one file that did not stop the rest of the work.
#[derive(Debug, Clone)]
pub struct Failure {
    /// The name of the stage that reported the problem.
    pub stage: Arc<str>,
    /// The file at fault, if the problem concerns a single file.
    pub path: Option<PathBuf>,
    pub error: Error,
}

/// What a unit of work did: the files it wrote or removed and the per-file
/// failures it tolerated along the way.
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub written: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
    pub failures: Vec<Failure>,
}

impl Failure {
    pub fn new<S, P, E>(stage: S, path: P, error: E) -> Self
        where S: Into<Arc<str>>, P: Into<Option<PathBuf>>, E: Into<Error>
    {
        Failure { stage: stage.into(), path: path.into(), error: error.into() }
    }

    pub(crate) fn log(&self) {
        match &self.path {
            Some(path) => tracing::warn!(
                stage = &*self.stage,
                file = %path.display(),
                "{}", self.error.to_string().trim_end()
            ),
            None => tracing::warn!(stage = &*self.stage, "{}", self.error.to_string().trim_end()),
        }
    }
}

impl Report {
    pub fn new() -> Self {
        Report::default()
    }

    /// `true` if no failures were recorded.
    pub fn succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn record_write<P: Into<PathBuf>>(&mut self, path: P) {
        self.written.push(path.into());
    }

    pub fn record_removal<P: Into<PathBuf>>(&mut self, path: P) {
        self.removed.push(path.into());
    }

    pub fn record_failure(&mut self, failure: Failure) {
        failure.log();
        self.failures.push(failure);
    }

    /// Appends everything `other` recorded to `self`.
    pub fn merge(mut self, other: Report) -> Self {
        self.written.extend(other.written);
        self.removed.extend(other.removed);
        self.failures.extend(other.failures);
        self
    }

    pub fn wrote(&self, path: &Path) -> bool {
        self.written.iter().any(|p| p == path)
    }
}

impl FromIterator<Report> for Report {
    fn from_iter<I: IntoIterator<Item = Report>>(iter: I) -> Self {
        iter.into_iter().fold(Report::new(), Report::merge)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "[{}] {}: {}", self.stage, path.display(), self.error.message()),
            None => write!(f, "[{}] {}", self.stage, self.error.message()),
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} written", self.written.len())?;
        if !self.removed.is_empty() {
            write!(f, ", {} removed", self.removed.len())?;
        }

        match self.failures.len() {
            0 => Ok(()),
            1 => write!(f, ", 1 failure"),
            n => write!(f, ", {n} failures"),
        }
    }
}
