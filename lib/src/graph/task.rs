use std::sync::{mpsc, Arc};

use derive_more::Debug;

use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::report::Report;

/// A named node of the [`Graph`]: prerequisites plus, unless the task only
/// groups others, a unit of work.
#[derive(Debug)]
pub struct Task {
    pub name: Arc<str>,
    pub deps: Vec<Arc<str>>,
    #[debug(ignore)]
    pub(crate) work: Option<Box<dyn Work>>,
}

impl Task {
    /// `true` if the task has work of its own rather than only prerequisites.
    pub fn has_work(&self) -> bool {
        self.work.is_some()
    }
}

/// What a task's work sees while it runs.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    pub graph: &'a Graph,
    pub task: &'a str,
}

/// A task's unit of work. Runs once every prerequisite has completed.
pub trait Work: Send + Sync {
    fn run(&self, cx: &Context<'_>) -> Result<Report>;
}

impl<F> Work for F
    where F: Fn(&Context<'_>) -> Result<Report> + Send + Sync
{
    fn run(&self, cx: &Context<'_>) -> Result<Report> {
        self(cx)
    }
}

/// The completion handle of callback-style work. Exactly one of its methods
/// should be called; dropping it unsignalled fails the task.
#[derive(Debug)]
pub struct Done {
    tx: mpsc::Sender<Result<Report>>,
}

impl Done {
    pub fn ok(self, report: Report) {
        self.finish(Ok(report))
    }

    pub fn fail<E: Into<Error>>(self, error: E) {
        self.finish(Err(error.into()))
    }

    pub fn finish(self, result: Result<Report>) {
        // The receiver outlives every handle, so sending can't fail.
        let _ = self.tx.send(result);
    }
}

/// Adapts work that signals completion through a [`Done`] handle, possibly
/// from another thread, into blocking work. The task completes when the
/// handle is signalled, not when `f` returns.
///
/// ```rust
/// use sluice::graph::{callback, Graph};
/// use sluice::report::Report;
///
/// let mut graph = Graph::new();
/// graph.task("later", &[], callback(|_, done| {
///     sluice::rayon::spawn(move || done.ok(Report::new()));
/// }))?;
///
/// assert!(graph.run("later").is_ok());
/// # Ok::<(), sluice::error::Error>(())
/// ```
pub fn callback<F>(f: F) -> impl Fn(&Context<'_>) -> Result<Report> + Send + Sync + 'static
    where F: Fn(&Context<'_>, Done) + Send + Sync + 'static
{
    move |cx: &Context<'_>| {
        let (tx, rx) = mpsc::channel();
        f(cx, Done { tx });
        rx.recv().unwrap_or_else(|_| err! {
            "task finished without signalling completion",
            "task" => cx.task,
        })
    }
}
