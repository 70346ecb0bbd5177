use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::graph::{Context, Graph};
use crate::report::{Failure, Report};

/// The outcome of a successful top-level run: every task that ran, in
/// completion order, with its report.
#[derive(Debug, Clone)]
pub struct Summary {
    pub task: Arc<str>,
    pub completed: Vec<(Arc<str>, Report)>,
    pub elapsed: Duration,
}

impl Summary {
    /// How many times `task` ran. At most once per invocation.
    pub fn runs(&self, task: &str) -> usize {
        self.completed.iter().filter(|(name, _)| &**name == task).count()
    }

    /// Every task's report, merged in completion order.
    pub fn report(&self) -> Report {
        self.completed.iter().map(|(_, report)| report.clone()).collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = &Failure> {
        self.completed.iter().flat_map(|(_, report)| report.failures.iter())
    }
}

/// One top-level run. Each task's outcome is memoised in its cell; the first
/// thread to reach a task runs it and the rest block on the cell.
struct Invocation<'g> {
    graph: &'g Graph,
    memo: DashMap<Arc<str>, Arc<OnceCell<Result<Report>>>>,
    completed: Mutex<Vec<(Arc<str>, Report)>>,
}

impl Graph {
    /// Runs `name` after its prerequisites, each at most once.
    pub fn run(&self, name: &str) -> Result<Summary> {
        let task = self.get(name)?;
        self.validate()?;
        let invocation = Invocation {
            graph: self,
            memo: DashMap::new(),
            completed: Mutex::new(vec![]),
        };

        let start = Instant::now();
        invocation.ensure(&task.name)?;
        Ok(Summary {
            task: task.name.clone(),
            completed: invocation.completed.into_inner(),
            elapsed: start.elapsed(),
        })
    }
}

impl Invocation<'_> {
    fn ensure(&self, name: &Arc<str>) -> Result<Report> {
        // The map guard must not be held while the task runs.
        let cell = self.memo.entry(name.clone()).or_default().clone();
        cell.get_or_init(|| self.execute(name)).clone()
    }

    /// Prerequisites run on scoped threads rather than the rayon pool: a
    /// thread blocked on a cell must never be the one meant to fill it.
    fn prerequisites(&self, deps: &[Arc<str>]) -> Vec<Result<Report>> {
        match deps {
            [] => vec![],
            [dep] => vec![self.ensure(dep)],
            deps => thread::scope(|s| {
                let handles: Vec<_> = deps.iter()
                    .map(|dep| s.spawn(move || self.ensure(dep)))
                    .collect();

                handles.into_iter()
                    .zip(deps)
                    .map(|(handle, dep)| handle.join().unwrap_or_else(|_| err! {
                        "task panicked",
                        "task" => dep,
                    }))
                    .collect()
            })
        }
    }

    fn execute(&self, name: &Arc<str>) -> Result<Report> {
        let task = self.graph.get(name)?;
        let mut failed: Option<Error> = None;
        for result in self.prerequisites(&task.deps) {
            if let Err(e) = result {
                failed = Some(match failed {
                    Some(previous) => previous.chain(e),
                    None => e,
                });
            }
        }

        if let Some(e) = failed {
            return Err(e.chain(error!("prerequisite failed", "task" => name)));
        }

        let Some(work) = &task.work else {
            self.completed.lock().push((name.clone(), Report::new()));
            return Ok(Report::new());
        };

        tracing::info!(task = &**name, "starting");
        let start = Instant::now();
        let cx = Context { graph: self.graph, task: name };
        match work.run(&cx) {
            Ok(report) => {
                tracing::info!(task = &**name, elapsed = ?start.elapsed(), "finished: {report}");
                self.completed.lock().push((name.clone(), report.clone()));
                Ok(report)
            }
            Err(e) => {
                tracing::error!(task = &**name, elapsed = ?start.elapsed(), "failed");
                Err(e.chain(error!("task failed", "task" => name)))
            }
        }
    }
}
