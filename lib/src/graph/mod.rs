//! Named tasks with prerequisites.
//!
//! Running a task first runs its prerequisites, in parallel, and then its own
//! work. Within one top-level [`Graph::run()`] every task runs at most once: a
//! prerequisite shared by several dependents is run by whichever reaches it
//! first while the others wait for its outcome. The next top-level run starts
//! afresh.

mod task;
mod run;

pub use task::*;
pub use run::*;

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::Result;
use crate::report::Report;

#[derive(Debug, Default)]
pub struct Graph {
    tasks: FxHashMap<Arc<str>, Task>,
    order: Vec<Arc<str>>,
}

impl Graph {
    pub fn new() -> Self {
        Graph::default()
    }

    /// Registers `name`, which runs `work` once `deps` have completed. Task
    /// names are unique.
    pub fn task<F>(&mut self, name: &str, deps: &[&str], work: F) -> Result<&mut Self>
        where F: Fn(&Context<'_>) -> Result<Report> + Send + Sync + 'static
    {
        self.insert(name, deps, Some(Box::new(work)))
    }

    /// Registers `name`, which has no work of its own: running it runs
    /// `deps`.
    pub fn group(&mut self, name: &str, deps: &[&str]) -> Result<&mut Self> {
        self.insert(name, deps, None)
    }

    fn insert(&mut self, name: &str, deps: &[&str], work: Option<Box<dyn Work>>) -> Result<&mut Self> {
        if self.tasks.contains_key(name) {
            return err!("task is already registered", "task" => name);
        }

        let name: Arc<str> = name.into();
        let deps = deps.iter().map(|&dep| Arc::from(dep)).collect();
        self.tasks.insert(name.clone(), Task { name: name.clone(), deps, work });
        self.order.push(name);
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Result<&Task> {
        self.tasks.get(name).ok_or_else(|| error!("unknown task", "task" => name))
    }

    /// The registered tasks, in registration order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.order.iter().filter_map(|name| self.tasks.get(name))
    }

    /// Checks that every prerequisite is registered and that no task depends
    /// on itself, directly or transitively.
    pub fn validate(&self) -> Result<()> {
        for task in self.tasks() {
            if let Some(dep) = task.deps.iter().find(|dep| !self.tasks.contains_key(&**dep)) {
                return err! {
                    "unknown prerequisite",
                    "task" => task.name,
                    "prerequisite" => dep,
                };
            }
        }

        let mut done = FxHashSet::default();
        let mut path = vec![];
        for name in &self.order {
            self.visit(name, &mut path, &mut done)?;
        }

        Ok(())
    }

    fn visit<'a>(
        &'a self,
        name: &'a Arc<str>,
        path: &mut Vec<&'a Arc<str>>,
        done: &mut FxHashSet<&'a Arc<str>>,
    ) -> Result<()> {
        if done.contains(name) {
            return Ok(());
        }

        if let Some(start) = path.iter().position(|seen| *seen == name) {
            let mut cycle: Vec<&str> = path[start..].iter().map(|n| &***n).collect();
            cycle.push(name);
            return err!("task dependency cycle", "cycle" => cycle.join(" -> "));
        }

        path.push(name);
        for dep in &self.tasks[name].deps {
            self.visit(dep, path, done)?;
        }

        path.pop();
        done.insert(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::report::Failure;

    static_assertions::assert_impl_all!(Graph: Send, Sync);

    fn noop(_: &Context<'_>) -> Result<Report> {
        Ok(Report::new())
    }

    #[test]
    fn shared_prerequisites_run_once_per_invocation() {
        let z_runs = Arc::new(AtomicUsize::new(0));
        let counter = z_runs.clone();

        let mut graph = Graph::new();
        graph.task("z", &[], move |_| {
            std::thread::sleep(Duration::from_millis(20));
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Report::new())
        }).unwrap();

        graph.task("x", &["z"], noop).unwrap()
            .task("y", &["z"], noop).unwrap()
            .group("top", &["x", "y"]).unwrap();

        let summary = graph.run("top").unwrap();
        assert_eq!(z_runs.load(Ordering::SeqCst), 1);
        assert_eq!(summary.runs("z"), 1);
        assert_eq!(summary.completed.last().map(|(n, _)| &**n), Some("top"));

        graph.run("top").unwrap();
        assert_eq!(z_runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn prerequisites_complete_before_work_starts() {
        let order = Arc::new(parking_lot::Mutex::new(vec![]));
        let mut graph = Graph::new();
        for (name, deps) in [("a", &[][..]), ("b", &["a"][..]), ("c", &["a", "b"][..])] {
            let order = order.clone();
            graph.task(name, deps, move |cx| {
                order.lock().push(cx.task.to_string());
                Ok(Report::new())
            }).unwrap();
        }

        graph.run("c").unwrap();
        assert_eq!(*order.lock(), ["a", "b", "c"]);
    }

    #[test]
    fn cycles_and_unknown_prerequisites_are_errors() {
        let mut graph = Graph::new();
        graph.group("a", &["b"]).unwrap().group("b", &["c"]).unwrap().group("c", &["a"]).unwrap();
        let error = graph.run("a").unwrap_err();
        assert_eq!(error.message(), "task dependency cycle");
        assert!(error.to_string().contains("a -> b -> c -> a"));

        let mut graph = Graph::new();
        graph.group("a", &["missing"]).unwrap();
        assert_eq!(graph.validate().unwrap_err().message(), "unknown prerequisite");
        assert_eq!(graph.run("nope").unwrap_err().message(), "unknown task");
        assert!(graph.group("a", &[]).is_err());
    }

    #[test]
    fn failed_prerequisites_block_dependents_only() {
        let sibling_ran = Arc::new(AtomicUsize::new(0));
        let dependent_ran = Arc::new(AtomicUsize::new(0));
        let (s, d) = (sibling_ran.clone(), dependent_ran.clone());

        let mut graph = Graph::new();
        graph.task("broken", &[], |_| err!("disk full")).unwrap();
        graph.task("sibling", &[], move |_| {
            std::thread::sleep(Duration::from_millis(20));
            s.fetch_add(1, Ordering::SeqCst);
            Ok(Report::new())
        }).unwrap();

        graph.task("dependent", &["broken", "sibling"], move |_| {
            d.fetch_add(1, Ordering::SeqCst);
            Ok(Report::new())
        }).unwrap();

        let error = graph.run("dependent").unwrap_err();
        assert!(error.causes().any(|e| e.message() == "disk full"));
        assert_eq!(sibling_ran.load(Ordering::SeqCst), 1);
        assert_eq!(dependent_ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn per_file_failures_do_not_fail_the_run() {
        let mut graph = Graph::new();
        graph.task("lint", &[], |cx| {
            let mut report = Report::new();
            report.record_failure(Failure::new(cx.task, None::<std::path::PathBuf>, "missing semicolon"));
            Ok(report)
        }).unwrap();

        graph.group("build", &["lint"]).unwrap();
        let summary = graph.run("build").unwrap();
        assert_eq!(summary.report().failures.len(), 1);
    }

    #[test]
    fn callback_work() {
        let mut graph = Graph::new();
        graph.task("async", &[], callback(|_, done| {
            std::thread::spawn(move || {
                let mut report = Report::new();
                report.record_write("out/0-a.js");
                done.ok(report);
            });
        })).unwrap();

        graph.task("forgetful", &[], callback(|_, done| drop(done))).unwrap();

        let summary = graph.run("async").unwrap();
        assert_eq!(summary.report().written.len(), 1);

        let error = graph.run("forgetful").unwrap_err();
        assert_eq!(error.message(), "task finished without signalling completion");
    }
}
