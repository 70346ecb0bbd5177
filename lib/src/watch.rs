//! Watch mode: re-runs tasks when the files bound to them change.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use notify::RecursiveMode;
use notify_debouncer_mini::new_debouncer;

use crate::error::{Result, Chainable};
use crate::fileset::Globs;
use crate::graph::Graph;
use crate::util::{glob_base, is_glob};

/// How often [`Watcher::run_until()`] checks its stop flag.
const POLL: Duration = Duration::from_millis(50);

/// Slack on top of the debounce delay before a task's own writes count as
/// changes again.
const SETTLE: Duration = Duration::from_millis(500);

/// A set of files and the task to re-run when any of them changes.
#[derive(Debug, Clone)]
pub struct Binding {
    pub globs: Globs,
    pub task: Arc<str>,
    includes: Vec<glob::Pattern>,
    excludes: Vec<glob::Pattern>,
}

impl Binding {
    pub fn matches(&self, path: &Path) -> bool {
        self.includes.iter().any(|p| p.matches_path(path))
            && !self.excludes.iter().any(|p| p.matches_path(path))
    }
}

#[derive(Debug)]
pub struct Watcher<'g> {
    graph: &'g Graph,
    root: PathBuf,
    bindings: Vec<Binding>,
    debounce: Duration,
}

impl<'g> Watcher<'g> {
    pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

    /// A watcher over files below `root` running tasks of `graph`.
    pub fn new<P: Into<PathBuf>>(graph: &'g Graph, root: P) -> Self {
        Watcher { graph, root: root.into(), bindings: vec![], debounce: Self::DEFAULT_DEBOUNCE }
    }

    /// Changes arriving within `debounce` of each other are handled together.
    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn bind(&mut self, globs: Globs, task: &str) -> Result<&mut Self> {
        let task = self.graph.get(task)?.name.clone();
        let (includes, excludes) = globs.compile(&self.root)?;
        self.bindings.push(Binding { globs, task, includes, excludes });
        Ok(self)
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// The tasks bound to any of `paths`, each once, in binding order.
    pub fn triggered(&self, paths: &[PathBuf]) -> Vec<Arc<str>> {
        let mut tasks: Vec<Arc<str>> = vec![];
        for binding in &self.bindings {
            if tasks.contains(&binding.task) {
                continue;
            }

            if paths.iter().any(|path| binding.matches(path)) {
                tasks.push(binding.task.clone());
            }
        }

        tasks
    }

    /// The directories to subscribe to. Each pattern's literal base is
    /// watched, recursively unless the pattern names a single file. A base
    /// that doesn't exist yet is replaced by its nearest existing ancestor.
    pub fn watch_roots(&self) -> Vec<(PathBuf, RecursiveMode)> {
        let mut roots: Vec<(PathBuf, RecursiveMode)> = vec![];
        for pattern in self.bindings.iter().flat_map(|b| b.globs.includes()) {
            let mut dir = self.root.join(glob_base(pattern));
            let mut mode = match is_glob(pattern) {
                true => RecursiveMode::Recursive,
                false => RecursiveMode::NonRecursive,
            };

            while !dir.is_dir() {
                let Some(parent) = dir.parent() else { break };
                dir = parent.to_path_buf();
                mode = RecursiveMode::Recursive;
            }

            match roots.iter_mut().find(|(existing, _)| *existing == dir) {
                Some((_, existing)) if mode == RecursiveMode::Recursive => *existing = mode,
                Some(_) => {},
                None => roots.push((dir, mode)),
            }
        }

        roots
    }

    /// Watches until the process is terminated. Each batch of changes runs
    /// the bound tasks one after another; a failing task is logged and
    /// watching continues.
    pub fn run(&self) -> Result<()> {
        self.run_until(&AtomicBool::new(false))
    }

    /// Like [`Watcher::run()`], returning once `stop` is set.
    ///
    /// Files written by the tasks it runs are not changes: events for them,
    /// and for the directories holding them, are dropped until the writes
    /// have settled.
    pub fn run_until(&self, stop: &AtomicBool) -> Result<()> {
        let (tx, rx) = mpsc::channel();
        let mut debouncer = new_debouncer(self.debounce, tx)
            .chain_with(|| "failed to start the file watcher")?;

        for (dir, mode) in self.watch_roots() {
            tracing::debug!(dir = %dir.display(), ?mode, "watching");
            debouncer.watcher().watch(&dir, mode).chain_with(|| error! {
                "failed to watch directory",
                "directory" => dir.display(),
            })?;
        }

        tracing::info!(bindings = self.bindings.len(), "watching for changes");
        let settle = self.debounce * 2 + SETTLE;
        let mut written: Vec<PathBuf> = vec![];
        let mut settled_at = Instant::now();
        while !stop.load(Ordering::Relaxed) {
            let events = match rx.recv_timeout(POLL) {
                Ok(Ok(events)) => events,
                Ok(Err(e)) => {
                    tracing::error!("watch error: {e}");
                    continue;
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            };

            let own = Instant::now() < settled_at;
            let paths: Vec<PathBuf> = events.into_iter()
                .map(|e| e.path)
                .filter(|path| !own || !written.iter().any(|w| w.starts_with(path)))
                .collect();

            for path in &paths {
                if self.bindings.iter().any(|b| b.matches(path)) {
                    let shown = path.strip_prefix(&self.root).unwrap_or(path);
                    tracing::info!("File {} was changed, running tasks...", shown.display());
                }
            }

            let tasks = self.triggered(&paths);
            if tasks.is_empty() {
                continue;
            }

            written.clear();
            for task in tasks {
                match self.graph.run(&task) {
                    Ok(summary) => {
                        let report = summary.report();
                        tracing::info!(task = &*task, elapsed = ?summary.elapsed, "rebuilt: {report}");
                        written.extend(report.written);
                    }
                    Err(e) => tracing::error!(task = &*task, "{}", e.to_string().trim_end()),
                }
            }

            settled_at = Instant::now() + settle;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    use super::*;
    use crate::report::Report;

    fn wait_for(count: &AtomicUsize, n: usize) -> bool {
        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            if count.load(Ordering::SeqCst) >= n {
                return true;
            }

            thread::sleep(Duration::from_millis(20));
        }

        false
    }

    fn graph() -> Graph {
        let mut graph = Graph::new();
        for name in ["build-js", "build-styles", "index:build"] {
            graph.task(name, &[], |_| Ok(Report::new())).unwrap();
        }

        graph
    }

    #[test]
    fn changes_trigger_bound_tasks_once_in_binding_order() {
        let graph = graph();
        let root = Path::new("/project");
        let mut watcher = Watcher::new(&graph, root);
        watcher.bind(Globs::one("src/styles/**/*.scss"), "build-styles").unwrap()
            .bind(Globs::new(["src/js/**/*.js", "!src/js/**/*.spec.js"]), "build-js").unwrap()
            .bind(Globs::one("src/templates/**/*.html"), "build-js").unwrap()
            .bind(Globs::one("src/index.tpl.html"), "index:build").unwrap();

        let changed = [
            root.join("src/templates/home.html"),
            root.join("src/js/app.js"),
            root.join("src/styles/site.scss"),
        ];

        let tasks = watcher.triggered(&changed);
        assert_eq!(tasks, [Arc::<str>::from("build-styles"), Arc::from("build-js")]);

        assert!(watcher.triggered(&[root.join("src/js/app.spec.js")]).is_empty());
        assert!(watcher.triggered(&[root.join("README.md")]).is_empty());
        assert_eq!(watcher.triggered(&[root.join("src/index.tpl.html")]), [Arc::<str>::from("index:build")]);
    }

    #[test]
    fn binding_unknown_tasks_fails() {
        let graph = graph();
        let mut watcher = Watcher::new(&graph, "/project");
        assert!(watcher.bind(Globs::one("*.js"), "deploy").is_err());
    }

    #[test]
    fn watch_roots_fall_back_to_existing_ancestors() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/js")).unwrap();
        fs::write(dir.path().join("config.json"), "{}").unwrap();

        let graph = graph();
        let mut watcher = Watcher::new(&graph, dir.path());
        watcher.bind(Globs::one("src/js/**/*.js"), "build-js").unwrap()
            .bind(Globs::one("config.json"), "build-js").unwrap()
            .bind(Globs::one("src/missing/**/*.scss"), "build-styles").unwrap();

        let roots = watcher.watch_roots();
        assert_eq!(roots, [
            (dir.path().join("src/js"), RecursiveMode::Recursive),
            (dir.path().to_path_buf(), RecursiveMode::NonRecursive),
            (dir.path().join("src"), RecursiveMode::Recursive),
        ]);
    }

    #[test]
    fn one_edit_runs_the_bound_task_once_and_failures_keep_watching() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(root.join("broken")).unwrap();
        fs::write(root.join("src/app.js"), "a();").unwrap();

        let builds = Arc::new(AtomicUsize::new(0));
        let lints = Arc::new(AtomicUsize::new(0));
        let mut graph = Graph::new();

        // Writes below the directory it is bound to, differently every run.
        let (count, out) = (builds.clone(), root.join("src/gen/app.min.js"));
        graph.task("build-js", &[], move |_| {
            let n = count.fetch_add(1, Ordering::SeqCst) + 1;
            fs::create_dir_all(out.parent().unwrap())?;
            fs::write(&out, n.to_string())?;
            let mut report = Report::new();
            report.record_write(&out);
            Ok(report)
        }).unwrap();

        let count = lints.clone();
        graph.task("lint", &[], move |_| {
            count.fetch_add(1, Ordering::SeqCst);
            err!("lint failed")
        }).unwrap();

        let mut watcher = Watcher::new(&graph, &root).debounce(Duration::from_millis(50));
        watcher.bind(Globs::one("src/**/*.js"), "build-js").unwrap()
            .bind(Globs::one("broken/*.txt"), "lint").unwrap();

        let stop = AtomicBool::new(false);
        let (first, settled, linted, second) = thread::scope(|s| {
            let handle = s.spawn(|| watcher.run_until(&stop));
            thread::sleep(Duration::from_millis(500));

            fs::write(root.join("src/app.js"), "b();").unwrap();
            let first = wait_for(&builds, 1);
            thread::sleep(Duration::from_secs(2));
            let settled = builds.load(Ordering::SeqCst);

            fs::write(root.join("broken/x.txt"), "x").unwrap();
            let linted = wait_for(&lints, 1);

            fs::write(root.join("src/app.js"), "c();").unwrap();
            let second = wait_for(&builds, 2);

            stop.store(true, Ordering::SeqCst);
            handle.join().unwrap().unwrap();
            (first, settled, linted, second)
        });

        assert!(first);
        assert_eq!(settled, 1);
        assert!(linted);
        assert!(second);
    }
}
