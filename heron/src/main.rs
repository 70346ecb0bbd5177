use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};
use tracing_subscriber::EnvFilter;

use sluice::error::Result;
use sluice::graph::Graph;

use crate::config::Project;

mod config;
mod flags;
mod tasks;

pub const DEFAULT_TASK: &str = "default";

fn init_logging(verbose: bool) {
    let default = match verbose {
        true => "heron=debug,sluice=debug",
        false => "heron=info,sluice=info",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn run(flags: flags::Heron) -> Result<ExitCode> {
    let root = flags.root.as_deref().unwrap_or(Path::new("."));
    let project = Project::load(root, flags.config.as_deref(), flags.package.as_deref())?;
    tracing::debug!(root = %project.root.display(), bundle = %project.bundle(), "loaded project");

    let mut graph = Graph::new();
    tasks::register(&mut graph, Arc::new(project))?;
    graph.validate()?;

    if flags.tasks {
        for task in graph.tasks() {
            let deps: Vec<&str> = task.deps.iter().map(|d| &**d).collect();
            match deps.is_empty() {
                true => println!("{}", task.name),
                false => println!("{} <- {}", task.name, deps.join(", ")),
            }
        }

        return Ok(ExitCode::SUCCESS);
    }

    let names = match flags.task.is_empty() {
        true => vec![DEFAULT_TASK.to_string()],
        false => flags.task,
    };

    let mut failures = 0;
    for name in &names {
        let summary = graph.run(name)?;
        failures += summary.failures().count();
        tracing::info!(
            task = name.as_str(),
            elapsed = ?summary.elapsed,
            "completed: {}", summary.report()
        );
    }

    if flags.strict && failures > 0 {
        tracing::error!("{failures} file(s) failed");
        return Ok(ExitCode::FAILURE);
    }

    Ok(ExitCode::SUCCESS)
}

pub fn main() -> ExitCode {
    let flags = flags::Heron::from_env_or_exit();
    init_logging(flags.verbose);

    match run(flags) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
