//! Rendering of the entry page from an asset [`Manifest`].

pub mod minijinja;

use std::fmt::Debug;
use std::path::Path;

use serde::Serialize;

use crate::error::{Result, Chainable};
use crate::manifest::Manifest;
use crate::report::{Failure, Report};

/// The file name the entry page is written to.
pub const INDEX_FILE: &str = "index.html";

pub trait EngineInit {
    type Engine: Engine + 'static;

    /// Creates an engine loading templates from `template_dir`. `globals` are
    /// visible to every template as `G`.
    fn init<G: Serialize>(template_dir: &Path, globals: G) -> Self::Engine;
}

pub trait Engine: Send + Sync + Debug {
    /// Renders the template `name` with `scripts` and `styles` from
    /// `manifest` in its context.
    fn render(&self, name: &str, manifest: &Manifest) -> Result<String>;
}

/// Renders the entry template at `template` against `manifest` and writes the
/// result to [`INDEX_FILE`] in `dest`.
///
/// A missing template is an error. A template that fails to render is a
/// failure for that file: nothing is written and the report says why.
pub fn render_index<E: EngineInit, G: Serialize>(
    template: &Path,
    manifest: &Manifest,
    globals: G,
    dest: &Path,
) -> Result<Report> {
    if !template.is_file() {
        return err!("entry template not found", "path" => template.display());
    }

    let (Some(dir), Some(name)) = (template.parent(), template.file_name()) else {
        return err!("invalid entry template path", "path" => template.display());
    };

    let engine = E::init(dir, globals);
    let mut report = Report::new();
    match engine.render(&name.to_string_lossy(), manifest) {
        Ok(html) => {
            let output = dest.join(INDEX_FILE);
            std::fs::create_dir_all(dest).chain_with(|| error! {
                "failed to create output directory",
                "directory" => dest.display(),
            })?;

            std::fs::write(&output, html).chain_with(|| error! {
                "failed to write entry page",
                "template" => template.display(),
                "destination path" => output.display(),
            })?;

            report.record_write(output);
        }
        Err(e) => report.record_failure(Failure::new("template", template.to_path_buf(), e)),
    }

    Ok(report)
}
