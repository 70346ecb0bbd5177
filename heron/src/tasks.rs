use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use sluice::clean::clean;
use sluice::error::Result;
use sluice::fileset::{FileSet, Globs};
use sluice::graph::{callback, Graph};
use sluice::manifest::Manifest;
use sluice::order::order_vendor;
use sluice::pipeline::{merge, Pipeline};
use sluice::report::Report;
use sluice::templating::minijinja::MiniJinjaEngine;
use sluice::templating::render_index;
use sluice::transform::*;
use sluice::sourcemap::SourceMaps;
use sluice::util::PathExt;
use sluice::watch::Watcher;

use crate::config::Project;

/// A glob matching `pattern` below the directory `dir`.
fn below(dir: &Path, pattern: &str) -> Globs {
    Globs::one(format!("{}/{pattern}", dir.to_slash_lossy()))
}

/// Copies the files matched by `globs` below `dest`.
fn copy(project: &Project, name: &str, globs: &Globs, dest: &Path) -> Result<Report> {
    let files = FileSet::resolve(&project.root, globs)?;
    Ok(Pipeline::src(name, &files)?.dest(&project.path(dest))?.finish())
}

fn lint_js(project: &Project, name: &str, globs: &Globs, dest: &Path) -> Result<Report> {
    let files = FileSet::resolve(&project.root, globs)?;
    Ok(Pipeline::src(name, &files)?
        .pipe(Lint::js())
        .dest(&project.path(dest))?
        .finish())
}

fn html_templates(project: &Project) -> Result<Report> {
    let src = &project.config.src;
    let sets = [
        FileSet::resolve(&project.root, &src.vendor.templates)?,
        FileSet::resolve(&project.root, &src.app.templates)?,
    ];

    let cache = TemplateCache::new(project.config.tools.template_module.as_str()).standalone(true);
    Ok(Pipeline::queue("html-templates", &sets)?
        .pipe(cache)
        .pipe(Lint::js())
        .dest(&project.path(&project.config.dest.build.js.site))?
        .finish())
}

fn build_js(project: &Project) -> Result<Report> {
    let (src, dest) = (&project.config.src.app.js, &project.config.dest.build.js);
    merge(
        || lint_js(project, "build-js:vendor", &src.vendor, &dest.vendor),
        || lint_js(project, "build-js:site", &src.site, &dest.site),
    )
}

fn compile_js(project: &Project) -> Result<Report> {
    let (build, tools) = (&project.config.dest.build.js, &project.config.tools);
    let sets = [
        FileSet::resolve(&project.root, &below(&build.vendor, "**/*"))?,
        FileSet::resolve(&project.root, &below(&build.site, "**/*"))?,
    ];

    let annotate = tools.annotate.as_deref().and_then(|argv| Command::from_argv("annotate", argv));
    let pipeline = Pipeline::queue("compile-js", &sets)?
        .pipe(Concat::new("app.js"))
        .pipe(Rename::new().basename(project.bundle()))
        .pipe_opt(annotate)
        .pipe(Rename::new().suffix(".min"));

    let minify = tools.minify.as_deref().and_then(|argv| Command::from_argv("minify", argv));
    let pipeline = match minify {
        Some(command) => pipeline.pipe(command),
        None => pipeline.pipe(JsMinify),
    };

    Ok(pipeline.pipe(SourceMaps::inline())
        .dest(&project.path(&project.config.dest.prod.js))?
        .finish())
}

fn copy_vendor_to_src(project: &Project) -> Result<Report> {
    let (vendor, layout) = (&project.config.src.vendor, &project.config.layout);
    merge(
        || copy(project, "copy-vendor:styles", &vendor.styles, &layout.vendor_styles),
        || merge(
            || copy(project, "copy-vendor:partials", &vendor.style_partials, &layout.vendor_style_partials),
            || copy(project, "copy-vendor:fonts", &vendor.assets.fonts, &layout.fonts),
        ),
    )
}

/// One stylesheet class: concatenated, compiled, prefixed, checked, and
/// written as `{bundle}-{class}.css` to `dest` and the core directory.
fn build_stylesheet(
    project: &Project,
    class: &str,
    globs: &Globs,
    include_paths: &[std::path::PathBuf],
    dest: &Path,
) -> Result<Report> {
    let files = FileSet::resolve(&project.root, globs)?;
    let autoprefix = Autoprefix::for_browsers(&project.config.tools.browsers)?;
    Ok(Pipeline::src(format!("build-styles:{class}"), &files)?
        .pipe(Concat::new(format!("styles-{class}.scss")))
        .pipe(Sass::new().include_paths(include_paths.iter().cloned()))
        .pipe(autoprefix)
        .pipe(Lint::css())
        .pipe(Rename::new().basename(format!("{}-{class}", project.bundle())))
        .dest(&project.path(dest))?
        .dest(&project.path(&project.config.dest.build.css.core))?
        .finish())
}

fn build_styles(project: &Project) -> Result<Report> {
    let (styles, css) = (&project.config.src.app.styles, &project.config.dest.build.css);
    let include_paths = FileSet::resolve_dirs(&project.root, &styles.vendor_partials)?;
    tracing::debug!(paths = include_paths.len(), "resolved style include paths");
    merge(
        || build_stylesheet(project, "vendor", &styles.vendor, &include_paths, &css.vendor),
        || build_stylesheet(project, "site", &styles.site, &include_paths, &css.site),
    )
}

fn compile_styles(project: &Project) -> Result<Report> {
    let css = &project.config.dest.build.css;
    let sets = [
        FileSet::resolve(&project.root, &below(&css.vendor, "*.css"))?,
        FileSet::resolve(&project.root, &below(&css.site, "*.css"))?,
    ];

    Ok(Pipeline::queue("compile-styles", &sets)?
        .pipe(Concat::new("styles.css"))
        .pipe(Rename::new().basename(project.bundle()).suffix(".min"))
        .pipe(CssMinify::for_browsers(&project.config.tools.browsers)?)
        .pipe(SourceMaps::inline())
        .dest(&project.path(&project.config.dest.prod.css))?
        .finish())
}

fn assets(project: &Project, media: &Path, fonts: &Path) -> Result<Report> {
    let assets = &project.config.src.app.assets;
    merge(
        || copy(project, "assets:media", &assets.media, media),
        || copy(project, "assets:fonts", &assets.fonts, fonts),
    )
}

fn index(project: &Project, manifest: Manifest, dest: &Path) -> Result<Report> {
    tracing::debug!(scripts = manifest.scripts.len(), styles = manifest.styles.len(), "rendering entry page");
    render_index::<MiniJinjaEngine, _>(
        &project.path(&project.config.layout.index),
        &manifest,
        &project.package,
        &project.path(dest),
    )
}

fn index_build(project: &Project) -> Result<Report> {
    let build = &project.config.dest.build;
    let manifest = Manifest::collect(
        &project.root,
        &[below(&build.js.vendor, "**/*.js"), below(&build.js.site, "**/*.js")],
        &[below(&build.css.core, "*vendor.css"), below(&build.css.core, "*site.css")],
    )?;

    index(project, manifest, &project.config.layout.build)
}

fn index_production(project: &Project) -> Result<Report> {
    let prod = &project.config.dest.prod;
    let manifest = Manifest::collect(
        &project.root,
        &[below(&prod.js, "*.js")],
        &[below(&prod.css, "*.css")],
    )?;

    index(project, manifest, &project.config.layout.prod)
}

fn watch(project: &Project, graph: &Graph) -> Result<Report> {
    let (app, layout) = (&project.config.src.app, &project.config.layout);
    let debounce = Duration::from_millis(project.config.tools.debounce_ms);
    let config_file = project.config_path.to_slash_lossy();
    let index = layout.index.to_slash_lossy();

    let mut watcher = Watcher::new(graph, &project.root).debounce(debounce);
    watcher.bind(app.styles.site.concat(&below(&layout.vendor_styles, "**")), "build-styles")?
        .bind(app.js.site.clone(), "build-js")?
        .bind(app.js.vendor.clone(), "build-js")?
        .bind(app.templates.clone(), "build-js")?
        .bind(Globs::one(index), "index:build")?
        .bind(app.assets.media.clone(), "build-assets")?
        .bind(app.assets.fonts.clone(), "build-assets")?
        .bind(Globs::one(config_file), "build-js")?;

    watcher.run()?;
    Ok(Report::new())
}

/// Registers every task of the front-end build on `graph`.
pub fn register(graph: &mut Graph, project: Arc<Project>) -> Result<()> {
    macro_rules! task {
        ($name:literal, [$($dep:literal),*], $work:path) => {{
            let project = project.clone();
            graph.task($name, &[$($dep),*], move |_| $work(&project))?;
        }};
    }

    let p = project.clone();
    graph.task("order-vendor-js", &[], callback(move |_, done| {
        let p = p.clone();
        sluice::rayon::spawn(move || {
            let dest = p.path(&p.config.dest.src.js.vendor);
            done.finish(order_vendor(&p.root, &p.config.src.vendor.js, &dest));
        });
    }))?;

    task!("html-templates", [], html_templates);
    task!("build-js", ["order-vendor-js", "html-templates"], build_js);
    task!("compile-js", ["build-js"], compile_js);
    task!("copy-vendor-to-src", [], copy_vendor_to_src);
    task!("build-styles", ["copy-vendor-to-src"], build_styles);
    task!("compile-styles", ["build-styles"], compile_styles);

    let p = project.clone();
    graph.task("build-assets", &["copy-vendor-to-src"], move |_| {
        assets(&p, &p.config.dest.build.media, &p.config.dest.build.fonts)
    })?;

    let p = project.clone();
    graph.task("compile-assets", &["copy-vendor-to-src"], move |_| {
        assets(&p, &p.config.dest.prod.media, &p.config.dest.prod.fonts)
    })?;

    task!("index:build", ["build-js", "build-styles"], index_build);
    task!("index:production", ["compile-js", "compile-styles"], index_production);

    let p = project.clone();
    graph.task("clean", &[], move |_| {
        clean(&[p.path(&p.config.layout.build), p.path(&p.config.layout.prod)])
    })?;

    graph.group("build", &["build-js", "build-styles", "build-assets", "index:build"])?;
    graph.group("compile", &["compile-js", "compile-styles", "compile-assets", "index:production"])?;

    let p = project;
    graph.task("watch", &["build"], move |cx| watch(&p, cx.graph))?;
    graph.group("default", &["compile", "watch"])?;
    Ok(())
}
