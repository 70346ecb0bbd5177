use std::path::Path;

use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::error::Result;
use crate::fileset::{FileSet, Globs};
use crate::util::{strip_leading_segment, PathExt};

/// The scripts and stylesheets an entry page references, in load order.
///
/// References are relative to the output root: the project-relative path of
/// each output file with its first segment (the output root itself) removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Manifest {
    pub scripts: Vec<String>,
    pub styles: Vec<String>,
}

impl Manifest {
    /// Resolves each script glob list and then each style glob list, in the
    /// order given; callers list vendor globs before site globs. A file
    /// matched more than once is referenced once, at its first position.
    pub fn collect(root: &Path, scripts: &[Globs], styles: &[Globs]) -> Result<Manifest> {
        Ok(Manifest { scripts: references(root, scripts)?, styles: references(root, styles)? })
    }
}

fn references(root: &Path, globs: &[Globs]) -> Result<Vec<String>> {
    let mut seen = FxHashSet::default();
    let mut references = vec![];
    for globs in globs {
        for path in FileSet::resolve(root, globs)?.paths() {
            let relative = path.strip_prefix(root).unwrap_or(path).to_slash_lossy();
            let reference = strip_leading_segment(&relative).to_string();
            if seen.insert(reference.clone()) {
                references.push(reference);
            }
        }
    }

    Ok(references)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn touch(root: &Path, files: &[&str]) {
        for file in files {
            let path = root.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "").unwrap();
        }
    }

    #[test]
    fn vendor_references_come_first_without_output_root() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &[
            "build/js/site/app.js",
            "build/js/site/templates.js",
            "build/js/vendor/0-angular.js",
            "build/js/vendor/1-router.js",
            "build/css/shop-1.0.0-site.css",
            "build/css/shop-1.0.0-vendor.css",
        ]);

        let manifest = Manifest::collect(
            dir.path(),
            &[Globs::one("build/js/vendor/**/*.js"), Globs::one("build/js/site/**/*.js")],
            &[Globs::one("build/css/*vendor.css"), Globs::one("build/css/*site.css")],
        ).unwrap();

        assert_eq!(manifest.scripts, [
            "js/vendor/0-angular.js",
            "js/vendor/1-router.js",
            "js/site/app.js",
            "js/site/templates.js",
        ]);

        assert_eq!(manifest.styles, ["css/shop-1.0.0-vendor.css", "css/shop-1.0.0-site.css"]);
    }

    #[test]
    fn style_classes_are_disjoint() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["bin/a-vendor.css", "bin/a-site.css", "bin/a.min.css", "bin/vendor.css.map"]);

        let vendor = Manifest::collect(dir.path(), &[], &[Globs::one("bin/*vendor.css")]).unwrap();
        let site = Manifest::collect(dir.path(), &[], &[Globs::one("bin/*site.css")]).unwrap();
        assert_eq!(vendor.styles, ["a-vendor.css"]);
        assert_eq!(site.styles, ["a-site.css"]);
        assert!(vendor.styles.iter().all(|s| !site.styles.contains(s)));
    }

    #[test]
    fn missing_output_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = Manifest::collect(dir.path(), &[Globs::one("bin/*.js")], &[]).unwrap();
        assert_eq!(manifest, Manifest::default());
    }
}
