use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use sluice::error::{Result, Chainable};
use sluice::fileset::Globs;
use sluice::{error, format};

pub const CONFIG_FILE: &str = "config.json";
pub const PACKAGE_FILE: &str = "package.json";

/// The build configuration. Every path is relative to the project root.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub src: Sources,
    pub dest: Destinations,
    #[serde(default)]
    pub layout: Layout,
    #[serde(default)]
    pub tools: Tools,
}

/// A vendor/site pair.
#[derive(Debug, Clone, Deserialize)]
pub struct Split<T> {
    pub vendor: T,
    pub site: T,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sources {
    pub app: AppSources,
    pub vendor: VendorSources,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppSources {
    pub js: Split<Globs>,
    pub templates: Globs,
    pub styles: AppStyles,
    pub assets: Assets,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppStyles {
    pub vendor: Globs,
    pub site: Globs,
    pub vendor_partials: Globs,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Assets {
    pub media: Globs,
    pub fonts: Globs,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorSources {
    pub js: Globs,
    pub templates: Globs,
    pub styles: Globs,
    pub style_partials: Globs,
    pub assets: VendorAssets,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VendorAssets {
    pub fonts: Globs,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Destinations {
    pub build: BuildTree,
    pub prod: ProdTree,
    pub src: SrcTree,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildTree {
    pub js: Split<PathBuf>,
    pub css: BuildCss,
    pub media: PathBuf,
    pub fonts: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildCss {
    pub vendor: PathBuf,
    pub site: PathBuf,
    pub core: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProdTree {
    pub js: PathBuf,
    pub css: PathBuf,
    pub media: PathBuf,
    pub fonts: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SrcTree {
    pub js: SrcJs,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SrcJs {
    pub vendor: PathBuf,
}

/// Paths with conventional defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Layout {
    /// The entry page template.
    pub index: PathBuf,
    /// Root of the development tree.
    pub build: PathBuf,
    /// Root of the production tree.
    pub prod: PathBuf,
    pub vendor_styles: PathBuf,
    pub vendor_style_partials: PathBuf,
    pub fonts: PathBuf,
}

impl Default for Layout {
    fn default() -> Self {
        Layout {
            index: "src/index.tpl.html".into(),
            build: "build".into(),
            prod: "bin".into(),
            vendor_styles: "src/assets/styles/vendor".into(),
            vendor_style_partials: "src/assets/styles/vendor/partials".into(),
            fonts: "src/assets/fonts".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Tools {
    /// Browserslist queries for prefixing and minification.
    pub browsers: Vec<String>,
    /// The module the template cache registers with.
    pub template_module: String,
    /// A program annotating scripts for dependency injection.
    pub annotate: Option<Vec<String>>,
    /// A program minifying scripts. The built-in compactor otherwise.
    pub minify: Option<Vec<String>>,
    pub debounce_ms: u64,
}

impl Default for Tools {
    fn default() -> Self {
        Tools {
            browsers: vec!["last 2 versions".into()],
            template_module: "templates".into(),
            annotate: None,
            minify: None,
            debounce_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Package {
    pub name: String,
    pub version: String,
}

/// Everything the tasks need, read once at startup.
#[derive(Debug)]
pub struct Project {
    pub root: PathBuf,
    pub config_path: PathBuf,
    pub config: Config,
    pub package: Package,
}

impl Project {
    /// Loads the configuration and package documents. `config` and `package`
    /// default to [`CONFIG_FILE`] and [`PACKAGE_FILE`] in `root`; relative
    /// paths are taken relative to `root`.
    pub fn load(root: &Path, config: Option<&Path>, package: Option<&Path>) -> Result<Self> {
        let root = root.canonicalize().chain_with(|| error! {
            "project root not found",
            "root" => root.display(),
        })?;

        let config_path = root.join(config.unwrap_or(Path::new(CONFIG_FILE)));
        let package_path = root.join(package.unwrap_or(Path::new(PACKAGE_FILE)));
        let config: Config = format::read(&config_path)
            .chain_with(|| "failed to load build configuration")?;

        let package: Package = format::read(&package_path)
            .chain_with(|| "failed to load package metadata")?;

        Ok(Project { root, config_path, config, package })
    }

    /// `path` below the project root.
    pub fn path<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.root.join(path)
    }

    /// `{name}-{version}`, the stem of every bundle.
    pub fn bundle(&self) -> String {
        format!("{}-{}", self.package.name, self.package.version)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub const CONFIG: &str = r#"{
        "src": {
            "app": {
                "js": { "vendor": "src/js/vendor/**/*.js", "site": ["src/app/**/*.js", "!src/app/**/*.spec.js"] },
                "templates": "src/app/**/*.html",
                "styles": {
                    "vendor": "src/assets/styles/vendor/*.scss",
                    "site": "src/assets/styles/site/**/*.scss",
                    "vendorPartials": "src/assets/styles/vendor/*"
                },
                "assets": { "media": "src/assets/media/**/*", "fonts": "src/assets/fonts/**/*" }
            },
            "vendor": {
                "js": ["vendor/angular/angular.js", "vendor/angular-route/angular-route.js"],
                "templates": "vendor/ui/**/*.html",
                "styles": "vendor/bootstrap/scss/bootstrap.scss",
                "stylePartials": "vendor/bootstrap/scss/**/_*.scss",
                "assets": { "fonts": "vendor/bootstrap/fonts/*" }
            }
        },
        "dest": {
            "build": {
                "js": { "vendor": "build/js/vendor", "site": "build/js/site" },
                "css": { "vendor": "build/css/vendor", "site": "build/css/site", "core": "build/css" },
                "media": "build/media",
                "fonts": "build/fonts"
            },
            "prod": { "js": "bin/js", "css": "bin/css", "media": "bin/media", "fonts": "bin/fonts" },
            "src": { "js": { "vendor": "src/js/vendor" } }
        }
    }"#;

    #[test]
    fn parses_with_defaults() {
        let config: Config = serde_json::from_str(CONFIG).unwrap();
        assert_eq!(config.src.vendor.js.0.len(), 2);
        assert_eq!(config.src.app.js.site.excludes().count(), 1);
        assert_eq!(config.layout.prod, Path::new("bin"));
        assert_eq!(config.tools.browsers, ["last 2 versions"]);
        assert_eq!(config.tools.debounce_ms, 100);
    }

    #[test]
    fn missing_keys_are_errors() {
        let mut value: serde_json::Value = serde_json::from_str(CONFIG).unwrap();
        value["dest"]["build"]["css"].as_object_mut().unwrap().remove("core");
        let error = serde_json::from_value::<Config>(value).unwrap_err();
        assert!(error.to_string().contains("core"));
    }

    #[test]
    fn loads_a_project() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), CONFIG).unwrap();
        std::fs::write(dir.path().join(PACKAGE_FILE), r#"{ "name": "shop", "version": "1.2.0", "private": true }"#).unwrap();

        let project = Project::load(dir.path(), None, None).unwrap();
        assert_eq!(project.bundle(), "shop-1.2.0");
        assert!(project.root.is_absolute());

        let missing = Project::load(dir.path(), None, Some(Path::new("nope.json")));
        assert!(missing.is_err());
    }
}
