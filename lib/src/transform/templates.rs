use std::path::PathBuf;

use either::Either;

use crate::asset::Asset;
use crate::report::Failure;
use crate::transform::{Batch, Transform};
use crate::util::PathExt;

/// Bundles HTML templates into a single script that registers each one in an
/// AngularJS `$templateCache`, keyed by its path relative to its glob base.
///
/// A standalone bundle declares the module itself; otherwise it attaches to
/// an existing module of that name.
#[derive(Debug, Clone)]
pub struct TemplateCache {
    file: PathBuf,
    module: String,
    standalone: bool,
}

impl TemplateCache {
    pub fn new<S: Into<String>>(module: S) -> Self {
        TemplateCache { file: "templates.js".into(), module: module.into(), standalone: false }
    }

    pub fn standalone(mut self, standalone: bool) -> Self {
        self.standalone = standalone;
        self
    }

    pub fn file<P: Into<PathBuf>>(mut self, file: P) -> Self {
        self.file = file.into();
        self
    }

    fn header(&self) -> String {
        let module = js_string(&self.module);
        let module = match self.standalone {
            true => format!("angular.module({module}, [])"),
            false => format!("angular.module({module})"),
        };

        format!("{module}.run(['$templateCache', function($templateCache) {{\n")
    }
}

/// Quotes `s` as a script string literal. JSON string syntax is valid script
/// syntax once the two line separators JSON allows raw are escaped.
fn js_string(s: &str) -> String {
    serde_json::Value::from(s).to_string()
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}

impl Transform for TemplateCache {
    fn name(&self) -> &str {
        "templatecache"
    }

    fn apply(&self, batch: Batch) -> Batch {
        let Batch { assets, failures } = batch;
        let mut batch = Batch { assets: vec![], failures };
        let Some(base) = assets.first().map(|a| a.base.clone()) else {
            return batch;
        };

        let mut script = self.header();
        for asset in &assets {
            let Some(html) = asset.as_text() else {
                let error = error!("template is not valid UTF-8");
                batch.fail(Failure::new(self.name(), asset.path(), error));
                continue;
            };

            let key = js_string(&asset.relative.to_slash_lossy());
            script.push_str(&format!("  $templateCache.put({key}, {});\n", js_string(html)));
        }

        script.push_str("}]);\n");
        batch.assets.push(Asset::new(base, self.file.clone(), Either::Left(script)));
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_each_template() {
        let batch = Batch::new(vec![
            Asset::text("src/app", "home/home.html", "<h1>'Hi'</h1>\n"),
            Asset::text("src/vendor", "ui/modal.html", "<div class=\"modal\"></div>"),
        ]);

        let batch = TemplateCache::new("templates").standalone(true).apply(batch);
        assert_eq!(batch.assets.len(), 1);

        let script = &batch.assets[0];
        assert_eq!(script.relative, PathBuf::from("templates.js"));
        assert_eq!(script.as_text().unwrap(), concat!(
            "angular.module(\"templates\", []).run(['$templateCache', function($templateCache) {\n",
            "  $templateCache.put(\"home/home.html\", \"<h1>'Hi'</h1>\\n\");\n",
            "  $templateCache.put(\"ui/modal.html\", \"<div class=\\\"modal\\\"></div>\");\n",
            "}]);\n",
        ));
    }

    #[test]
    fn attaches_to_an_existing_module() {
        let batch = Batch::new(vec![Asset::text("src", "a.html", "<p>")]);
        let batch = TemplateCache::new("app").apply(batch);
        assert!(batch.assets[0].as_text().unwrap().starts_with("angular.module(\"app\").run("));
    }

    #[test]
    fn line_separators_are_escaped() {
        assert_eq!(js_string("a\u{2028}b"), "\"a\\u2028b\"");
    }
}
