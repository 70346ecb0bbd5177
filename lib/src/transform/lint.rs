use rayon::prelude::*;

use crate::asset::Asset;
use crate::report::Failure;
use crate::transform::{js, Batch, Transform};
use crate::util::PathExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Language {
    Js,
    Css,
}

/// Checks each file and records what it finds as failures. Files always pass
/// through unchanged; a lint problem never removes a file from the stream.
#[derive(Debug, Clone, Copy)]
pub struct Lint {
    language: Language,
}

impl Lint {
    /// Scripts must parse. Each syntax error is reported with its line.
    pub fn js() -> Self {
        Lint { language: Language::Js }
    }

    /// Stylesheets must parse.
    pub fn css() -> Self {
        Lint { language: Language::Css }
    }

    fn check(&self, asset: &Asset) -> Vec<String> {
        let Some(text) = asset.as_text() else {
            return vec![];
        };

        match self.language {
            Language::Js => js::syntax_errors(&asset.relative.to_slash_lossy(), text).into_iter()
                .map(|p| format!("line {}: {}", p.line, p.message))
                .collect(),
            Language::Css => {
                use lightningcss::stylesheet::{ParserOptions, StyleSheet};

                let options = ParserOptions {
                    filename: asset.relative.to_string_lossy().into_owned(),
                    ..ParserOptions::default()
                };

                match StyleSheet::parse(text, options) {
                    Ok(_) => vec![],
                    Err(e) => vec![e.to_string()],
                }
            }
        }
    }
}

impl Transform for Lint {
    fn name(&self) -> &str {
        match self.language {
            Language::Js => "jslint",
            Language::Css => "csslint",
        }
    }

    fn apply(&self, mut batch: Batch) -> Batch {
        let found: Vec<(usize, Vec<String>)> = batch.assets.par_iter()
            .map(|asset| self.check(asset))
            .enumerate()
            .filter(|(_, problems)| !problems.is_empty())
            .collect();

        for (i, problems) in found {
            let path = batch.assets[i].path();
            for problem in problems {
                batch.fail(Failure::new(self.name(), path.clone(), problem));
            }
        }

        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn problems_are_failures_but_files_pass_through() {
        let batch = Batch::new(vec![
            Asset::text("src", "ok.js", "f({});"),
            Asset::text("src", "broken.js", "f({\n);"),
        ]);

        let batch = Lint::js().apply(batch);
        assert_eq!(batch.assets.len(), 2);
        assert!(!batch.failures.is_empty());
        assert!(batch.failures.iter().all(|f| &*f.stage == "jslint"));
        assert!(batch.failures.iter().all(|f| f.path.as_ref().unwrap().ends_with("broken.js")));
        assert!(batch.failures[0].error.message().starts_with("line 2: "));
    }

    #[test]
    fn css_must_parse() {
        let batch = Batch::new(vec![
            Asset::text("src", "ok.css", "a { color: red; }"),
            Asset::text("src", "broken.css", " { color: red; }"),
        ]);

        let batch = Lint::css().apply(batch);
        assert_eq!(batch.assets.len(), 2);
        assert!(!batch.failures.is_empty());
        assert!(batch.failures.iter().all(|f| f.path.as_ref().unwrap().ends_with("broken.css")));
    }
}
