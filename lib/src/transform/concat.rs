use std::path::PathBuf;

use either::Either;

use crate::asset::Asset;
use crate::report::Failure;
use crate::sourcemap::SourceMap;
use crate::transform::{Batch, Transform};

/// Joins every asset in stream order into a single file named `file`,
/// separating them with a newline and recording a line-level source map.
///
/// The output takes the base directory of the first asset. An empty stream
/// produces nothing; binary files can't be concatenated and are recorded as
/// failures.
#[derive(Debug, Clone)]
pub struct Concat {
    file: PathBuf,
}

impl Concat {
    pub fn new<P: Into<PathBuf>>(file: P) -> Self {
        Concat { file: file.into() }
    }
}

impl Transform for Concat {
    fn name(&self) -> &str {
        "concat"
    }

    fn apply(&self, batch: Batch) -> Batch {
        let Batch { assets, failures } = batch;
        let mut batch = Batch { assets: vec![], failures };
        let Some(base) = assets.first().map(|a| a.base.clone()) else {
            return batch;
        };

        let mut text = String::new();
        let mut map = SourceMap::new();
        let mut joined = 0;
        for asset in assets {
            let Some(contents) = asset.as_text() else {
                let error = error!("cannot concatenate binary file", "file" => self.file.display());
                batch.fail(Failure::new(self.name(), asset.path(), error));
                continue;
            };

            if joined > 0 {
                text.push('\n');
            }

            map.append(&asset, contents.split('\n').count());
            text.push_str(contents);
            joined += 1;
        }

        if joined > 0 {
            let mut output = Asset::new(base, self.file.clone(), Either::Left(text));
            output.map = Some(map);
            batch.assets.push(output);
        }

        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_in_stream_order() {
        let batch = Batch::new(vec![
            Asset::text("build/js/vendor", "0-a.js", "var a;\n"),
            Asset::text("build/js/site", "app.js", "a();"),
        ]);

        let batch = Concat::new("app.js").apply(batch);
        assert_eq!(batch.assets.len(), 1);

        let bundle = &batch.assets[0];
        assert_eq!(bundle.as_text(), Some("var a;\n\na();"));
        assert_eq!(bundle.base, PathBuf::from("build/js/vendor"));

        let map = bundle.map.as_ref().unwrap();
        assert_eq!(map.sources, ["0-a.js", "app.js"]);
        let starts: Vec<_> = (0..3).map(|l| map.line_start(l)).collect();
        assert_eq!(starts, [Some((0, 0)), Some((0, 1)), Some((1, 0))]);
    }

    #[test]
    fn nothing_in_nothing_out() {
        let batch = Concat::new("app.js").apply(Batch::default());
        assert!(batch.assets.is_empty());
        assert!(batch.failures.is_empty());
    }

    #[test]
    fn binary_files_are_failures() {
        let font = Asset::new("fonts", "a.woff", Either::Right(vec![0xff]));
        let batch = Concat::new("all.css").apply(Batch::new(vec![font]));
        assert!(batch.assets.is_empty());
        assert_eq!(batch.failures.len(), 1);
    }
}
