use std::path::PathBuf;

use either::Either;
use grass::{Options, OutputStyle};

use crate::asset::Asset;
use crate::error::Result;
use crate::transform::Map;

/// Compiles SCSS to CSS.
///
/// `@import`s resolve against the asset's own directory and then each include
/// path, in order. The output keeps the asset's name with a `.css` extension.
#[derive(Debug, Clone, Default)]
pub struct Sass {
    include_paths: Vec<PathBuf>,
}

impl Sass {
    pub fn new() -> Self {
        Sass::default()
    }

    pub fn include_paths<I, P>(mut self, paths: I) -> Self
        where I: IntoIterator<Item = P>, P: Into<PathBuf>
    {
        self.include_paths.extend(paths.into_iter().map(Into::into));
        self
    }
}

impl Map for Sass {
    fn name(&self) -> &str {
        "sass"
    }

    fn map(&self, mut asset: Asset) -> Result<Asset> {
        let own_dir = asset.path().parent().map(|p| p.to_path_buf()).unwrap_or_default();
        let mut options = Options::default()
            .style(OutputStyle::Expanded)
            .load_path(&own_dir);

        for path in &self.include_paths {
            options = options.load_path(path);
        }

        let css = grass::from_string(asset.require_text()?, &options)
            .map_err(|e| error!("failed to compile scss", e))?;

        asset.contents = Either::Left(css);
        asset.relative.set_extension("css");
        asset.map = None;
        Ok(asset)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::transform::{Batch, Transform};

    #[test]
    fn imports_resolve_through_include_paths() {
        let dir = tempfile::tempdir().unwrap();
        let partials = dir.path().join("partials");
        fs::create_dir_all(&partials).unwrap();
        fs::write(partials.join("_colors.scss"), "$brand: #336699;").unwrap();

        let asset = Asset::text(dir.path(), "styles-site.scss", "@import 'colors';\na { color: $brand; }");
        let batch = Sass::new().include_paths([&partials]).apply(Batch::new(vec![asset]));

        assert!(batch.failures.is_empty());
        let css = &batch.assets[0];
        assert_eq!(css.relative, PathBuf::from("styles-site.css"));
        assert!(css.as_text().unwrap().contains("color: #336699"));
    }

    #[test]
    fn syntax_errors_drop_the_file() {
        let asset = Asset::text("src", "bad.scss", "a { color: ; ");
        let batch = Sass::new().apply(Batch::new(vec![asset]));
        assert!(batch.assets.is_empty());
        assert_eq!(&*batch.failures[0].stage, "sass");
    }
}
