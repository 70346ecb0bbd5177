use crate::asset::Asset;
use crate::error::Result;
use crate::transform::Map;
use crate::util::PathExt;

/// Edits asset file names. Edits apply in the order prefix, basename,
/// suffix, extension; unset edits leave the name alone.
///
/// ```
/// use std::path::Path;
/// use sluice::transform::Rename;
///
/// let rename = Rename::new().basename("shop-1.0.0").suffix(".min");
/// assert_eq!(rename.rename(Path::new("js/app.js")), Path::new("js/shop-1.0.0.min.js"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Rename {
    prefix: Option<String>,
    basename: Option<String>,
    suffix: Option<String>,
    extension: Option<String>,
}

impl Rename {
    pub fn new() -> Self {
        Rename::default()
    }

    pub fn prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn basename<S: Into<String>>(mut self, basename: S) -> Self {
        self.basename = Some(basename.into());
        self
    }

    pub fn suffix<S: Into<String>>(mut self, suffix: S) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    /// The new extension, without the leading dot.
    pub fn extension<S: Into<String>>(mut self, extension: S) -> Self {
        self.extension = Some(extension.into());
        self
    }

    pub fn rename(&self, path: &std::path::Path) -> std::path::PathBuf {
        let mut path = path.to_path_buf();
        if let Some(prefix) = &self.prefix {
            path = path.with_prefix(prefix);
        }

        if let Some(basename) = &self.basename {
            path = path.with_basename(basename);
        }

        if let Some(suffix) = &self.suffix {
            path = path.with_suffix(suffix);
        }

        if let Some(extension) = &self.extension {
            path.set_extension(extension);
        }

        path
    }
}

impl Map for Rename {
    fn name(&self) -> &str {
        "rename"
    }

    fn map(&self, mut asset: Asset) -> Result<Asset> {
        asset.relative = self.rename(&asset.relative);
        Ok(asset)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn edits_compose_in_order() {
        let rename = Rename::new().prefix("03-").extension("css");
        assert_eq!(rename.rename(Path::new("a/b.scss")), Path::new("a/03-b.css"));

        let rename = Rename::new().basename("shop-2.1.0-vendor");
        assert_eq!(rename.rename(Path::new("styles-vendor.css")), Path::new("shop-2.1.0-vendor.css"));
        assert_eq!(Rename::new().rename(Path::new("x.js")), Path::new("x.js"));
    }
}
