use std::fs;
use std::path::{Path, PathBuf};

use either::Either;

use crate::error::{Result, Chainable};
use crate::sourcemap::SourceMap;

/// File contents: text when the file is valid UTF-8, raw bytes otherwise.
pub type Contents = Either<String, Vec<u8>>;

/// A file in flight through a pipeline.
///
/// `base` is the directory the file was matched under and `relative` its path
/// below that base; writing the asset to a destination places it at
/// `dest/relative`.
#[derive(Debug, Clone)]
pub struct Asset {
    pub base: PathBuf,
    pub relative: PathBuf,
    pub contents: Contents,
    pub map: Option<SourceMap>,
}

impl Asset {
    pub fn new<B, R>(base: B, relative: R, contents: Contents) -> Self
        where B: Into<PathBuf>, R: Into<PathBuf>
    {
        Asset { base: base.into(), relative: relative.into(), contents, map: None }
    }

    pub fn text<B, R, S>(base: B, relative: R, text: S) -> Self
        where B: Into<PathBuf>, R: Into<PathBuf>, S: Into<String>
    {
        Asset::new(base, relative, Either::Left(text.into()))
    }

    pub fn read(base: &Path, path: &Path) -> Result<Self> {
        let data = fs::read(path).chain_with(|| error! {
            "failed to read source file",
            "file path" => path.display(),
        })?;

        let contents = String::from_utf8(data)
            .map(Either::Left)
            .unwrap_or_else(|e| Either::Right(e.into_bytes()));

        let relative = path.strip_prefix(base).unwrap_or(path).to_path_buf();
        Ok(Asset::new(base, relative, contents))
    }

    /// The path the asset was matched at, or would be read from.
    pub fn path(&self) -> PathBuf {
        self.base.join(&self.relative)
    }

    pub fn as_text(&self) -> Option<&str> {
        self.contents.as_ref().left().map(|s| s.as_str())
    }

    pub fn as_bytes(&self) -> &[u8] {
        match &self.contents {
            Either::Left(text) => text.as_bytes(),
            Either::Right(bytes) => bytes,
        }
    }

    pub fn extension(&self) -> Option<&str> {
        self.relative.extension().and_then(|e| e.to_str())
    }

    /// Returns the text contents or an error naming the binary file.
    pub fn require_text(&self) -> Result<&str> {
        self.as_text().ok_or_else(|| error! {
            "expected a text file but found binary data",
            "file path" => self.path().display(),
        })
    }

    /// Writes the asset to `dest/relative`, creating directories as needed,
    /// and returns the written path. A file that already holds the same
    /// contents is left untouched.
    pub fn write_to(&self, dest: &Path) -> Result<PathBuf> {
        let output = dest.join(&self.relative);
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).chain_with(|| error! {
                "failed to create output directory",
                "directory" => parent.display(),
            })?;
        }

        if fs::read(&output).map_or(false, |existing| existing == self.as_bytes()) {
            tracing::debug!(path = %output.display(), "unchanged, not rewritten");
            return Ok(output);
        }

        fs::write(&output, self.as_bytes()).chain_with(|| error! {
            "failed to write asset",
            "source path" => self.path().display(),
            "destination path" => output.display(),
        })?;

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;

    #[test]
    fn reads_text_and_binary() {
        let dir = tempfile::tempdir().unwrap();
        let text = dir.path().join("js/app.js");
        let font = dir.path().join("font.woff");
        fs::create_dir_all(text.parent().unwrap()).unwrap();
        fs::write(&text, "var a = 1;").unwrap();
        fs::write(&font, [0xff, 0xfe, 0x00]).unwrap();

        let asset = Asset::read(dir.path(), &text).unwrap();
        assert_eq!(asset.relative, Path::new("js/app.js"));
        assert_eq!(asset.as_text(), Some("var a = 1;"));

        let asset = Asset::read(dir.path(), &font).unwrap();
        assert!(asset.as_text().is_none());
        assert_eq!(asset.as_bytes(), &[0xff, 0xfe, 0x00]);
    }

    #[test]
    fn writes_below_destination() {
        let dir = tempfile::tempdir().unwrap();
        let asset = Asset::text("src", "nested/a.css", "a{}");
        let written = asset.write_to(&dir.path().join("out")).unwrap();
        assert_eq!(written, dir.path().join("out/nested/a.css"));
        assert_eq!(fs::read_to_string(written).unwrap(), "a{}");
    }

    #[test]
    fn identical_contents_are_not_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let asset = Asset::text("src", "a.css", "a{}");
        let written = asset.write_to(dir.path()).unwrap();

        let past = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000_000);
        fs::File::options().write(true).open(&written).unwrap().set_modified(past).unwrap();

        asset.write_to(dir.path()).unwrap();
        assert_eq!(fs::metadata(&written).unwrap().modified().unwrap(), past);

        Asset::text("src", "a.css", "b{}").write_to(dir.path()).unwrap();
        assert_ne!(fs::metadata(&written).unwrap().modified().unwrap(), past);
        assert_eq!(fs::read_to_string(&written).unwrap(), "b{}");
    }
}
