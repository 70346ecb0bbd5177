use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// File name edits in the style of a rename stage: the "basename" is the file
/// name without its last extension, the "extension" is the last extension.
pub trait PathExt: AsRef<Path> {
    /// Replaces the basename, keeping the directory and extension.
    fn with_basename(&self, basename: &str) -> PathBuf;

    /// Prepends `prefix` to the file name.
    fn with_prefix(&self, prefix: &str) -> PathBuf;

    /// Appends `suffix` to the basename, before the extension.
    fn with_suffix(&self, suffix: &str) -> PathBuf;

    /// The path as a `/`-separated string, regardless of platform.
    fn to_slash_lossy(&self) -> String;
}

impl PathExt for Path {
    fn with_basename(&self, basename: &str) -> PathBuf {
        let mut name = OsString::from(basename);
        if let Some(ext) = self.extension() {
            name.push(".");
            name.push(ext);
        }

        self.with_file_name(name)
    }

    fn with_prefix(&self, prefix: &str) -> PathBuf {
        let mut name = OsString::from(prefix);
        name.push(self.file_name().unwrap_or_default());
        self.with_file_name(name)
    }

    fn with_suffix(&self, suffix: &str) -> PathBuf {
        let mut basename = self.file_stem().unwrap_or_default().to_os_string();
        basename.push(suffix);
        if let Some(ext) = self.extension() {
            basename.push(".");
            basename.push(ext);
        }

        self.with_file_name(basename)
    }

    fn to_slash_lossy(&self) -> String {
        self.components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rename_edits() {
        let path = Path::new("js/app.js");
        assert_eq!(path.with_basename("shop-1.2.0"), Path::new("js/shop-1.2.0.js"));
        assert_eq!(path.with_prefix("03-"), Path::new("js/03-app.js"));
        assert_eq!(path.with_suffix(".min"), Path::new("js/app.min.js"));
        assert_eq!(Path::new("LICENSE").with_suffix(".min"), Path::new("LICENSE.min"));
    }
}
