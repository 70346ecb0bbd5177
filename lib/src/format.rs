use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::{ErrorDetail, Result, Chainable};

/// A data format documents can be deserialized from.
pub trait Format: Sized {
    /// The data format's error type.
    type Error: serde::de::Error + ErrorDetail + 'static;

    fn from_str<T: DeserializeOwned>(string: &str) -> Result<T, Self::Error>;

    /// Reads and parses the document at `path`.
    fn read<T: DeserializeOwned>(path: &Path) -> Result<T> {
        let string = std::fs::read_to_string(path).chain_with(|| error! {
            "failed to read document",
            "path" => path.display(),
        })?;

        Self::from_str(&string).chain_with(|| error! {
            "failed to parse document",
            "path" => path.display(),
        })
    }
}

macro_rules! impl_format {
    ($name:ident : $func:expr, $E:ty) => (
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl Format for $name {
            type Error = $E;

            fn from_str<T: DeserializeOwned>(s: &str) -> Result<T, $E> {
                $func(s)
            }
        }
    );
}

impl_format!(Toml: toml::from_str, toml::de::Error);
impl_format!(Json: serde_json::from_str, serde_json::error::Error);

/// Reads the document at `path` as TOML if its extension says so and as JSON
/// otherwise.
pub fn read<T: DeserializeOwned>(path: &Path) -> Result<T> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => Toml::read(path),
        _ => Json::read(path),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn reads_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("package.json");
        let toml = dir.path().join("config.toml");
        std::fs::write(&json, r#"{ "name": "shop" }"#).unwrap();
        std::fs::write(&toml, "name = \"shop\"").unwrap();

        let a: BTreeMap<String, String> = read(&json).unwrap();
        let b: BTreeMap<String, String> = read(&toml).unwrap();
        assert_eq!(a, b);

        std::fs::write(&json, "{ name: }").unwrap();
        let error = read::<BTreeMap<String, String>>(&json).unwrap_err();
        assert_eq!(error.message(), "failed to parse document");
    }
}
