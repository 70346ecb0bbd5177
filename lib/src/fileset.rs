use std::fmt;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Deserializer, Serialize};

use crate::asset::Asset;
use crate::error::{Result, Chainable};
use crate::util::glob_base;

/// An ordered list of glob patterns. Patterns starting with `!` exclude
/// matches of the other patterns.
///
/// Deserializes from either a single string or an array of strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Globs(pub Vec<String>);

/// A file matched by a glob, together with the literal base directory of the
/// pattern that matched it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matched {
    pub base: PathBuf,
    pub path: PathBuf,
}

/// The files matched by a [`Globs`] at one point in time, in pattern order
/// and then lexical order within each pattern. A file matched by more than
/// one pattern appears once, at its first position.
#[derive(Debug, Clone, Default)]
pub struct FileSet {
    pub files: Vec<Matched>,
}

impl Globs {
    pub fn new<I, S>(patterns: I) -> Self
        where I: IntoIterator<Item = S>, S: Into<String>
    {
        Globs(patterns.into_iter().map(Into::into).collect())
    }

    pub fn one<S: Into<String>>(pattern: S) -> Self {
        Globs(vec![pattern.into()])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|s| s.as_str())
    }

    /// The including patterns, in order.
    pub fn includes(&self) -> impl Iterator<Item = &str> {
        self.iter().filter(|p| !p.starts_with('!'))
    }

    /// The excluding patterns, without their leading `!`.
    pub fn excludes(&self) -> impl Iterator<Item = &str> {
        self.iter().filter_map(|p| p.strip_prefix('!'))
    }

    /// Returns a new list with `other`'s patterns appended.
    pub fn concat(&self, other: &Globs) -> Globs {
        Globs(self.0.iter().chain(other.0.iter()).cloned().collect())
    }

    /// Compiles each pattern, anchored at `root` unless already absolute.
    pub fn compile(&self, root: &Path) -> Result<(Vec<glob::Pattern>, Vec<glob::Pattern>)> {
        let compile = |pattern: &str| -> Result<glob::Pattern> {
            let anchored = anchor(root, pattern)?;
            glob::Pattern::new(&anchored).chain_with(|| error! {
                "invalid glob pattern",
                "pattern" => pattern,
            })
        };

        let includes = self.includes().map(compile).collect::<Result<_>>()?;
        let excludes = self.excludes().map(compile).collect::<Result<_>>()?;
        Ok((includes, excludes))
    }
}

/// Joins a relative `pattern` onto `root`, escaping any glob syntax in `root`.
pub fn anchor(root: &Path, pattern: &str) -> Result<String> {
    if Path::new(pattern).is_absolute() {
        return Ok(pattern.to_string());
    }

    let root = root.to_str().ok_or_else(|| error! {
        "project root is not valid UTF-8",
        "root" => root.display(),
    })?;

    let root = glob::Pattern::escape(root.trim_end_matches('/'));
    Ok(format!("{root}/{}", pattern.trim_start_matches("./")))
}

impl FileSet {
    /// Resolves `globs` against the file system below `root`, keeping files
    /// only. A pattern that matches nothing contributes nothing.
    pub fn resolve(root: &Path, globs: &Globs) -> Result<FileSet> {
        let mut seen = FxHashSet::default();
        let files = matches(root, globs)?
            .into_iter()
            .filter(|m| m.path.is_file())
            .filter(|m| seen.insert(m.path.clone()))
            .collect();

        Ok(FileSet { files })
    }

    /// Resolves `globs` below `root`, keeping directories only.
    pub fn resolve_dirs(root: &Path, globs: &Globs) -> Result<Vec<PathBuf>> {
        let mut seen = FxHashSet::default();
        Ok(matches(root, globs)?
            .into_iter()
            .filter(|m| m.path.is_dir())
            .filter(|m| seen.insert(m.path.clone()))
            .map(|m| m.path)
            .collect())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(|m| m.path.as_path())
    }

    /// Appends `other`'s files that are not already present.
    pub fn extend(&mut self, other: FileSet) {
        for file in other.files {
            if !self.files.iter().any(|m| m.path == file.path) {
                self.files.push(file);
            }
        }
    }

    /// Reads every file into an [`Asset`], preserving order.
    pub fn read(&self) -> Result<Vec<Asset>> {
        self.files.par_iter()
            .map(|m| Asset::read(&m.base, &m.path))
            .collect()
    }
}

fn matches(root: &Path, globs: &Globs) -> Result<Vec<Matched>> {
    let (_, excludes) = globs.compile(root)?;
    let mut matched = vec![];
    for pattern in globs.includes() {
        let anchored = anchor(root, pattern)?;
        let base = root.join(glob_base(pattern));

        // A trailing `**` only matches directories; the files below them
        // belong to the pattern too.
        let mut expanded = vec![anchored];
        if pattern == "**" || pattern.ends_with("/**") {
            expanded.push(format!("{}/*", expanded[0]));
        }

        let mut paths = vec![];
        for anchored in &expanded {
            paths.extend(glob::glob(anchored).chain_with(|| error! {
                "invalid glob pattern",
                "pattern" => pattern,
            })?);
        }

        for path in paths {
            let path = path.chain_with(|| error! {
                "failed to read a path while resolving a glob",
                "pattern" => pattern,
            })?;

            if excludes.iter().any(|e| e.matches_path(&path)) {
                continue;
            }

            matched.push(Matched { base: base.clone(), path });
        }
    }

    Ok(matched)
}

impl<'de> Deserialize<'de> for Globs {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            One(String),
            Many(Vec<String>),
        }

        Ok(match OneOrMany::deserialize(de)? {
            OneOrMany::One(pattern) => Globs(vec![pattern]),
            OneOrMany::Many(patterns) => Globs(patterns),
        })
    }
}

impl fmt::Display for Globs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}
