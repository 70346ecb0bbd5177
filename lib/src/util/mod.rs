mod path_ext;

pub use path_ext::*;

use std::path::{Component, Path, PathBuf};

/// Characters that make a path component a glob rather than a literal.
const GLOB_META: &[char] = &['*', '?', '[', ']', '{', '}', '!'];

/// Removes everything up to and including the first `/` in `path`.
///
/// Paths without a separator are returned unchanged. This turns an output
/// path such as `build/js/app.js` into the root-relative `js/app.js`.
///
/// ```
/// use sluice::util::strip_leading_segment;
///
/// assert_eq!(strip_leading_segment("build/js/vendor/0-a.js"), "js/vendor/0-a.js");
/// assert_eq!(strip_leading_segment("bin/app.min.css"), "app.min.css");
/// assert_eq!(strip_leading_segment("index.html"), "index.html");
/// ```
pub fn strip_leading_segment(path: &str) -> &str {
    match path.split_once('/') {
        Some((_, rest)) => rest,
        None => path,
    }
}

/// Left-pads `num` with `fill` until it is at least `width` characters wide.
///
/// ```
/// use sluice::util::pad;
///
/// assert_eq!(pad(7, 3, '0'), "007");
/// assert_eq!(pad(12, 1, '0'), "12");
/// assert_eq!(pad(5, 2, ' '), " 5");
/// ```
pub fn pad(num: usize, width: usize, fill: char) -> String {
    let digits = num.to_string();
    let missing = width.saturating_sub(digits.len());
    let mut padded = String::with_capacity(missing + digits.len());
    padded.extend(std::iter::repeat(fill).take(missing));
    padded.push_str(&digits);
    padded
}

/// The number of decimal digits needed to print `n`.
pub fn digits(n: usize) -> usize {
    n.checked_ilog10().map_or(1, |log| log as usize + 1)
}

/// Returns `true` if `component` contains glob syntax.
pub fn is_glob(component: &str) -> bool {
    component.contains(GLOB_META)
}

/// The longest literal directory prefix of a glob `pattern`.
///
/// Files matched by `pattern` are placed at their path relative to this base
/// when written to a destination. A pattern without any glob syntax names a
/// single file; its base is the file's parent directory.
///
/// ```
/// use std::path::Path;
/// use sluice::util::glob_base;
///
/// assert_eq!(glob_base("src/js/**/*.js"), Path::new("src/js"));
/// assert_eq!(glob_base("vendor/angular/angular.js"), Path::new("vendor/angular"));
/// assert_eq!(glob_base("*.css"), Path::new(""));
/// ```
pub fn glob_base(pattern: &str) -> PathBuf {
    let path = Path::new(pattern);
    let mut base = PathBuf::new();
    let mut literal = true;
    for component in path.components() {
        if let Component::Normal(part) = component {
            if part.to_str().map_or(false, is_glob) {
                literal = false;
                break;
            }
        }

        base.push(component);
    }

    if literal {
        base.pop();
    }

    base
}
