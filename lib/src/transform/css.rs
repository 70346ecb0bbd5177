use either::Either;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};

use crate::asset::Asset;
use crate::error::Result;
use crate::sourcemap::{Segment, SourceMap};
use crate::transform::Map;

fn targets_for<S: AsRef<str>>(queries: &[S]) -> Result<Targets> {
    let queries: Vec<&str> = queries.iter().map(|q| q.as_ref()).collect();
    if queries.is_empty() {
        return Ok(Targets::default());
    }

    let browsers = Browsers::from_browserslist(queries.iter().copied())
        .map_err(|e| error!("invalid browser query", "query" => queries.join(", "), e))?;

    Ok(Targets::from(browsers.unwrap_or_default()))
}

/// Parses `css` and prints it back for `targets`. Prefixes are added during
/// the rule pass, so it always runs; `minify` only controls the printer.
fn print(filename: &str, css: &str, targets: Targets, minify: bool) -> Result<String> {
    let options = ParserOptions { filename: filename.into(), ..ParserOptions::default() };
    let mut sheet = StyleSheet::parse(css, options)
        .map_err(|e| error!("failed to parse stylesheet", e))?;

    sheet.minify(MinifyOptions { targets, ..MinifyOptions::default() })
        .map_err(|e| error!("failed to process stylesheet", e))?;

    let printed = sheet.to_css(PrinterOptions { minify, targets, ..PrinterOptions::default() })
        .map_err(|e| error!("failed to print stylesheet", e))?;

    Ok(printed.code)
}

/// Adds the vendor prefixes needed by a set of browsers.
#[derive(Debug, Clone, Default)]
pub struct Autoprefix {
    targets: Targets,
}

impl Autoprefix {
    /// `queries` are browserslist queries such as `last 2 versions`.
    pub fn for_browsers<S: AsRef<str>>(queries: &[S]) -> Result<Self> {
        Ok(Autoprefix { targets: targets_for(queries)? })
    }
}

impl Map for Autoprefix {
    fn name(&self) -> &str {
        "autoprefix"
    }

    fn map(&self, mut asset: Asset) -> Result<Asset> {
        let name = asset.relative.to_string_lossy().into_owned();
        let printed = print(&name, asset.require_text()?, self.targets, false)?;
        asset.contents = Either::Left(printed);
        asset.map = None;
        Ok(asset)
    }
}

/// Minifies stylesheets.
///
/// A stylesheet carrying a source map is minified one source file at a time
/// so that each source becomes exactly one output line, keeping the map
/// accurate at line granularity.
#[derive(Debug, Clone, Default)]
pub struct CssMinify {
    targets: Targets,
}

impl CssMinify {
    pub fn for_browsers<S: AsRef<str>>(queries: &[S]) -> Result<Self> {
        Ok(CssMinify { targets: targets_for(queries)? })
    }
}

impl Map for CssMinify {
    fn name(&self) -> &str {
        "cssnano"
    }

    fn map(&self, mut asset: Asset) -> Result<Asset> {
        let name = asset.relative.to_string_lossy().into_owned();
        let text = asset.require_text()?;
        let Some(map) = &asset.map else {
            let printed = print(&name, text, self.targets, true)?;
            asset.contents = Either::Left(printed);
            return Ok(asset);
        };

        // Runs of consecutive lines from one source. Unmapped lines join
        // the preceding run.
        let mut runs: Vec<(Option<(u32, u32)>, String)> = vec![];
        for (i, line) in text.split('\n').enumerate() {
            let mapped = map.line_start(i);
            match runs.last_mut() {
                Some((Some((src, _)), run)) if mapped.map_or(true, |(s, _)| s == *src) => {
                    run.push('\n');
                    run.push_str(line);
                }
                Some((None, run)) if mapped.is_none() => {
                    run.push('\n');
                    run.push_str(line);
                }
                _ => runs.push((mapped, line.to_string())),
            }
        }

        let mut lines = vec![];
        let mut output = SourceMap { lines: vec![], ..map.clone() };
        for (mapped, run) in runs {
            let printed = print(&name, &run, self.targets, true)?;
            if !printed.trim().is_empty() {
                output.lines.push(mapped.into_iter()
                    .map(|(source, line)| Segment { column: 0, source, line, source_column: 0 })
                    .collect());
                lines.push(printed);
            }
        }

        asset.contents = Either::Left(lines.join("\n"));
        asset.map = Some(output);
        Ok(asset)
    }
}
