use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;

use crate::asset::Asset;
use crate::transform::{Batch, Transform};
use crate::util::PathExt;

const BASE64_DIGITS: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// A generated position and the source position it came from. Columns count
/// characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub column: u32,
    pub source: u32,
    pub line: u32,
    pub source_column: u32,
}

/// A source map: for every generated line, the mapped segments on it ordered
/// by column. A line with no segments maps to nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMap {
    pub sources: Vec<String>,
    pub contents: Vec<Option<String>>,
    pub lines: Vec<Vec<Segment>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Json<'a> {
    version: u8,
    file: &'a str,
    sources: &'a [String],
    sources_content: &'a [Option<String>],
    names: [&'a str; 0],
    mappings: String,
}

impl SourceMap {
    pub fn new() -> Self {
        SourceMap::default()
    }

    /// Adds `source` if not yet present and returns its index.
    pub fn add_source(&mut self, source: &str, content: Option<&str>) -> u32 {
        if let Some(i) = self.sources.iter().position(|s| s == source) {
            return i as u32;
        }

        self.sources.push(source.to_string());
        self.contents.push(content.map(str::to_string));
        (self.sources.len() - 1) as u32
    }

    /// Appends the lines of `asset`, mapping through the asset's own map if
    /// it has one and line by line to the asset itself otherwise.
    pub fn append(&mut self, asset: &Asset, line_count: usize) {
        match &asset.map {
            Some(inner) => {
                let indices: Vec<u32> = inner.sources.iter()
                    .zip(&inner.contents)
                    .map(|(source, content)| self.add_source(source, content.as_deref()))
                    .collect();

                for line in 0..line_count {
                    let segments = inner.lines.get(line).map_or(&[][..], |l| l.as_slice());
                    self.lines.push(segments.iter()
                        .map(|s| Segment { source: indices[s.source as usize], ..*s })
                        .collect());
                }
            }
            None => {
                let name = asset.relative.to_slash_lossy();
                let source = self.add_source(&name, asset.as_text());
                self.lines.extend((0..line_count as u32).map(|line| {
                    vec![Segment { column: 0, source, line, source_column: 0 }]
                }));
            }
        }
    }

    /// Adds `segment` to generated line `line`, keeping the line ordered. A
    /// segment at an already mapped column is ignored.
    pub fn push(&mut self, line: usize, segment: Segment) {
        if self.lines.len() <= line {
            self.lines.resize(line + 1, vec![]);
        }

        let segments = &mut self.lines[line];
        if let Err(i) = segments.binary_search_by_key(&segment.column, |s| s.column) {
            segments.insert(i, segment);
        }
    }

    /// The source position of generated `line` and `column`: the nearest
    /// segment at or before the column, offset by the distance to it.
    pub fn lookup(&self, line: usize, column: u32) -> Option<Segment> {
        let segment = self.lines.get(line)?.iter().rev().find(|s| s.column <= column)?;
        Some(Segment {
            column,
            source_column: segment.source_column + (column - segment.column),
            ..*segment
        })
    }

    /// The source file and line the generated `line` starts in.
    pub fn line_start(&self, line: usize) -> Option<(u32, u32)> {
        self.lines.get(line)?.first().map(|s| (s.source, s.line))
    }

    /// The `mappings` field: base64 VLQ segments, `,` between segments and
    /// `;` between lines.
    pub fn mappings(&self) -> String {
        let mut out = String::new();
        let (mut source, mut line, mut column) = (0i64, 0i64, 0i64);
        for (i, segments) in self.lines.iter().enumerate() {
            if i > 0 {
                out.push(';');
            }

            let mut generated = 0i64;
            for (j, s) in segments.iter().enumerate() {
                if j > 0 {
                    out.push(',');
                }

                encode_vlq(&mut out, s.column as i64 - generated);
                encode_vlq(&mut out, s.source as i64 - source);
                encode_vlq(&mut out, s.line as i64 - line);
                encode_vlq(&mut out, s.source_column as i64 - column);
                generated = s.column as i64;
                (source, line, column) = (s.source as i64, s.line as i64, s.source_column as i64);
            }
        }

        out
    }

    pub fn to_json(&self, file: &str) -> String {
        let json = Json {
            version: 3,
            file,
            sources: &self.sources,
            sources_content: &self.contents,
            names: [],
            mappings: self.mappings(),
        };

        serde_json::to_string(&json).unwrap_or_default()
    }

    pub fn to_data_url(&self, file: &str) -> String {
        let encoded = STANDARD.encode(self.to_json(file));
        format!("data:application/json;charset=utf8;base64,{encoded}")
    }
}

fn encode_vlq(out: &mut String, value: i64) {
    let mut vlq = if value < 0 { ((-value) << 1) | 1 } else { value << 1 };
    loop {
        let mut digit = (vlq & 0b11111) as usize;
        vlq >>= 5;
        if vlq > 0 {
            digit |= 0b100000;
        }

        out.push(BASE64_DIGITS[digit] as char);
        if vlq == 0 {
            break;
        }
    }
}

/// Embeds each asset's source map into the asset as a trailing comment.
///
/// Assets without a map, or that aren't scripts or stylesheets, pass through
/// unchanged.
#[derive(Debug, Default)]
pub struct SourceMaps(());

impl SourceMaps {
    pub fn inline() -> Self {
        SourceMaps(())
    }
}

impl Transform for SourceMaps {
    fn name(&self) -> &str {
        "sourcemaps"
    }

    fn apply(&self, mut batch: Batch) -> Batch {
        for asset in &mut batch.assets {
            let Some(map) = asset.map.take() else { continue };
            let file = asset.relative.file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();

            let comment = match asset.extension() {
                Some("js") => format!("\n//# sourceMappingURL={}\n", map.to_data_url(&file)),
                Some("css") => format!("\n/*# sourceMappingURL={} */\n", map.to_data_url(&file)),
                _ => {
                    asset.map = Some(map);
                    continue;
                }
            };

            if let either::Either::Left(text) = &mut asset.contents {
                text.push_str(&comment);
            }
        }

        batch
    }
}
