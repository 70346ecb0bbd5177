use either::Either;
use swc_common::{sync::Lrc, FileName, SourceFile, SourceMap as Files, Spanned};
use swc_ecma_ast::{EsVersion, Program};
use swc_ecma_codegen::{text_writer::JsWriter, Config, Emitter};
use swc_ecma_parser::{error::Error as ParseError, parse_file_as_program, EsSyntax, Syntax};

use crate::asset::Asset;
use crate::error::{Result, Chainable};
use crate::sourcemap::{Segment, SourceMap};
use crate::transform::Map;
use crate::util::PathExt;

/// A syntax error found while parsing a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub line: usize,
    pub message: String,
}

/// A parsed script together with the source map that owns its positions.
struct Parsed {
    files: Lrc<Files>,
    file: Lrc<SourceFile>,
    program: std::result::Result<Program, Vec<Problem>>,
}

fn parse(name: &str, source: &str) -> Parsed {
    let files: Lrc<Files> = Default::default();
    let file = files.new_source_file(Lrc::new(FileName::Custom(name.into())), source.to_string());

    let mut recovered = vec![];
    let syntax = Syntax::Es(EsSyntax::default());
    let result = parse_file_as_program(&file, syntax, EsVersion::Es2022, None, &mut recovered);

    let problem = |e: ParseError| Problem {
        line: files.lookup_char_pos(e.span().lo).line,
        message: e.kind().msg().into_owned(),
    };

    let program = match result {
        Ok(program) if recovered.is_empty() => Ok(program),
        Ok(_) => Err(recovered.into_iter().map(problem).collect()),
        Err(e) => Err(std::iter::once(e).chain(recovered).map(problem).collect()),
    };

    Parsed { files, file, program }
}

/// Parses `source` as a script and returns its syntax errors, if any.
pub fn syntax_errors(name: &str, source: &str) -> Vec<Problem> {
    parse(name, source).program.err().unwrap_or_default()
}

/// Minifies scripts by reprinting them without whitespace or comments.
///
/// The new source map maps every emitted token back to the script, or
/// through the script's own map when it has one, so a minified bundle still
/// points into the files it was concatenated from.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsMinify;

impl JsMinify {
    pub fn minify(name: &str, source: &str) -> Result<(String, Vec<(u32, u32, usize, u32)>)> {
        let Parsed { files, file, program } = parse(name, source);
        let program = program.map_err(|problems| {
            let mut error = error!("failed to parse script", "file" => name);
            for p in problems {
                error = error!(format!("line {}: {}", p.line, p.message)).chain(error);
            }

            error
        })?;

        let mut code = vec![];
        let mut positions = vec![];
        {
            let writer = JsWriter::new(files.clone(), "\n", &mut code, Some(&mut positions));
            let mut emitter = Emitter {
                cfg: Config::default().with_minify(true),
                cm: files.clone(),
                comments: None,
                wr: writer,
            };

            emitter.emit_program(&program)
                .chain_with(|| error!("failed to print script", "file" => name))?;
        }

        // (generated line, generated column, source line, source column)
        let mut mapped = Vec::with_capacity(positions.len());
        for (pos, generated) in positions {
            if pos < file.start_pos || pos > file.end_pos {
                continue;
            }

            let loc = files.lookup_char_pos(pos);
            mapped.push((generated.line, generated.col, loc.line - 1, loc.col.0 as u32));
        }

        let code = String::from_utf8(code)
            .map_err(|e| error!("printed script is not valid UTF-8", "file" => name, e))?;

        Ok((code, mapped))
    }
}

impl Map for JsMinify {
    fn name(&self) -> &str {
        "minify"
    }

    fn map(&self, mut asset: Asset) -> Result<Asset> {
        let name = asset.relative.to_slash_lossy();
        let (code, positions) = JsMinify::minify(&name, asset.require_text()?)?;

        let mut map = match &asset.map {
            Some(input) => SourceMap { lines: vec![], ..input.clone() },
            None => SourceMap::new(),
        };

        let own = match &asset.map {
            Some(_) => None,
            None => Some(map.add_source(&name, asset.as_text())),
        };

        for (line, column, source_line, source_column) in positions {
            let segment = match (&asset.map, own) {
                (Some(input), _) => match input.lookup(source_line, source_column) {
                    Some(found) => Segment { column, ..found },
                    None => continue,
                },
                (None, Some(source)) => Segment {
                    column,
                    source,
                    line: source_line as u32,
                    source_column,
                },
                (None, None) => continue,
            };

            map.push(line as usize, segment);
        }

        map.lines.resize(code.split('\n').count(), vec![]);
        asset.contents = Either::Left(code);
        asset.map = Some(map);
        Ok(asset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{Batch, Transform};

    #[test]
    fn valid_scripts_have_no_problems() {
        let source = r#"
            // a comment with ( and {
            var re = /[)}]+/g, s = "}", t = '(', u = `a ${ f({ x: [1] }) } b`;
            /* block ] */ function f(o) { return o.x.length / 2; }
        "#;

        assert!(syntax_errors("ok.js", source).is_empty());
    }

    #[test]
    fn syntax_errors_carry_their_line() {
        let problems = syntax_errors("broken.js", "var a = 1;\nf(a];\n");
        assert!(!problems.is_empty());
        assert_eq!(problems[0].line, 2);

        assert!(!syntax_errors("string.js", "var a = 'b;\n").is_empty());
    }

    #[test]
    fn minifies_and_maps_tokens_to_their_source() {
        let asset = Asset::text("b", "app.js", "function app() {\n    // note\n    return 1;\n}\n");
        let batch = JsMinify.apply(Batch::new(vec![asset]));
        assert!(batch.failures.is_empty());

        let asset = &batch.assets[0];
        let code = asset.as_text().unwrap();
        assert!(code.starts_with("function app(){return 1"), "{code}");
        assert!(!code.contains("note"));

        let map = asset.map.as_ref().unwrap();
        assert_eq!(map.sources, ["app.js"]);
        let ret = code.find("return").unwrap() as u32;
        let found = map.lookup(0, ret).unwrap();
        assert_eq!((found.line, found.source_column), (2, 4));
    }

    #[test]
    fn minified_bundles_map_through_the_bundle() {
        let mut input = SourceMap::new();
        input.append(&Asset::text("b", "a.js", "var a = 1;"), 1);
        input.append(&Asset::text("b", "b.js", "var b = 2;"), 1);

        let mut bundle = Asset::text("b", "all.js", "var a = 1;\nvar b = 2;");
        bundle.map = Some(input);

        let batch = JsMinify.apply(Batch::new(vec![bundle]));
        let asset = &batch.assets[0];
        let code = asset.as_text().unwrap();
        let map = asset.map.as_ref().unwrap();
        assert_eq!(map.sources, ["a.js", "b.js"]);

        let b = code.rfind("var").unwrap() as u32;
        let found = map.lookup(0, b).unwrap();
        assert_eq!((found.source, found.line, found.source_column), (1, 0, 0));
    }

    #[test]
    fn unparsable_scripts_are_failures() {
        let batch = JsMinify.apply(Batch::new(vec![Asset::text("b", "x.js", "f(;")]));
        assert!(batch.assets.is_empty());
        assert_eq!(&*batch.failures[0].stage, "minify");
    }
}
