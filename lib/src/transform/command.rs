use std::io::{Read, Write};
use std::process::{Command as Process, Stdio};
use std::thread;

use either::Either;

use crate::asset::Asset;
use crate::error::{Result, Chainable};
use crate::transform::Map;

/// Pipes each asset through an external program: the contents are written to
/// its stdin and replaced by its stdout. A non-zero exit is a failure for the
/// file. The program can't be expected to keep line positions, so any source
/// map is dropped.
#[derive(Debug, Clone)]
pub struct Command {
    name: String,
    program: String,
    args: Vec<String>,
}

impl Command {
    /// Builds a command from an argument vector, the first element naming the
    /// program. Returns `None` for an empty vector.
    pub fn from_argv(stage: &str, argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Command { name: stage.into(), program: program.clone(), args: args.to_vec() })
    }

    fn run(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut child = Process::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .chain_with(|| error!("failed to start external program", "program" => &self.program))?;

        // stdout and stderr are both drained while stdin is being written;
        // a program blocked on either pipe would never exit otherwise.
        let (stdin, stdout, stderr) = (child.stdin.take(), child.stdout.take(), child.stderr.take());
        let (written, output, errors) = thread::scope(|s| {
            let writer = s.spawn(move || match stdin {
                Some(mut stdin) => stdin.write_all(input),
                None => Ok(()),
            });

            let errors = s.spawn(move || drain(stderr));
            let output = drain(stdout);
            let written = writer.join().unwrap_or_else(|_| Err(std::io::ErrorKind::BrokenPipe.into()));
            let errors = errors.join().unwrap_or_else(|_| Ok(vec![])).unwrap_or_default();
            (written, output, errors)
        });

        let status = child.wait()
            .chain_with(|| error!("failed to wait for external program", "program" => &self.program))?;

        if !status.success() {
            return err!("external program failed",
                "program" => &self.program,
                "status" => status,
                String::from_utf8_lossy(&errors).trim());
        }

        written.chain_with(|| error!("failed to write to external program", "program" => &self.program))?;
        output.chain_with(|| error!("failed to read from external program", "program" => &self.program))
    }
}

fn drain<R: Read>(pipe: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buf = vec![];
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf)?;
    }

    Ok(buf)
}

impl Map for Command {
    fn name(&self) -> &str {
        &self.name
    }

    fn map(&self, mut asset: Asset) -> Result<Asset> {
        let output = self.run(asset.as_bytes())?;
        asset.contents = match String::from_utf8(output) {
            Ok(text) => Either::Left(text),
            Err(e) => Either::Right(e.into_bytes()),
        };

        asset.map = None;
        Ok(asset)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::transform::{Batch, Transform};

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn replaces_contents_with_stdout() {
        let upper = Command::from_argv("annotate", &argv(&["tr", "a-z", "A-Z"])).unwrap();
        let batch = upper.apply(Batch::new(vec![Asset::text("b", "app.js", "abc")]));
        assert!(batch.failures.is_empty());
        assert_eq!(batch.assets[0].as_text(), Some("ABC"));
    }

    #[test]
    fn failing_programs_are_failures() {
        let fail = Command::from_argv("minify", &argv(&["sh", "-c", "echo nope >&2; exit 3"])).unwrap();
        let batch = fail.apply(Batch::new(vec![Asset::text("b", "app.js", "abc")]));
        assert!(batch.assets.is_empty());
        assert_eq!(&*batch.failures[0].stage, "minify");
        assert!(batch.failures[0].error.to_string().contains("nope"));
    }

    #[test]
    fn noisy_programs_do_not_block() {
        let script = "head -c 200000 /dev/zero | tr '\\0' w >&2; cat";
        let noisy = Command::from_argv("annotate", &argv(&["sh", "-c", script])).unwrap();
        let batch = noisy.apply(Batch::new(vec![Asset::text("b", "app.js", "abc")]));
        assert!(batch.failures.is_empty());
        assert_eq!(batch.assets[0].as_text(), Some("abc"));
    }

    #[test]
    fn empty_argv_is_no_command() {
        assert!(Command::from_argv("minify", &[]).is_none());
    }
}
