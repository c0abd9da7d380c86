//! HTML-to-PDF rendering through an external engine

use crate::error::{ConvertError, Result};
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use tracing::debug;

/// Turns a complete HTML document into a PDF file
pub trait HtmlRenderer {
    /// Render `html` to `output`, resolving relative references against
    /// `base_dir`.
    fn render(&self, html: &str, base_dir: &Path, output: &Path) -> Result<()>;
}

/// Renderer that pipes the document into an external program.
///
/// The program is invoked as
/// `<program> <args...> --base-url <base_dir> - <output>`, which is the
/// calling convention of `weasyprint`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRenderer {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandRenderer {
    pub const DEFAULT_PROGRAM: &'static str = "weasyprint";

    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.args.extend(args);
        self
    }

    fn failure(&self, details: impl Into<String>) -> ConvertError {
        ConvertError::Render {
            program: self.program.clone(),
            details: details.into(),
        }
    }
}

impl Default for CommandRenderer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PROGRAM)
    }
}

impl HtmlRenderer for CommandRenderer {
    fn render(&self, html: &str, base_dir: &Path, output: &Path) -> Result<()> {
        debug!("Rendering {} with {}", output.display(), self.program);

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg("--base-url")
            .arg(base_dir)
            .arg("-")
            .arg(output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.failure(format!("could not start: {e}")))?;

        // stdin is fed from its own thread while stderr is drained here, so
        // a chatty renderer cannot block on a full pipe.
        let stdin = child.stdin.take();
        let (written, result) = thread::scope(|scope| {
            let writer = scope.spawn(move || {
                stdin.map_or(Ok(()), |mut stdin| stdin.write_all(html.as_bytes()))
            });
            let result = child.wait_with_output();
            (writer.join(), result)
        });
        let result = result.map_err(|e| self.failure(format!("could not wait: {e}")))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(self.failure(format!("{}: {}", result.status, stderr.trim())));
        }
        match written {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(self.failure(format!("could not write document: {e}"))),
            Err(_) => Err(self.failure("document writer panicked")),
        }
    }
}
