//! Batch driver: discover `.msg` files and dispatch them to an emitter

use crate::eml::convert_to_eml;
use crate::error::{ConvertError, Result};
use crate::mbox::append_to_mbox;
use crate::naming::UniqueNames;
use crate::pdf::convert_to_pdf;
use crate::render::HtmlRenderer;
use crate::source::MessageOpener;
use crate::table::convert_to_csv;
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{info, warn};
use walkdir::WalkDir;

/// Name of the mailbox written in MBOX mode
pub const MBOX_FILE_NAME: &str = "output.mbox";

/// Name of the table written in CSV mode
pub const CSV_FILE_NAME: &str = "messages.csv";

/// Selectable output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Pdf,
    Eml,
    Mbox,
    Csv,
}

impl OutputFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Eml => "eml",
            Self::Mbox => "mbox",
            Self::Csv => "csv",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// One file that could not be converted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: String,
}

impl FileFailure {
    pub fn new(path: &Path, error: &ConvertError) -> Self {
        Self {
            path: path.to_path_buf(),
            error: error.to_string(),
        }
    }
}

impl fmt::Display for FileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.error)
    }
}

/// Outcome of a batch run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Messages converted successfully
    pub converted: usize,
    /// Messages that failed, with their error
    pub failures: Vec<FileFailure>,
    /// Files produced
    pub outputs: Vec<PathBuf>,
}

impl BatchReport {
    /// Failures as `path: error` strings
    #[must_use]
    pub fn error_messages(&self) -> Vec<String> {
        self.failures.iter().map(ToString::to_string).collect()
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

fn is_msg_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("msg"))
}

/// All `.msg` files under `input`, sorted. A single `.msg` path is accepted
/// as its own batch.
pub fn discover_msg_files(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return if is_msg_file(input) {
            Ok(vec![input.to_path_buf()])
        } else {
            Err(ConvertError::InvalidInput(input.to_path_buf()))
        };
    }
    if !input.is_dir() {
        return Err(ConvertError::InvalidInput(input.to_path_buf()));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(input)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry: {e}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_msg_file(entry.path()))
        .map(walkdir::DirEntry::into_path)
        .collect();
    files.sort();
    Ok(files)
}

/// How PDF conversions are executed
pub enum PdfStrategy {
    /// Re-run an executable per file as `<exe> <args...> pdf <input> <output>`,
    /// so a renderer crash only takes down the child
    Isolated { exe: PathBuf, args: Vec<String> },
    /// Render inside this process
    InProcess(Box<dyn HtmlRenderer>),
}

impl PdfStrategy {
    /// Isolation through the currently running executable
    pub fn current_exe(args: Vec<String>) -> Result<Self> {
        let exe = std::env::current_exe().map_err(|e| ConvertError::io("current executable", e))?;
        Ok(Self::Isolated { exe, args })
    }
}

fn convert_isolated(exe: &Path, args: &[String], input: &Path, output: &Path) -> Result<()> {
    let status = Command::new(exe)
        .args(args)
        .arg("pdf")
        .arg(input)
        .arg(output)
        .status()
        .map_err(|e| ConvertError::io(exe, e))?;

    if status.success() {
        Ok(())
    } else {
        Err(ConvertError::Isolated {
            path: input.to_path_buf(),
            status: status.to_string(),
        })
    }
}

/// Output path `<output_dir>/<stem>.<ext>`
#[must_use]
pub fn output_path(output_dir: &Path, input: &Path, format: OutputFormat) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or_else(|| "message".into(), |s| s.to_string_lossy().into_owned());
    output_dir.join(format!("{stem}.{}", format.extension()))
}

/// [`output_path`], suffixed with ` (n)` when an earlier file in the run
/// already produced that name (same stem in another folder)
fn claim_output_path(
    names: &mut UniqueNames,
    output_dir: &Path,
    input: &Path,
    format: OutputFormat,
) -> PathBuf {
    let wanted = output_path(output_dir, input, format);
    let file_name = display_name(&wanted);
    let claimed = names.claim(&file_name);
    if claimed != file_name {
        warn!(
            "{} would overwrite {file_name}, writing {claimed} instead",
            input.display()
        );
    }
    output_dir.join(claimed)
}

/// Converts a directory of messages into one output format
pub struct BatchConverter<'a> {
    opener: &'a dyn MessageOpener,
    pdf: PdfStrategy,
    progress: ProgressBar,
}

impl<'a> BatchConverter<'a> {
    pub fn new(opener: &'a dyn MessageOpener, pdf: PdfStrategy) -> Self {
        Self {
            opener,
            pdf,
            progress: ProgressBar::hidden(),
        }
    }

    /// Report per-file progress on `progress`
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Convert everything under `input` into `output_dir`.
    ///
    /// Per-file failures land in the report; failing to create the output
    /// directory or to write a combined output aborts the batch.
    pub fn run(&self, input: &Path, output_dir: &Path, format: OutputFormat) -> Result<BatchReport> {
        fs::create_dir_all(output_dir).map_err(|e| ConvertError::io(output_dir, e))?;

        let report = match format {
            OutputFormat::Csv => {
                convert_to_csv(self.opener, input, &output_dir.join(CSV_FILE_NAME))?
            }
            OutputFormat::Mbox => self.run_mbox(input, output_dir)?,
            OutputFormat::Pdf | OutputFormat::Eml => self.run_per_file(input, output_dir, format)?,
        };

        info!(
            "Converted {} messages to {format}, {} failed",
            report.converted,
            report.failures.len()
        );
        Ok(report)
    }

    fn convert_one(&self, input: &Path, output: &Path, format: OutputFormat) -> Result<()> {
        match (format, &self.pdf) {
            (OutputFormat::Pdf, PdfStrategy::Isolated { exe, args }) => {
                convert_isolated(exe, args, input, output)
            }
            (OutputFormat::Pdf, PdfStrategy::InProcess(renderer)) => {
                convert_to_pdf(self.opener, input, output, renderer.as_ref())
            }
            _ => convert_to_eml(self.opener, input, output),
        }
    }

    fn run_per_file(
        &self,
        input: &Path,
        output_dir: &Path,
        format: OutputFormat,
    ) -> Result<BatchReport> {
        let files = discover_msg_files(input)?;
        let mut report = BatchReport::default();
        let mut names = UniqueNames::new();
        self.progress.set_length(files.len() as u64);

        for path in &files {
            self.progress.set_message(display_name(path));
            let output = claim_output_path(&mut names, output_dir, path, format);
            match self.convert_one(path, &output, format) {
                Ok(()) => {
                    report.converted += 1;
                    report.outputs.push(output);
                }
                Err(e) => {
                    warn!("Failed to convert {}: {e}", path.display());
                    report.failures.push(FileFailure::new(path, &e));
                }
            }
            self.progress.inc(1);
        }

        self.progress.finish_and_clear();
        Ok(report)
    }

    fn run_mbox(&self, input: &Path, output_dir: &Path) -> Result<BatchReport> {
        let files = discover_msg_files(input)?;
        let temp = tempfile::Builder::new()
            .prefix("_temp_eml")
            .tempdir_in(output_dir)
            .map_err(|e| ConvertError::io(output_dir, e))?;

        let mut report = BatchReport::default();
        let mut eml_paths = Vec::with_capacity(files.len());
        self.progress.set_length(files.len() as u64);

        for (index, path) in files.iter().enumerate() {
            self.progress.set_message(display_name(path));
            // Index prefix keeps same-stem files from different folders apart.
            let stem = path
                .file_stem()
                .map_or_else(|| "message".into(), |s| s.to_string_lossy().into_owned());
            let eml = temp.path().join(format!("{index:05}_{stem}.eml"));
            match convert_to_eml(self.opener, path, &eml) {
                Ok(()) => eml_paths.push(eml),
                Err(e) => {
                    warn!("Failed to convert {}: {e}", path.display());
                    report.failures.push(FileFailure::new(path, &e));
                }
            }
            self.progress.inc(1);
        }
        self.progress.finish_and_clear();

        let mbox_path = output_dir.join(MBOX_FILE_NAME);
        let written = append_to_mbox(&eml_paths, &mbox_path)?;
        report.converted = usize::try_from(written).unwrap_or(usize::MAX);
        report.outputs.push(mbox_path);

        temp.close().map_err(|e| ConvertError::io(output_dir, e))?;
        Ok(report)
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
