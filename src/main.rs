use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use msg_convert::{
    BatchConverter, BatchReport, CommandRenderer, OutlookOpener, OutputFormat, PdfStrategy,
    convert_to_csv, convert_to_pdf, extract_from_path,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Convert Outlook .msg files to PDF, EML, MBOX or CSV
#[derive(Parser, Debug)]
#[command(name = "msgconv", author, version, about, long_about = None)]
struct Cli {
    /// HTML-to-PDF program, called as `<program> [args] --base-url <dir> - <output>`
    #[arg(
        long,
        global = true,
        env = "MSGCONV_RENDERER",
        default_value = CommandRenderer::DEFAULT_PROGRAM
    )]
    renderer: String,

    /// Extra argument for the renderer (repeatable)
    #[arg(
        long = "renderer-arg",
        global = true,
        env = "MSGCONV_RENDERER_ARGS",
        value_delimiter = ' ',
        allow_hyphen_values = true
    )]
    renderer_args: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert every .msg file under a folder
    Batch {
        /// Folder containing .msg files (searched recursively)
        #[arg(long)]
        input: PathBuf,

        /// Folder for converted files
        #[arg(long)]
        output: PathBuf,

        /// Output format
        #[arg(long, value_enum)]
        format: FormatArg,

        /// Print the batch report as JSON
        #[arg(long)]
        json: bool,

        /// Render PDFs in this process instead of one child per file
        #[arg(long)]
        in_process: bool,
    },
    /// Convert a single .msg file to PDF
    Pdf {
        input: PathBuf,
        output: PathBuf,
    },
    /// Summarize .msg files (a file or a folder) into one CSV
    Csv {
        input: PathBuf,
        output: PathBuf,
    },
    /// Print the extracted fields of one .msg file as JSON
    Inspect {
        input: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    Pdf,
    Eml,
    Mbox,
    Csv,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Pdf => Self::Pdf,
            FormatArg::Eml => Self::Eml,
            FormatArg::Mbox => Self::Mbox,
            FormatArg::Csv => Self::Csv,
        }
    }
}

impl Cli {
    fn renderer(&self) -> CommandRenderer {
        CommandRenderer::new(&self.renderer).with_args(self.renderer_args.clone())
    }

    /// Global options forwarded to isolated child conversions
    fn child_args(&self) -> Vec<String> {
        let mut args = vec!["--renderer".to_string(), self.renderer.clone()];
        args.extend(
            self.renderer_args
                .iter()
                .map(|arg| format!("--renderer-arg={arg}")),
        );
        args
    }
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
    ) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

fn print_report(report: &BatchReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("Converted {} message(s)", report.converted);
    if let [output] = report.outputs.as_slice() {
        println!("Output: {}", output.display());
    }
    if !report.is_clean() {
        println!("Failed ({}):", report.failures.len());
        for failure in &report.failures {
            println!(" - {failure}");
        }
    }
    Ok(())
}

fn run_batch(
    cli: &Cli,
    input: &Path,
    output: &Path,
    format: OutputFormat,
    json: bool,
    in_process: bool,
) -> Result<ExitCode> {
    let pdf = if in_process {
        PdfStrategy::InProcess(Box::new(cli.renderer()))
    } else {
        PdfStrategy::current_exe(cli.child_args())?
    };

    let opener = OutlookOpener;
    let mut converter = BatchConverter::new(&opener, pdf);
    if !json {
        converter = converter.with_progress(progress_bar());
    }

    let report = converter
        .run(input, output, format)
        .with_context(|| format!("Batch conversion of {} failed", input.display()))?;
    print_report(&report, json)?;

    Ok(if report.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let opener = OutlookOpener;

    match &cli.command {
        Commands::Batch {
            input,
            output,
            format,
            json,
            in_process,
        } => run_batch(&cli, input, output, (*format).into(), *json, *in_process),
        Commands::Pdf { input, output } => {
            convert_to_pdf(&opener, input, output, &cli.renderer())
                .with_context(|| format!("Failed to convert {}", input.display()))?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Csv { input, output } => {
            let report = convert_to_csv(&opener, input, output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            print_report(&report, false)?;
            Ok(if report.is_clean() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            })
        }
        Commands::Inspect { input } => {
            let email = extract_from_path(&opener, input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            println!("{}", serde_json::to_string_pretty(&email)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}
