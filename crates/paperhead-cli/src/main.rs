use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use paperhead_core::{CSV_FILENAME, Config, Extraction};
use tracing_subscriber::EnvFilter;

mod output;

use output::ColorMode;

/// Research Paper Extractor - Pull title, authors and year from a PDF via GROBID
#[derive(Parser, Debug)]
#[command(name = "paperhead", version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send a PDF to GROBID and extract its header metadata
    Extract {
        /// Path to the PDF to process
        file_path: PathBuf,

        /// Where to write the CSV (default: ./metadata.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// GROBID base URL (overrides GROBID_URL and config files)
        #[arg(long)]
        grobid_url: Option<String>,

        /// Request timeout in seconds (overrides GROBID_TIMEOUT and config files)
        #[arg(long)]
        timeout: Option<u64>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Extract header metadata from a TEI XML file already on disk
    Parse {
        /// Path to the TEI XML document
        file_path: PathBuf,

        /// Where to write the CSV (default: ./metadata.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Extract {
            file_path,
            output,
            grobid_url,
            timeout,
            no_color,
        } => extract(file_path, output, grobid_url, timeout, ColorMode(!no_color)).await,
        Command::Parse {
            file_path,
            output,
            no_color,
        } => parse(&file_path, output, ColorMode(!no_color)),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn extract(
    file_path: PathBuf,
    output: Option<PathBuf>,
    grobid_url: Option<String>,
    timeout: Option<u64>,
    color: ColorMode,
) -> anyhow::Result<()> {
    // Resolve configuration: CLI flags > env vars > config files > defaults
    let mut config = Config::load();
    if let Some(url) = grobid_url {
        config.grobid_url = url;
    }
    if let Some(secs) = timeout {
        config.timeout = Duration::from_secs(secs);
    }

    let pdf = std::fs::read(&file_path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", file_path.display(), e))?;
    let filename = file_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.pdf")
        .to_string();

    let mut stdout = std::io::stdout();
    writeln!(stdout, "Processing {} with GROBID at {}...", filename, config.grobid_url)?;

    let client = config.client();
    let extraction = paperhead_core::handle_upload(&client, &filename, pdf)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    report(&mut stdout, extraction, output, color)
}

fn parse(file_path: &Path, output: Option<PathBuf>, color: ColorMode) -> anyhow::Result<()> {
    let tei_xml = std::fs::read_to_string(file_path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", file_path.display(), e))?;
    let extraction = paperhead_core::extract_record(&tei_xml);
    report(&mut std::io::stdout(), extraction, output, color)
}

/// Print the record (and any parse error), then write the CSV.
fn report(
    w: &mut dyn Write,
    extraction: Extraction,
    output: Option<PathBuf>,
    color: ColorMode,
) -> anyhow::Result<()> {
    if let Some(ref err) = extraction.parse_error {
        output::print_parse_error(w, err, color)?;
    }
    output::print_record(w, &extraction.record, color)?;

    let path = output.unwrap_or_else(|| PathBuf::from(CSV_FILENAME));
    let csv = extraction.record.to_csv()?;
    std::fs::write(&path, csv)
        .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", path.display(), e))?;
    tracing::debug!(path = %path.display(), "wrote CSV");
    writeln!(w)?;
    writeln!(w, "Metadata written to {}", path.display())?;
    Ok(())
}
