//! inkprep - EPUB post-processor for e-ink readers

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use inkprep::{ProcessOptions, process};

#[derive(Parser)]
#[command(name = "inkprep")]
#[command(version, about = "EPUB post-processor for e-ink readers", long_about = None)]
#[command(after_help = "EXAMPLES:
    inkprep daily.epub out/daily.epub            Process with defaults
    inkprep daily.epub out.epub --css eink.css   Swap in a device stylesheet
    inkprep daily.epub out.epub --max-title-len 40")]
struct Cli {
    /// Input EPUB file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output EPUB file (parent directories created if missing)
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Replacement stylesheet copied into the package
    #[arg(long, value_name = "FILE")]
    css: Option<PathBuf>,

    /// Maximum navigation label length, in display characters
    #[arg(long, value_name = "N", default_value_t = 50)]
    max_title_len: usize,

    /// Leading spine entries to drop (cover page + section index)
    #[arg(long, value_name = "N", default_value_t = 2)]
    front_matter: usize,

    /// News-source marker stripped from title suffixes
    #[arg(long, value_name = "NAME", default_value = "Bloomberg")]
    source_marker: String,

    /// Verbose logging (also enabled by INKPREP_DEBUG=1)
    #[arg(short, long)]
    debug: bool,

    /// Suppress the summary line
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let debug = cli.debug || debug_env();
    init_tracing(debug);

    let options = ProcessOptions {
        max_title_len: cli.max_title_len,
        front_matter_pages: cli.front_matter,
        stylesheet: cli.css.clone(),
        source_marker: cli.source_marker.clone(),
        debug,
    };

    match process(&cli.input, &cli.output, &options) {
        Ok(report) => {
            for warning in &report.warnings {
                eprintln!("warning: {warning}");
            }
            if !cli.quiet {
                println!(
                    "{} -> {} ({} bytes, {} articles, {} images removed, {} labels shortened)",
                    cli.input.display(),
                    cli.output.display(),
                    report.output_bytes,
                    report.article_count,
                    report.images_removed,
                    report.labels_rewritten,
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn debug_env() -> bool {
    std::env::var("INKPREP_DEBUG")
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn init_tracing(debug: bool) {
    let default_filter = if debug { "inkprep=debug" } else { "inkprep=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("INKPREP_LOG")
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
