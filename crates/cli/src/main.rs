mod echo;

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use declutter_core::{
    Article, Declutter, DeclutterConfig, DeclutterError, ExtractionMode, OutputFormat, fetch_file, fetch_stdin,
    fetch_url,
};
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;
use url::Url;

use crate::echo::*;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Output format for extracted content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Format(OutputFormat);

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "html" => Ok(Self(OutputFormat::Html)),
            "text" | "txt" => Ok(Self(OutputFormat::PlainText)),
            "json" => Ok(Self(OutputFormat::Json)),
            "markdown" | "md" => Ok(Self(OutputFormat::Markdown)),
            _ => Err(format!("Invalid format: {}. Valid options: html, text, json, markdown", s)),
        }
    }
}

/// Strip boilerplate from web pages and extract the readable content
#[derive(Parser, Debug)]
#[command(name = "declutter")]
#[command(version)]
#[command(about = "Strip boilerplate from web pages and extract the readable content", long_about = None)]
struct Args {
    /// URL to fetch, local HTML file, or "-" for stdin
    #[arg(value_name = "INPUT")]
    input: String,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Output format (html, text, json, markdown)
    #[arg(short, long, default_value = "html", value_name = "FORMAT")]
    format: Format,

    /// Extraction mode (heuristic, structured)
    #[arg(short, long, default_value = "heuristic", value_name = "MODE")]
    mode: ExtractionMode,

    /// Base URL for resolving images in file or stdin input
    #[arg(long, value_name = "URL")]
    base_url: Option<Url>,

    /// HTTP timeout in seconds
    #[arg(long, default_value = "30", value_name = "SECS")]
    timeout: u64,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Read the input, returning the markup and the URL it came from
async fn acquire(args: &Args, config: &DeclutterConfig) -> anyhow::Result<(String, Option<Url>)> {
    if args.input == "-" {
        if args.verbose {
            print_step(1, 3, "Reading from stdin");
        }
        let html = fetch_stdin().context("Failed to read from stdin")?;
        Ok((html, args.base_url.clone()))
    } else if is_url(&args.input) {
        if args.verbose {
            print_step(1, 3, &format!("Fetching from {}", args.input.bright_white().underline()));
        }
        let html = fetch_url(&args.input, &config.fetch).await.context("Failed to fetch URL")?;
        let url = Url::parse(&args.input).context("Failed to parse URL")?;
        Ok((html, Some(url)))
    } else {
        if args.verbose {
            print_step(1, 3, &format!("Reading from file {}", args.input.bright_white()));
        }
        let html = fetch_file(&args.input).with_context(|| format!("Failed to read file: {}", args.input))?;
        Ok((html, args.base_url.clone()))
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    if args.verbose {
        print_banner();
        print_info("Debug logging enabled");
        eprintln!();
    }

    let config = DeclutterConfig::builder().mode(args.mode).timeout(args.timeout).build();
    let declutter = Declutter::with_config(config);
    let start = Instant::now();

    let (html, base) = acquire(&args, declutter.config()).await?;
    let acquired = start.elapsed();

    if args.verbose {
        print_detail("Size", &format_size(html.len()));
        eprintln!();
        print_step(2, 3, &format!("Extracting main content ({} mode)", args.mode));
    }

    let extraction = declutter.extract(&html, base.clone()).context("Failed to extract content")?;
    let extracted = start.elapsed() - acquired;

    let source_url = is_url(&args.input).then(|| args.input.clone()).or_else(|| base.map(String::from));
    let article = Article::from_extraction(&extraction, source_url);

    if args.verbose {
        if let Some(title) = &article.title {
            print_detail("Title", title);
        }
        print_extraction_details(&extraction.report);
    }

    let output = article.to_format(args.format.0).context("Failed to render output")?;

    if args.verbose {
        print_step(3, 3, "Writing output");
        print_detail("Format", &format!("{:?}", args.format.0));
        eprintln!();
        print_timing_summary(start.elapsed(), &[("Acquire", acquired), ("Extract", extracted)]);
    }

    match args.output {
        Some(path) => {
            fs::write(&path, output).with_context(|| format!("Failed to write to file: {}", path.display()))?;
            print_success(&format!("Output written to {}", path.display().bright_white()));
        }
        None => {
            print!("{}", output);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("declutter_core=debug"))
            .with_writer(std::io::stderr)
            .init();
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            print_error(&format!("{error:#}"));
            if let Some(suggestion) = error.downcast_ref::<DeclutterError>().and_then(DeclutterError::suggestion) {
                print_info(suggestion);
            }
            ExitCode::FAILURE
        }
    }
}
