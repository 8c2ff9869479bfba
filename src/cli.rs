use crate::config::{OutputFormat, load_config};
use crate::dispatch::{FileSink, dispatch};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(
    name = "review-charts",
    version,
    about = "Render systematic literature review charts from a JSON request"
)]
pub struct Args {
    /// Directory for the generated charts (created if missing)
    #[arg(short = 'o', long = "output-dir")]
    pub output_dir: PathBuf,

    /// Request JSON file, or '-' for stdin (the default)
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Config JSON5 file (theme, themeVariables, per-chart geometry)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Primary artifact format; overrides the config file
    #[arg(short = 'e', long = "format", value_enum)]
    pub format: Option<OutputFormat>,

    /// Also write the manifest to this file
    #[arg(short = 'm', long = "manifest")]
    pub manifest: Option<PathBuf>,

    /// Write `<chart>.layout.json` geometry dumps next to the charts
    #[arg(long = "dump-layout")]
    pub dump_layout: bool,

    /// Debug logging on stderr
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = load_config(args.config.as_deref())?;
    if let Some(format) = args.format {
        config.render.format = format;
    }

    std::fs::create_dir_all(&args.output_dir).with_context(|| {
        format!(
            "cannot create output directory {}",
            args.output_dir.display()
        )
    })?;
    let input = read_input(args.input.as_deref())?;

    let mut sink = FileSink::new(&args.output_dir, config.clone()).with_layout_dump(args.dump_layout);
    let manifest = dispatch(&input, &mut sink, &config)?;
    tracing::info!(charts = manifest.len(), "done");

    let json = serde_json::to_string(&manifest)?;
    if let Some(path) = args.manifest.as_deref() {
        std::fs::write(path, &json)
            .with_context(|| format!("cannot write manifest {}", path.display()))?;
    }
    println!("{json}");
    Ok(())
}

/// Logs go to stderr; stdout carries only the manifest.
fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(io::stderr),
        )
        .try_init();
}

fn read_input(path: Option<&Path>) -> Result<String> {
    let mut buf = String::new();
    match path {
        Some(path) if path != Path::new("-") => {
            buf = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read input {}", path.display()))?;
        }
        _ => {
            io::stdin().read_to_string(&mut buf)?;
        }
    }
    Ok(buf)
}
