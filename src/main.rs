mod cli;

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, OutputArgs};
use figcursor::catalog::SpriteCatalog;
use figcursor::config::Config;
use figcursor::model::ThemeConfig;
use figcursor::pipeline::theme_writer::user_icons_dir;
use figcursor::pipeline::xcursor_reader::XcursorFile;
use figcursor::pipeline::{BuildReport, ResvgRasterizer, ThemeBuilder};
use figcursor::source::{DesignSource, LocalSource};

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Build { source, config, output } => {
            let config = resolve_config(Some(source), config.as_deref(), &output)?;
            let records = LocalSource::new(&config.source_dir).components()?;
            build(&config, records)
        }
        #[cfg(feature = "remote")]
        Command::Figma {
            file_key,
            token,
            config,
            output,
        } => {
            use figcursor::source::figma::{FigmaClient, FigmaSource};

            let config = resolve_config(None, config.as_deref(), &output)?;
            let records = FigmaSource::new(FigmaClient::new(token), file_key).components()?;
            build(&config, records)
        }
        #[cfg(feature = "remote")]
        Command::Export {
            file_key,
            token,
            output,
        } => {
            let written = figcursor::source::figma::FigmaClient::new(token).download_exports(&file_key, &output)?;
            info!("Exported {} files to {}", written, output.display());
            Ok(())
        }
        Command::Inspect { file } => inspect(&file),
        Command::InitConfig { path, force } => {
            if path.exists() && !force {
                bail!("{} already exists, pass --force to overwrite", path.display());
            }
            ThemeConfig::default()
                .save_to_file(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote default settings to {}", path.display());
            Ok(())
        }
    }
}

fn resolve_config(source: Option<PathBuf>, theme: Option<&Path>, output: &OutputArgs) -> Result<Config> {
    let mut config = Config::default();
    if let Some(source) = source {
        config.source_dir = source;
    }
    if let Some(path) = theme {
        config.theme = ThemeConfig::load_from_file(path)?;
    }
    if output.install {
        config.output_dir = user_icons_dir()?;
    } else if let Some(dir) = &output.output {
        config.output_dir = dir.clone();
    }
    config.thread_count = output.threads;
    Ok(config)
}

fn build(config: &Config, records: Vec<figcursor::ComponentRecord>) -> Result<()> {
    let catalog = SpriteCatalog::from_records(records)?;
    if catalog.is_empty() {
        bail!("No sprite components found");
    }

    let rasterizer = ResvgRasterizer;
    let report = ThemeBuilder::new(&config.theme, &rasterizer)
        .with_threads(config.thread_count)
        .run(&catalog, &config.output_dir)?;
    summarize(&report)
}

fn summarize(report: &BuildReport) -> Result<()> {
    for dir in &report.variants {
        println!("{}", dir.display());
    }
    if !report.warnings.is_empty() {
        warn!("{} warnings", report.warnings.len());
    }
    if !report.is_success() {
        for failure in &report.failures {
            eprintln!("  {}", failure);
        }
        bail!("{} cursors failed to build", report.failures.len());
    }
    Ok(())
}

fn inspect(path: &Path) -> Result<()> {
    let file = XcursorFile::from_file(path).with_context(|| format!("Failed to read {}", path.display()))?;
    println!("{}: {} images", path.display(), file.images.len());
    for size in file.sizes() {
        let images = file.images_for_size(size);
        let total: u32 = images.iter().map(|i| i.delay).sum();
        println!("  size {} ({} frames, {} ms)", size, images.len(), total);
        for (index, image) in images.iter().enumerate() {
            println!(
                "    #{:<3} {}x{} hotspot ({}, {}) delay {} ms",
                index, image.width, image.height, image.xhot, image.yhot, image.delay
            );
        }
    }
    Ok(())
}
