//! Cardstock CLI - Command line tool for generating scorecard PDFs.

use anyhow::{Context, Result};
use cardstock_core::{AppConfig, MappingConfig, ScorecardGenerator};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "cardstock")]
#[command(author, version, about = "Generate print-ready scorecard PDFs", long_about = None)]
struct Args {
    /// DOCX template with NAME_1-style slots
    #[arg(required = true)]
    template: PathBuf,

    /// Delimited data source (CSV or TSV)
    #[arg(required = true)]
    data: PathBuf,

    /// Mapping descriptor JSON file (default: identity mapping, 4 cards per page)
    #[arg(short, long)]
    mapping: Option<PathBuf>,

    /// Cards per page, overriding the mapping descriptor
    #[arg(short = 'n', long)]
    cards_per_page: Option<usize>,

    /// Static back page PDF merged behind every front page
    #[arg(short, long)]
    back: Option<PathBuf>,

    /// Output PDF file (default: final_scorecards.pdf next to the data file)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Office binary used for conversion
    #[arg(long, env = "CARDSTOCK_SOFFICE")]
    soffice: Option<PathBuf>,

    /// Conversion timeout per page, in seconds
    #[arg(long, env = "CARDSTOCK_TIMEOUT")]
    timeout: Option<u64>,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Convert the unfilled template alone instead of running the pipeline
    #[arg(long)]
    preview: bool,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Setup logging
    let log_level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    // Load or create config
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load()
    };

    // Override config with CLI arguments
    if let Some(soffice) = args.soffice {
        config.converter.binary = soffice;
    }
    if let Some(timeout) = args.timeout {
        config.converter.timeout_secs = timeout;
    }

    let generator = ScorecardGenerator::new(&config);
    let scratch = tempfile::tempdir().context("Failed to create scratch directory")?;

    if args.preview {
        let preview = generator
            .preview(&args.template, args.back.as_deref(), scratch.path())
            .await
            .context("Preview failed")?;

        let output_path = args
            .output
            .unwrap_or_else(|| PathBuf::from("preview.pdf"));
        std::fs::copy(&preview, &output_path)
            .context(format!("Failed to write output: {}", output_path.display()))?;

        // CLI output is intentional
        #[allow(clippy::print_stdout)]
        {
            println!("Preview saved to: {}", output_path.display());
        }
        return Ok(());
    }

    let mut mapping = match &args.mapping {
        Some(path) => MappingConfig::from_file(path).context("Failed to load mapping file")?,
        None => MappingConfig::default(),
    };
    if let Some(cards_per_page) = args.cards_per_page {
        mapping.cards_per_page = cards_per_page;
    }

    info!(
        "Generating scorecards from {} with {} cards per page",
        args.data.display(),
        mapping.cards_per_page
    );

    // Setup progress bar
    let pb = ProgressBar::new(0);
    // Template is hardcoded and valid, unwrap is safe
    #[allow(clippy::unwrap_used)]
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap()
            .progress_chars("#>-"),
    );

    let job = cardstock_core::GenerateJob {
        template: args.template.clone(),
        data: args.data.clone(),
        mapping,
        back_page: args.back.clone(),
        scratch_dir: scratch.path().to_path_buf(),
    };

    let pb_clone = pb.clone();
    let assembled = generator
        .generate(
            &job,
            Some(Box::new(move |done, total| {
                #[allow(clippy::cast_possible_truncation)]
                pb_clone.set_length(total as u64);
                #[allow(clippy::cast_possible_truncation)]
                pb_clone.set_position(done as u64);
            })),
        )
        .await
        .context("Generation failed")?;

    pb.finish_with_message("Generation complete");

    // Determine output path
    let output_path = args.output.unwrap_or_else(|| {
        args.data
            .parent()
            .map_or_else(|| PathBuf::from("."), PathBuf::from)
            .join(cardstock_core::OUTPUT_FILE_NAME)
    });

    // The scratch directory is deleted on drop, so the artifact must move out
    std::fs::copy(&assembled, &output_path)
        .context(format!("Failed to write output: {}", output_path.display()))?;

    // CLI output is intentional
    #[allow(clippy::print_stdout)]
    {
        println!("Scorecards saved to: {}", output_path.display());
    }

    Ok(())
}
