//! docfilter CLI - document content filtering tool

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use docfilter::{
    default_output_path, Classifiers, DocumentProcessor, HttpScorer, NeutralScorer,
    ProcessOptions, ProcessingReport,
};

#[derive(Parser)]
#[command(name = "docfilter")]
#[command(version)]
#[command(about = "Filter inappropriate text and images out of TXT, DOCX and PDF documents", long_about = None)]
struct Cli {
    /// Input document
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output document (defaults to <stem>_filtered.<ext>)
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter a document with configurable classifiers
    Process {
        /// Input document
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output document (defaults to <stem>_filtered.<ext>)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// JSON file with filtering options
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Abort if extraction and filtering take longer than this
        #[arg(long, value_name = "SECS")]
        deadline: Option<f64>,

        #[command(flatten)]
        endpoints: Endpoints,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show version information
    Version,
}

#[derive(clap::Args)]
struct Endpoints {
    /// Text toxicity inference endpoint
    #[arg(long, value_name = "URL", env = "DOCFILTER_TOXICITY_URL")]
    toxicity_url: Option<String>,

    /// Image NSFW inference endpoint
    #[arg(long, value_name = "URL", env = "DOCFILTER_NSFW_URL")]
    nsfw_url: Option<String>,

    /// Image violence inference endpoint
    #[arg(long, value_name = "URL", env = "DOCFILTER_VIOLENCE_URL")]
    violence_url: Option<String>,

    /// Bearer token sent to every endpoint
    #[arg(long, value_name = "TOKEN", env = "DOCFILTER_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

impl Endpoints {
    fn none() -> Self {
        Self {
            toxicity_url: None,
            nsfw_url: None,
            violence_url: None,
            token: None,
        }
    }

    /// Build classifiers, using the neutral scorer where no endpoint is given.
    fn classifiers(&self) -> docfilter::Result<Classifiers> {
        let neutral = Arc::new(NeutralScorer);
        let mut classifiers = Classifiers::new(neutral.clone(), neutral.clone(), neutral);

        if let Some(url) = &self.toxicity_url {
            classifiers.toxicity = Arc::new(self.scorer(url)?);
        }
        if let Some(url) = &self.nsfw_url {
            classifiers.nsfw = Arc::new(self.scorer(url)?);
        }
        if let Some(url) = &self.violence_url {
            classifiers.violence = Arc::new(self.scorer(url)?);
        }
        Ok(classifiers)
    }

    fn scorer(&self, url: &str) -> docfilter::Result<HttpScorer> {
        let scorer = HttpScorer::new(url)?;
        Ok(match &self.token {
            Some(token) => scorer.with_token(token),
            None => scorer,
        })
    }

    fn is_empty(&self) -> bool {
        self.toxicity_url.is_none() && self.nsfw_url.is_none() && self.violence_url.is_none()
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Process {
            input,
            output,
            config,
            deadline,
            endpoints,
            json,
        }) => cmd_process(
            &input,
            output.as_deref(),
            config.as_deref(),
            deadline,
            &endpoints,
            json,
        ),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            // Default behavior: filter if input is provided
            if let Some(input) = cli.input {
                cmd_process(
                    &input,
                    cli.output.as_deref(),
                    None,
                    None,
                    &Endpoints::none(),
                    false,
                )
            } else {
                println!("{}", "Usage: docfilter <FILE> [OUTPUT]".yellow());
                println!("       docfilter --help for more information");
                Ok(())
            }
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn cmd_process(
    input: &Path,
    output: Option<&Path>,
    config: Option<&Path>,
    deadline: Option<f64>,
    endpoints: &Endpoints,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut options = match config {
        Some(path) => ProcessOptions::from_json_file(path)?,
        None => ProcessOptions::default(),
    };
    if let Some(secs) = deadline {
        let deadline = Duration::try_from_secs_f64(secs)
            .map_err(|e| format!("Invalid deadline {}: {}", secs, e))?;
        options = options.with_deadline(deadline);
    }

    if endpoints.is_empty() && !json {
        println!(
            "{}",
            "No classifier endpoints configured; only the blocklist and colour check apply."
                .yellow()
        );
    }

    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output_path(input));

    let processor = DocumentProcessor::new(endpoints.classifiers()?, options);

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(format!("Filtering {}...", input.display()));

    let report = processor.process(input, &output);
    pb.finish_and_clear();
    let report = report?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &ProcessingReport) {
    let text = &report.text_stats;
    let images = &report.image_stats;

    println!("{}", "Text Statistics".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "Total words".bold(), text.total_words);
    println!("{}: {}", "Filtered words".bold(), text.filtered_words);
    println!("{}: {}", "Toxic contexts".bold(), text.toxic_contexts);
    println!("{}: {:.2}", "Clean ratio".bold(), text.clean_ratio);

    println!();
    println!("{}", "Image Statistics".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "Total images".bold(), images.total_images);
    println!("{}: {}", "Flagged images".bold(), images.flagged_images);
    println!("{}: {:.2}", "Clean ratio".bold(), images.clean_ratio);
    for (category, count) in &images.categories {
        println!("  {} {}: {}", "├─".dimmed(), category, count);
    }
    if report.skipped_images > 0 {
        println!(
            "{}: {}",
            "Undecodable images".bold(),
            report.skipped_images.to_string().yellow()
        );
    }

    println!();
    println!(
        "{} {}",
        "Saved to".green(),
        report.output_file.display()
    );
}

fn cmd_version() {
    println!("{} {}", "docfilter".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Document content filtering tool");
    println!();
    println!("Library: docfilter {}", docfilter::VERSION.dimmed());
    println!("License: MIT");
}
