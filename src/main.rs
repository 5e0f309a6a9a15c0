use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use talking_points::config::SummariserConfig;
use talking_points::pipeline::{self, RunOptions};

/// Talking Points — turn a long PDF report into ranked, page-tagged talking points.
///
/// Powered by a local Ollama model. Nothing leaves your machine.
#[derive(Parser)]
#[command(name = "talking_points")]
#[command(version = "0.1.0")]
#[command(about = "Summarise a PDF report into ranked talking points", long_about = None)]
struct Cli {
    /// Log per-chunk diagnostics
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarise a PDF into points and rank them
    ///
    /// Extracts page text, packs it into chunks, asks the model for bullet
    /// points per chunk, writes the points file and then the ranking table.
    Run(RunArgs),

    /// Rank an existing points file
    Rank {
        /// Points file to rank (defaults to the newest file in the points directory)
        #[arg(long, value_name = "FILE")]
        points: Option<PathBuf>,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Path to the input PDF (defaults to the newest PDF in ./reports)
    #[arg(long, value_name = "FILE")]
    pdf: Option<PathBuf>,

    /// Model to use for summarisation
    #[arg(long)]
    model: Option<String>,

    /// Soft character budget per chunk
    #[arg(long)]
    max_chars: Option<usize>,

    /// Characters carried over between chunks
    #[arg(long)]
    overlap: Option<usize>,

    #[arg(long)]
    temperature: Option<f64>,

    /// Backend request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Prompt template file
    #[arg(long, value_name = "FILE")]
    prompt: Option<PathBuf>,

    /// Print the page range of every chunk
    #[arg(long)]
    show_chunks: bool,

    /// Chunk only; do not call the model
    #[arg(long)]
    dry_run: bool,

    /// Pull the model if the server does not have it
    #[arg(long)]
    pull_model: bool,
}

impl RunArgs {
    fn apply(&self, config: &mut SummariserConfig) {
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(max_chars) = self.max_chars {
            config.max_chars = max_chars;
        }
        if let Some(overlap) = self.overlap {
            config.overlap = overlap;
        }
        if let Some(temperature) = self.temperature {
            config.temperature = temperature;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        if let Some(prompt) = &self.prompt {
            config.prompt_path = prompt.clone();
        }
    }

    fn options(&self) -> RunOptions {
        RunOptions {
            pdf: self.pdf.clone(),
            show_chunks: self.show_chunks,
            dry_run: self.dry_run,
            pull_model: self.pull_model,
        }
    }
}

async fn execute(cli: Cli) -> anyhow::Result<()> {
    let mut config = SummariserConfig::from_env()?;

    match cli.command {
        Commands::Run(args) => {
            args.apply(&mut config);
            pipeline::run(&config, &args.options()).await?;
            println!("\nAll done.");
        }
        Commands::Rank { points } => {
            let path = pipeline::rank_existing(&config, points.as_deref())?;
            println!("Ranked points saved to: {}", path.display());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    if let Err(e) = execute(cli).await {
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }
}
