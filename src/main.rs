mod config;
mod crawl;
mod dialogue;
mod parser;
mod pokedex;
mod store;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};

use config::Settings;
use crawl::ScrapeStats;
use dialogue::Mode;
use pokedex::Selection;

#[derive(Parser)]
#[command(name = "pokedex_qa", about = "Bulbapedia Pokémon scraper and caption dataset builder")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape detail pages into data/pokemon_data.json
    Scrape {
        /// Random sample size (default: every Pokémon in the index)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Turn scraped records into image/prompt/caption pairs
    Format {
        #[arg(short, long, value_enum, default_value_t = Mode::Simple)]
        mode: Mode,
        /// Scraped records (default: data/pokemon_data.json)
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Dialogue output (default: data/basicQA.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Scrape + format in one pipeline
    Run {
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        #[arg(short, long, value_enum, default_value_t = Mode::Simple)]
        mode: Mode,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;

    let result = match cli.command {
        Commands::Scrape { limit } => scrape(&settings, Selection::from_limit(limit))
            .await
            .map(|_| ()),
        Commands::Format { mode, input, output } => {
            let input = input.unwrap_or_else(|| settings.data_path());
            let output = output.unwrap_or_else(|| settings.dialogue_path());
            format_dialogues(&input, &output, mode)
        }
        Commands::Run { limit, mode } => {
            // Phase 1: Scrape
            let t_scrape = Instant::now();
            let stats = scrape(&settings, Selection::from_limit(limit)).await?;
            println!("Scraped in {}", format_duration(t_scrape.elapsed()));

            // Phase 2: Format
            format_scraped(&settings, &stats, mode)
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

async fn scrape(settings: &Settings, selection: Selection) -> anyhow::Result<ScrapeStats> {
    std::fs::create_dir_all(&settings.images_dir)
        .with_context(|| format!("Failed to create {:?}", settings.images_dir))?;
    std::fs::create_dir_all(&settings.data_dir)
        .with_context(|| format!("Failed to create {:?}", settings.data_dir))?;

    let client = crawl::build_client(settings)?;
    let entries = pokedex::fetch_entries(&client, settings).await?;
    let entries = pokedex::select(entries, selection, &mut rand::thread_rng());

    let (records, stats) = crawl::scrape_entries(&client, settings, &entries).await?;
    let output = settings.data_path();
    store::save_json(&output, &records)?;

    println!(
        "Scraping complete! {} processed: {} valid, {} skipped, {} errors.",
        stats.total, stats.accepted, stats.skipped, stats.errors
    );
    println!("Data saved to {}", output.display());
    Ok(stats)
}

fn format_dialogues(input: &Path, output: &Path, mode: Mode) -> anyhow::Result<()> {
    let count = dialogue::generate_dialogues(input, output, mode)
        .with_context(|| format!("Failed to generate dialogues from {}", input.display()))?;
    println!("Generated {} dialogue pairs.", count);
    println!("Output saved to {}", output.display());
    Ok(())
}

/// Second half of `run`. A scrape that accepted nothing fails the run.
fn format_scraped(settings: &Settings, stats: &ScrapeStats, mode: Mode) -> anyhow::Result<()> {
    if stats.accepted == 0 {
        anyhow::bail!("No Pokémon were accepted, nothing to format");
    }
    format_dialogues(&settings.data_path(), &settings.dialogue_path(), mode)
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
