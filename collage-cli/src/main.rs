//! Collage page generator CLI.
//!
//! Runs one generation end-to-end and writes the assembled page to an HTML
//! file. Provider settings come from the environment (`GEMINI_API_KEY`,
//! `COLLAGE_*`) or from a TOML file passed with `--config`.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use collage::{
    ArtStyle, AssetStatus, CollagePipeline, ProgressSink, ProviderConfig, ProviderFactory,
    RunStatus,
};

#[derive(Parser)]
#[command(name = "collage")]
#[command(version)]
#[command(about = "Turn a one-line concept into a poster-style collage page")]
struct Cli {
    /// Concept for the page, e.g. "a digital lemonade stand run by robots"
    request: String,

    /// Art style: doodle, graffiti, watercolor, marker or blueprint
    #[arg(long, default_value = "doodle")]
    style: ArtStyle,

    /// Output file; defaults to <Theme_Name>_Site.html
    #[arg(long, short)]
    out: Option<PathBuf>,

    /// TOML provider config; environment variables are used otherwise
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Prints coarse progress while the pipeline runs.
struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn run_status(&self, status: RunStatus) {
        match status {
            RunStatus::Planning => println!("planning the collage..."),
            RunStatus::Painting => println!("painting assets..."),
            RunStatus::Assembling => println!("assembling the page..."),
            RunStatus::Completed => println!("done."),
            RunStatus::Failed => eprintln!("run failed."),
            RunStatus::Idle => {}
        }
    }

    fn asset_status(&self, asset_id: &str, status: AssetStatus) {
        match status {
            AssetStatus::Completed => println!("  painted {}", asset_id),
            AssetStatus::Failed => println!("  failed  {}", asset_id),
            AssetStatus::Pending | AssetStatus::Painting => {}
        }
    }
}

/// Default export name derived from the plan's theme, whitespace collapsed
/// to underscores.
fn default_file_name(theme_name: &str) -> String {
    format!(
        "{}_Site.html",
        theme_name.split_whitespace().collect::<Vec<_>>().join("_")
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            ProviderConfig::from_toml(&text)?
        }
        None => ProviderConfig::from_env(),
    };

    let provider = ProviderFactory::create(config)?;
    let pipeline = CollagePipeline::with_sink(Arc::from(provider), Arc::new(ConsoleProgress));

    let page = pipeline.run(&cli.request, cli.style).await?;
    tracing::debug!(metadata = ?page.metadata, "run metadata");

    let out = cli.out.unwrap_or_else(|| {
        PathBuf::from(default_file_name(&page.plan.design_system.theme_name))
    });
    fs::write(&out, &page.html)
        .with_context(|| format!("failed to write {}", out.display()))?;

    let painted = page
        .assets
        .iter()
        .filter(|a| a.status == AssetStatus::Completed)
        .count();
    println!("theme: {}", page.plan.design_system.theme_name);
    println!("assets: {}/{} painted", painted, page.assets.len());
    if page.degraded {
        eprintln!("warning: assembly failed, wrote the fallback error page instead");
    }
    println!("wrote {}", out.display());

    Ok(())
}
