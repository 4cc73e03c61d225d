use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use scroll_pager_directory::{Directory, Frame, RandomUserClient, Settings};
use tracing_subscriber::EnvFilter;

/// Scrolls through a randomuser.me directory in the terminal, loading pages as the last card
/// comes into view.
#[derive(Parser, Debug)]
struct Cli {
    /// Settings file (defaults to `user-directory.toml` when present).
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long)]
    page_size: Option<u32>,
    /// Visible fraction of the last card that triggers the next page.
    #[arg(long)]
    threshold: Option<f32>,
    #[arg(long)]
    viewport_rows: Option<u32>,
    /// Number of scroll steps to perform after mounting.
    #[arg(long, default_value_t = 6)]
    steps: usize,
    /// Rows scrolled per step; defaults to one viewport.
    #[arg(long)]
    step_rows: Option<i64>,
}

impl Cli {
    fn apply(&self, settings: &mut Settings) {
        if let Some(api_url) = &self.api_url {
            settings.api_url = api_url.clone();
        }
        if let Some(page_size) = self.page_size {
            settings.page_size = page_size;
        }
        if let Some(threshold) = self.threshold {
            settings.threshold = threshold;
        }
        if let Some(viewport_rows) = self.viewport_rows {
            settings.viewport_rows = viewport_rows;
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref()).context("loading settings")?;
    cli.apply(&mut settings);
    settings.normalize();

    let client = RandomUserClient::new(&settings.api_url)
        .with_context(|| format!("invalid api url {}", settings.api_url))?;
    let directory = Directory::new(Arc::new(client), &settings)?;

    let frame = directory.mount().await;
    print_window(&directory, &frame, 0);

    let step = cli
        .step_rows
        .unwrap_or_else(|| i64::from(settings.viewport_rows));
    for i in 1..=cli.steps {
        let frame = directory.scroll_by(step).await;
        print_window(&directory, &frame, i);
    }

    let view = directory.view();
    println!(
        "loaded {} users, next page {}, more available: {}",
        view.users.len(),
        directory.list().next_page(),
        directory.list().has_more()
    );
    Ok(())
}

fn print_window(directory: &Directory, frame: &Frame, step: usize) {
    println!(
        "-- step {step}: rows {}..{} of {} --",
        directory.scroll_offset(),
        directory.scroll_offset() + u64::from(directory.viewport_rows()),
        frame.lines.len()
    );
    for line in directory.visible_lines(frame) {
        println!("{line}");
    }
}
