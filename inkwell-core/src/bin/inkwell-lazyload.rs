use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::{Builder, Target};
use inkwell_config::{ConfigSource, LazyImageConfig};
use inkwell_core::{
    BlogView, Document, ElementState, GridLayout, HttpImageProbe, LoaderOptions,
    LoaderSlot, Settlement, SharedPage, SortOrder,
};
use inkwell_model::{Article, Rect, default_articles};
use log::LevelFilter;

#[derive(Parser)]
#[command(
    name = "inkwell-lazyload",
    about = "Render the blog grid and lazily load its images while scrolling"
)]
struct Cli {
    /// Loader config file (TOML or JSON); overrides the environment lookup
    #[arg(long)]
    config: Option<PathBuf>,
    /// JSON array of extra articles to publish before scrolling
    #[arg(long)]
    article_json: Option<PathBuf>,
    #[arg(long, default_value_t = 900.0)]
    viewport_height: f32,
    #[arg(long, default_value_t = 1280.0)]
    viewport_width: f32,
    /// Scroll distance between visibility checks
    #[arg(long, default_value_t = 300.0)]
    step: f32,
    /// Category to show (`all topics` shows everything)
    #[arg(long)]
    category: Option<String>,
    #[arg(long, default_value = "most recent")]
    sort: SortOrder,
}

fn init_logger() {
    Builder::new()
        .target(Target::Stdout)
        .filter_level(LevelFilter::Warn)
        .filter_module("inkwell_core", LevelFilter::Debug)
        .filter_module("inkwell_lazyload", LevelFilter::Debug)
        .init();
}

fn load_config(cli: &Cli) -> Result<(LazyImageConfig, ConfigSource)> {
    match &cli.config {
        Some(path) => {
            let config = LazyImageConfig::load_from_file(path)?;
            config
                .validate()
                .with_context(|| format!("invalid config in {}", path.display()))?;
            Ok((config, ConfigSource::File(path.clone())))
        }
        None => LazyImageConfig::load_from_env(),
    }
}

fn load_articles(path: &Path) -> Result<Vec<Article>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse articles in {}", path.display()))
}

fn describe(state: &ElementState) -> String {
    match state {
        ElementState::Settled(Settlement::Loaded { source }) => {
            format!("loaded {source}")
        }
        ElementState::Settled(Settlement::Fallback { source, reason }) => {
            format!("fallback {source} ({reason})")
        }
        ElementState::Settled(Settlement::Failed {
            content_type,
            reason,
        }) => format!("failed, no fallback for {content_type} ({reason})"),
        other => format!("{other:?}").to_lowercase(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        init_logger();
    } else {
        env_logger::init();
    }

    let cli = Cli::parse();
    let (config, source) = load_config(&cli)?;
    log::info!("Image loader configuration from {source:?}");

    let probe = HttpImageProbe::new(&config.http)
        .context("failed to build HTTP image probe")?;
    let page = SharedPage::default();
    let slot = Arc::new(LoaderSlot::new(Arc::new(page.clone()), Arc::new(probe)));
    let loader = slot.get_instance(Some(LoaderOptions::from_config(&config)?))?;

    let mut view = BlogView::new(page.clone(), Arc::clone(&slot), GridLayout::default())?
        .with_articles(default_articles());
    view.display()?;

    if let Some(path) = &cli.article_json {
        for article in load_articles(path)? {
            view.add_article(article)?;
        }
    }
    view.sort(cli.sort)?;
    if let Some(category) = &cli.category {
        let summary = view.filter_category(category)?;
        log::info!("{} card(s) shown, {} hidden", summary.shown, summary.hidden);
    }

    let step = cli.step.max(1.0);
    let mut top = 0.0_f32;
    while top < view.content_height() {
        loader.scroll_to(Rect::new(0.0, top, cli.viewport_width, cli.viewport_height));
        let settled = loader.drain().await;
        log::debug!("Scrolled to {top}: {} load(s) settled", settled.len());
        top += step;
    }

    for id in page.query_all(&loader.options().selectors) {
        println!(
            "{:<8} {:<40} {}",
            id.to_string(),
            page.describe(id),
            describe(&loader.state(id))
        );
    }

    slot.disconnect();
    Ok(())
}
