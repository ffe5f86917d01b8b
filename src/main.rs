use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use pagefeed::config::Config;
use pagefeed::feed::{FeedController, FilterCriteria};
use pagefeed::source::{DataSource, MemorySource};

/// Articles generated per category when no fixture is given.
const DEMO_ARTICLES_PER_CATEGORY: usize = 95;

/// Languages the generated corpus covers, besides the configured one.
const DEMO_LANGUAGES: &[&str] = &["en", "de", "fr", "es"];

#[derive(Parser, Debug)]
#[command(name = "pagefeed", about = "Browse a filtered, paginated article feed")]
struct Args {
    /// Config file (default: ~/.config/pagefeed/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// JSON fixture to serve articles from
    #[arg(long, value_name = "FILE")]
    fixture: Option<PathBuf>,

    /// Initial category
    #[arg(long)]
    category: Option<String>,

    /// Initial language
    #[arg(long)]
    language: Option<String>,

    /// Articles per page
    #[arg(long)]
    page_size: Option<usize>,

    /// Page the initial load starts on
    #[arg(long)]
    start_page: Option<usize>,

    /// Simulated latency per fetch in milliseconds
    #[arg(long)]
    latency_ms: Option<u64>,

    /// Fail every Nth fetch (0 = never)
    #[arg(long)]
    fail_every: Option<u64>,
}

impl Args {
    /// Command-line values override the config file.
    fn apply(self, mut config: Config) -> Config {
        if let Some(fixture) = self.fixture {
            config.fixture = Some(fixture);
        }
        if let Some(category) = self.category {
            config.category = category;
        }
        if let Some(language) = self.language {
            config.language = language;
        }
        if let Some(page_size) = self.page_size {
            config.page_size = page_size.max(1);
        }
        if let Some(start_page) = self.start_page {
            config.start_page = start_page;
        }
        if let Some(latency_ms) = self.latency_ms {
            config.latency_ms = latency_ms;
        }
        if let Some(fail_every) = self.fail_every {
            config.fail_every = fail_every;
        }
        config
    }
}

fn build_source(config: &Config) -> Result<Arc<dyn DataSource>> {
    let source = match &config.fixture {
        Some(path) => MemorySource::from_fixture(path, config.page_size)
            .with_context(|| format!("Failed to load fixture '{}'", path.display()))?,
        None => MemorySource::demo(
            &config.categories,
            &demo_languages(&config.language),
            DEMO_ARTICLES_PER_CATEGORY,
            config.page_size,
        ),
    };
    Ok(Arc::new(
        source
            .with_start_page(config.start_page)
            .with_latency(Duration::from_millis(config.latency_ms))
            .with_failure_every(config.fail_every),
    ))
}

fn demo_languages(configured: &str) -> Vec<String> {
    let mut languages: Vec<String> = DEMO_LANGUAGES.iter().map(|l| l.to_string()).collect();
    if !languages.iter().any(|l| l == configured) {
        languages.push(configured.to_string());
    }
    languages
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = args.config.clone().or_else(Config::default_path);
    let config = match &config_path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config '{}'", path.display()))?,
        None => Config::default(),
    };
    let config = args.apply(config);

    let initial: FilterCriteria = config.initial_filter();
    if !config.is_known_category(&initial.category) {
        tracing::warn!(category = %initial.category, "Initial category is not in the category list");
    }

    let source = build_source(&config)?;
    let (handle, feed) = FeedController::spawn(source, initial);

    pagefeed::ui::run(handle, feed, &config).await?;

    println!("Goodbye!");
    Ok(())
}
