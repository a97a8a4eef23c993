//! swapnav entry point.
//!
//! Drives the navigation engine headlessly against a live site: fetches the
//! start page, then replays link clicks (and optionally a history pop) and
//! prints one JSON object per step on stdout. Logging goes to stderr.

use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use std::io::Write;
use swapnav_client::fetch::resolve;
use swapnav_client::{FetchConfig, Fetcher, HttpFetcher, LinkRef, Modifiers, Navigator, Page};
use swapnav_core::NavConfig;
use tracing_subscriber::EnvFilter;
use url::Url;

mod error;
mod runtime;

use error::CliError;
use runtime::HeadlessRuntime;

/// Headless client-side navigation
///
/// Clicks each HREF on the page at START_URL the way the in-page engine
/// would, swapping content in place instead of reloading.
#[derive(Parser, Debug)]
#[command(name = "swapnav")]
#[command(version, about, long_about = None)]
struct Cli {
    /// TOML configuration file (overrides SWAPNAV_CONFIG_FILE)
    #[arg(short, long)]
    config: Option<String>,

    /// Page to start on
    start_url: String,

    /// Links to click, in order, as written in the page's href attributes
    hrefs: Vec<String>,

    /// Replay a back/forward traversal to this URL after the clicks
    #[arg(long)]
    pop: Option<String>,
}

#[derive(Serialize)]
struct Step<'a, O: Serialize> {
    href: &'a str,
    outcome: O,
    url: String,
    title: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();
    let config = match cli.config.as_deref() {
        Some(path) => NavConfig::load_from(Some(path))?,
        None => NavConfig::load()?,
    };

    let start = Url::parse(&cli.start_url).map_err(|e| CliError::InvalidInput(format!("{}: {e}", cli.start_url)))?;
    let fetcher = HttpFetcher::new(FetchConfig::from(&config))?;
    let response = fetcher.get(&start).await?;
    let base = response.final_url.clone();
    let page = Page::parse(base.clone(), &response.into_html()?);
    tracing::info!(url = %base, title = page.title(), "start page loaded");

    let runtime = HeadlessRuntime::new(HttpFetcher::new(FetchConfig::from(&config))?, base);
    let navigator = Navigator::new(config, page, fetcher, runtime)?;
    navigator.on_content_replaced(|event| {
        tracing::info!(url = %event.url, from_cache = event.from_cache, "content replaced");
    });
    if !navigator.init() {
        return Err(CliError::InitFailed("engine disabled or vetoed".into()).into());
    }

    let mut out = std::io::stdout().lock();
    for href in &cli.hrefs {
        let link = navigator.page().find_link(href).unwrap_or_else(|| LinkRef::new(href.as_str()));
        let outcome = navigator.handle_click(&link, Modifiers::none()).await;
        emit(&mut out, &navigator, href, outcome)?;
        if let Some(left) = navigator.runtime().left_to() {
            tracing::warn!(url = %left, "engine handed off to native navigation, stopping");
            return Ok(());
        }
    }

    if let Some(pop) = cli.pop.as_deref() {
        let current = navigator.page().url().clone();
        let url = resolve(pop, &current).map_err(|e| CliError::InvalidInput(format!("{pop}: {e}")))?;
        let outcome = navigator.handle_pop_state(&url).await;
        emit(&mut out, &navigator, pop, outcome)?;
    }

    tracing::debug!(entries = navigator.runtime().history().len(), cached = navigator.cache().len(), "done");
    Ok(())
}

fn emit<O: Serialize>(
    out: &mut impl Write, navigator: &Navigator<HttpFetcher, HeadlessRuntime>, href: &str, outcome: O,
) -> Result<(), CliError> {
    let page = navigator.page();
    let step = Step { href, outcome, url: page.url().to_string(), title: page.title().to_string() };
    serde_json::to_writer(&mut *out, &step)?;
    writeln!(out).map_err(|e| CliError::Output(serde_json::Error::io(e)))?;
    Ok(())
}
