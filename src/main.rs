use anyhow::{Context, Result};
use clap::{Arg, Command};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

use video_locator::{LocatorConfig, MessageHandler, Page, VideoLocator};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("Video Locator")
        .version("0.1.0")
        .author("TigreRoll")
        .about("Locate videos in a rendered HTML document")
        .arg(
            Arg::new("html")
                .long("html")
                .value_name("FILE")
                .help("Rendered HTML of the page")
                .required(true),
        )
        .arg(
            Arg::new("url")
                .short('u')
                .long("url")
                .value_name("URL")
                .help("Location the page was loaded from")
                .required(true),
        )
        .arg(
            Arg::new("request")
                .short('r')
                .long("request")
                .value_name("JSON")
                .help("Message to handle")
                .default_value(r#"{"action":"getVideos"}"#),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file (TOML)"),
        )
        .arg(
            Arg::new("watch-timeout")
                .long("watch-timeout")
                .value_name("MS")
                .help("Override the late-content watch window")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let html_path = PathBuf::from(matches.get_one::<String>("html").context("missing --html")?);
    let url = matches.get_one::<String>("url").context("missing --url")?;
    let request = matches.get_one::<String>("request").context("missing --request")?;
    let verbose = matches.get_flag("verbose");

    // Load configuration
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => LocatorConfig::load_from(path)?,
        None => LocatorConfig::load().unwrap_or_else(|e| {
            eprintln!("Failed to load config, using defaults: {:#}", e);
            LocatorConfig::default()
        }),
    };
    if let Some(timeout) = matches.get_one::<u64>("watch-timeout") {
        config.watcher.timeout_ms = *timeout;
    }

    // Initialize logging on stderr so stdout carries only the reply
    let filter = if verbose { "video_locator=debug,info" } else { config.logging.level.as_str() };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    config.validate()?;
    info!("🚀 Video Locator starting...");
    info!("{}", config.summary());

    let location = Url::parse(url).with_context(|| format!("Invalid page URL: {}", url))?;
    let html = tokio::fs::read_to_string(&html_path)
        .await
        .with_context(|| format!("Failed to read {}", html_path.display()))?;
    info!("📄 Loaded {} bytes of HTML for {}", html.len(), location);

    let page = Arc::new(Page::new(location, html));
    let locator = VideoLocator::install(page.clone(), Arc::new(config))
        .context("Locator already installed on page")?;
    let handler = MessageHandler::new(locator);

    let reply = handler.handle_json(request).await;
    println!("{}", reply);

    for command in page.drain_commands() {
        match serde_json::to_string(&command) {
            Ok(encoded) => println!("{}", encoded),
            Err(e) => warn!("Failed to encode page command: {}", e),
        }
    }

    Ok(())
}
