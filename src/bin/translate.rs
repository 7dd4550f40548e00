//! Resolve translation keys from the local namespace files.
//!
//! Usage:
//!   cargo run --bin translate -- <locale> <key> [<key>...]
//!   cargo run --bin translate -- fr footer.about.me footer.more.label
//!
//! The locale accepts canonical tags and the same aliases as `?lang=`
//! (`en`, `zh`, `original`, ...).
//!
//! Optional:
//! - LOCALES_DIR (defaults to locales)

use anyhow::{Context, Result};
use sora_site::config::Config;
use sora_site::i18n::{resolve_override, FsNamespaceSource, ServerTranslator};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sora_site=warn".parse()?),
        )
        .init();

    // Load environment from .env file
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (locale_arg, keys) = args
        .split_first()
        .context("Usage: translate <locale> <key> [<key>...]")?;
    if keys.is_empty() {
        anyhow::bail!("Usage: translate <locale> <key> [<key>...]");
    }

    let locale = resolve_override(locale_arg)
        .with_context(|| format!("Unknown locale: {}", locale_arg))?;

    let config = Config::from_env()?;
    info!("Reading namespaces from {}", config.locales_dir.display());
    let translator = ServerTranslator::new(Arc::new(FsNamespaceSource::new(config.locales_dir)));

    for key in keys {
        let translation = translator.translate(locale, key).await;
        if translation.is_found() {
            println!("{} = {}", key, translation);
        } else {
            println!("{} = {} (missing)", key, translation);
        }
    }

    Ok(())
}
