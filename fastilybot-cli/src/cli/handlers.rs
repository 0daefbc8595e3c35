//! CLI command handlers

use super::prompt::{prompt_password, prompt_with_default};
use anyhow::{Context, Result};
use fastilybot_core::cache::{self, Cache};
use fastilybot_core::models::Configuration;
use fastilybot_core::services::{self, CredentialStore};
use fastilybot_core::tasks::{Selection, TaskContext, TaskRunner};
use fastilybot_core::wiki::api::ClientOptions;
use fastilybot_core::wiki::ApiWiki;
use std::path::Path;
use std::sync::Arc;

/// Load and validate the configuration at `path`. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<Configuration> {
    let config = Configuration::load_from_file(path)
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    if let Err(errors) = config.validate() {
        anyhow::bail!(
            "Invalid configuration in {}:\n  - {}",
            path.display(),
            errors.join("\n  - ")
        );
    }
    Ok(config)
}

pub fn init_logging(config: &Configuration, color: bool) -> Result<()> {
    services::init_logging(config.log_level, color)
        .map_err(|e| anyhow::anyhow!("{}", e))
}

/// Handle `--purge-cache`
pub fn handle_purge_cache(config: &Configuration) -> Result<()> {
    cache::purge(&config.cache_dir).context("Failed to purge cache")?;
    println!("🗑️  Purged cache at {}", config.cache_dir.display());
    Ok(())
}

/// Handle `--wgen`: save a password to the credential store
pub fn handle_wgen(config: &Configuration, default_username: &str) -> Result<()> {
    let store_path = config
        .credentials_path()
        .map_err(|e| anyhow::anyhow!("Failed to get credential store path: {}", e))?;

    println!("🔐 fastilybot credential setup");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📄 Credential store: {}", store_path.display());

    let mut store = CredentialStore::load(&store_path)?;
    let known: Vec<&str> = store.usernames().collect();
    if !known.is_empty() {
        println!("👤 Saved accounts: {}", known.join(", "));
    }
    println!();

    let username = prompt_with_default("Username", default_username)?;
    let password = prompt_password("Password: ")?;
    if password.is_empty() {
        anyhow::bail!("Password cannot be empty");
    }

    store.set(&username, &password)?;
    store.save(&store_path)?;

    println!("✅ Saved password for '{}'", username);
    println!(
        "💡 The {} environment variable takes precedence over the store",
        services::credential_env_var(&username)
    );
    Ok(())
}

/// What to run, as given on the command line
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub username: String,
    pub selection: Selection,
}

/// Log in, run the selected tasks and fail if any of them failed
pub async fn handle_run(config: &Configuration, options: RunOptions) -> Result<()> {
    let store_path = config
        .credentials_path()
        .map_err(|e| anyhow::anyhow!("Failed to get credential store path: {}", e))?;
    let password = services::resolve_password(&options.username, &store_path)?;

    let client_options = ClientOptions::from(config);
    let wiki = ApiWiki::connect(
        &Configuration::api_endpoint(&config.domain),
        &client_options,
        Some((options.username.as_str(), password.as_str())),
    )
    .await
    .with_context(|| format!("Failed to log in to {}", config.domain))?;
    let commons = ApiWiki::connect(
        &Configuration::api_endpoint(&config.commons_domain),
        &client_options,
        None,
    )
    .await
    .with_context(|| format!("Failed to connect to {}", config.commons_domain))?;
    let cache = Cache::from_config(config)?;

    let ctx = TaskContext::new(Arc::new(wiki), Arc::new(commons), Arc::new(cache));
    let summary = TaskRunner::new(ctx).run(&options.selection).await;
    if summary.has_failures() {
        let failed: Vec<String> = summary
            .failed
            .iter()
            .map(|(kind, id)| format!("{} {}", kind, id))
            .collect();
        anyhow::bail!("{} task(s) failed: {}", failed.len(), failed.join(", "));
    }
    Ok(())
}
