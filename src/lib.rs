pub mod config;
pub mod dispatcher;
pub mod logging;
pub mod providers;
pub mod registry;
pub mod terminal;
pub mod web;

use anyhow::{Context, Result, anyhow};
use reqwest::Client;
use std::env;
use std::io;
use std::time::Duration;
use tracing::info;

use config::Config;
use dispatcher::Dispatcher;
use registry::Registry;
use terminal::run_terminal;

pub async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = logging::init();

    let cfg = Config::from_env()?;
    let registry = Registry::builtin();
    info!(
        inference_base_url = %cfg.inference_base_url,
        hosted_base_url = %cfg.hosted_base_url,
        ollama_base_url = %cfg.ollama_base_url,
        model_timeout_secs = cfg.model_timeout_secs,
        models = registry.len(),
        "loaded runtime configuration"
    );

    let client = Client::builder()
        .timeout(Duration::from_secs(cfg.model_timeout_secs))
        .build()
        .context("Failed to initialize HTTP client")?;
    let dispatcher = Dispatcher::from_config(registry, &client, &cfg);

    let args: Vec<String> = env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        None => run_terminal(&dispatcher, io::stdin().lock(), io::stdout()).await,
        Some("serve") => web::serve(&cfg, dispatcher).await,
        Some(other) => Err(anyhow!(
            "Unknown command '{}'. Run without arguments for the terminal, or 'serve' for the web form.",
            other
        )),
    }
}
