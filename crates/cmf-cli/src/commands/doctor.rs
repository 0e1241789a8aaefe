//! Diagnostic command: configuration and CMF server reachability.

use std::path::Path;

use cmf_core::{Config, BASE_URL_ENV_VARS};
use cmf_mcp::{dispatch, ServerContext, TargetResult};

pub async fn run(config_path: Option<&Path>) -> anyhow::Result<()> {
    println!("Running diagnostics...\n");

    let config_dir = Config::config_dir();
    println!("Config directory: {:?}", config_dir);
    if config_dir.join("config.toml").exists() {
        println!("  ✓ config.toml found");
    } else {
        println!("  - no config.toml (defaults and environment only)");
    }

    println!("\nEnvironment:");
    for var in BASE_URL_ENV_VARS {
        match std::env::var(var) {
            Ok(value) if !value.trim().is_empty() => println!("  ✓ {} = {}", var, value),
            _ => println!("  - {} is not set", var),
        }
    }

    let config = super::load_config(config_path)?;
    let context = ServerContext::from_config(&config)?;

    println!("\nCMF servers:");
    let results = dispatch(context.registry(), None, |client| async move {
        client.get_pipelines().await
    })
    .await;

    let mut unreachable = 0;
    for result in &results {
        match result {
            TargetResult::Success { cmf_client, data } => {
                let count = data.as_array().map(Vec::len).unwrap_or_default();
                println!("  ✓ {} ({} pipelines)", cmf_client, count);
            }
            TargetResult::Failure { cmf_client, error } => {
                unreachable += 1;
                println!("  ✗ {}: {}", cmf_client, error);
            }
        }
    }

    context.shutdown().await;

    if unreachable > 0 {
        anyhow::bail!("{} of {} CMF servers unreachable", unreachable, results.len());
    }
    println!("\nAll CMF servers reachable.");
    Ok(())
}
