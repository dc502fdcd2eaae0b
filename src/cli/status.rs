//! Status command handler
//!
//! Shows where things live, which providers are usable and whether a
//! server is answering.

use crate::config::Config;
use crate::error::Result;
use crate::store::RecordStore;
use clap::Args;

/// Status command arguments
#[derive(Args)]
pub struct StatusArgs {
    /// Check if server is running (tries to connect)
    #[arg(long)]
    pub server: bool,
}

/// Run the status command
pub async fn run(args: StatusArgs) -> Result<()> {
    let config = Config::load()?;

    println!("geocollect v{}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("Config:  {}", Config::config_path()?.display());
    let store = RecordStore::open(config.records_path()?);
    println!("Records: {} ({} stored)", store.path().display(), store.len()?);
    println!();

    println!("Providers:");
    let providers = [
        ("amap (primary)", &config.providers.amap_url, &config.api_keys.amap),
        ("baidu", &config.providers.baidu_url, &config.api_keys.baidu),
        ("tencent", &config.providers.tencent_url, &config.api_keys.tencent),
    ];
    for (name, url, key) in providers {
        let state = if key.is_empty() { "NO KEY" } else { "ready" };
        println!("  {:<15} {:<8} {}", name, state, url);
    }
    println!();

    if args.server {
        check_server_status(&config).await;
    }

    Ok(())
}

/// Check if the server is running
async fn check_server_status(config: &Config) {
    let url = format!("http://{}/health", config.server_addr());

    match reqwest::get(&url).await {
        Ok(response) if response.status().is_success() => {
            println!("Server: RUNNING on {}", config.server_addr());
        }
        Ok(response) => {
            println!("Server: ERROR (status {})", response.status());
        }
        Err(_) => {
            println!("Server: NOT RUNNING on {}", config.server_addr());
        }
    }
}
