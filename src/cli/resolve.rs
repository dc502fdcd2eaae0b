//! Resolve command handler
//!
//! Reverse-geocodes a coordinate without going through a server.

use crate::config::Config;
use crate::datum::{Coordinate, Datum};
use crate::error::Result;
use crate::resolve::{AddressResult, ProviderId, ProviderSettings, ReqwestHttpClient, Resolver};
use clap::Args;

/// Resolve command arguments
#[derive(Args)]
pub struct ResolveArgs {
    /// Latitude
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    /// Datum the coordinate is expressed in (wgs84 or gcj02)
    #[arg(long, default_value = "gcj02")]
    pub datum: Datum,

    /// Skip the secondary providers
    #[arg(long)]
    pub primary_only: bool,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

/// Run the resolve command
pub async fn run(args: ResolveArgs) -> Result<()> {
    let config = Config::load()?;
    let resolver = Resolver::new(ReqwestHttpClient::new()?, ProviderSettings::from(&config));
    let coordinate = Coordinate::new(args.datum, args.lat, args.lon);

    if args.primary_only {
        let address = resolver.resolve_primary(&coordinate).await?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&address)?);
        } else {
            print_address(ProviderId::PRIMARY, Some(&address));
        }
        return Ok(());
    }

    let outcome = resolver.resolve(&coordinate).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    print_address(ProviderId::PRIMARY, outcome.primary.as_ref());
    for provider in ProviderId::SECONDARIES {
        println!();
        print_address(provider, outcome.secondary(provider));
    }

    Ok(())
}

fn print_address(provider: ProviderId, address: Option<&AddressResult>) {
    let Some(address) = address else {
        println!("{}: (no answer)", provider);
        return;
    };

    println!("{}: {}", provider, address.formatted_address);
    let admin = [
        &address.province,
        &address.city,
        &address.district,
        &address.street,
    ];
    let admin: Vec<&str> = admin
        .iter()
        .map(|s| s.as_str())
        .filter(|s| !s.is_empty())
        .collect();
    if !admin.is_empty() {
        println!("  {}", admin.join(" / "));
    }
    if !address.admin_code.is_empty() {
        println!("  adcode: {}", address.admin_code);
    }
    for (key, value) in address.extras.iter().filter(|(_, v)| !v.is_empty()) {
        println!("  {}: {}", key, value);
    }
}
