//! Collect command handler
//!
//! Runs one collection session from the command line. The position comes
//! from `--lat/--lon` or from IP geolocation (`--here`); the address and
//! the record go either to a running server (`--server`) or straight to
//! the providers and the local record file.

use crate::acquire::fixed::FixedPositioning;
use crate::acquire::ip::IpPositioning;
use crate::acquire::{AcquireSettings, Acquirer, Environment, Positioning};
use crate::collect::remote::RemoteBackend;
use crate::collect::{Backend, CollectOutcome, Collector, LocalBackend, Phase};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::resolve::{ProviderSettings, ReqwestHttpClient, Resolver};
use crate::store::RecordStore;
use chrono::Utc;
use clap::Args;

/// Collect command arguments
#[derive(Args)]
pub struct CollectArgs {
    /// WGS84 latitude
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// WGS84 longitude
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lon: Option<f64>,

    /// Accuracy radius in meters for --lat/--lon
    #[arg(long)]
    pub accuracy: Option<f64>,

    /// Use current location (IP geolocation)
    #[arg(long, conflicts_with_all = ["lat", "lon"])]
    pub here: bool,

    /// Collection server base URL; records are written locally when absent
    #[arg(long)]
    pub server: Option<String>,

    /// Use the single-shot strategy of embedded browsers
    #[arg(long)]
    pub embedded: bool,

    /// User agent reported with the record
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Print the uploaded report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the collect command
pub async fn run(args: CollectArgs) -> Result<()> {
    let config = Config::load()?;

    match (args.lat, args.lon) {
        (Some(lat), Some(lon)) => {
            let positioning = FixedPositioning::new(lat, lon, args.accuracy);
            with_positioning(positioning, &args, &config).await
        }
        _ if args.here => with_positioning(IpPositioning::new(), &args, &config).await,
        _ => Err(Error::InvalidCoordinates(
            "Pass --lat and --lon, or --here".to_string(),
        )),
    }
}

async fn with_positioning<P: Positioning>(
    positioning: P,
    args: &CollectArgs,
    config: &Config,
) -> Result<()> {
    let environment = if args.embedded {
        Environment::Embedded
    } else {
        Environment::Standalone
    };
    let acquirer = Acquirer::new(
        positioning,
        environment,
        AcquireSettings::from(&config.acquisition),
    );

    match &args.server {
        Some(url) => drive(acquirer, RemoteBackend::new(url.as_str())?, args).await,
        None => {
            let resolver =
                Resolver::new(ReqwestHttpClient::new()?, ProviderSettings::from(config));
            let store = RecordStore::open(config.records_path()?);
            drive(acquirer, LocalBackend::new(resolver, store), args).await
        }
    }
}

async fn drive<P: Positioning, B: Backend>(
    acquirer: Acquirer<P>,
    backend: B,
    args: &CollectArgs,
) -> Result<()> {
    let user_agent = args
        .user_agent
        .clone()
        .unwrap_or_else(|| concat!("geocollect/", env!("CARGO_PKG_VERSION")).to_string());

    let mut collector = Collector::new(acquirer, backend, user_agent);
    if !args.json {
        collector = collector.with_observer(|phase: &Phase| println!("{}", phase));
    }

    // Running the command is the user interaction
    let result = collector.collect(Some(Utc::now())).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result.report)?);
    } else if let Some(address) = &result.report.address {
        println!();
        println!("Address: {}", address.formatted_address);
    }

    match result.outcome {
        CollectOutcome::Completed => Ok(()),
        CollectOutcome::LocationFailed { error, hint, saved } => {
            if let Some(hint) = hint {
                eprintln!("Hint: {}", hint);
            }
            if !saved {
                eprintln!("The error report could not be saved either");
            }
            Err(Error::Acquisition(error))
        }
        CollectOutcome::SaveFailed(msg) => {
            eprintln!("{}", msg);
            Err(Error::Storage("the report was not saved".to_string()))
        }
    }
}
