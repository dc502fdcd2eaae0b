//! Records command handler
//!
//! Lists the most recent stored device records.

use crate::config::Config;
use crate::error::Result;
use crate::record::DeviceRecord;
use crate::store::RecordStore;
use chrono::{DateTime, Local};
use clap::Args;

/// Records command arguments
#[derive(Args)]
pub struct RecordsArgs {
    /// Number of records to show
    #[arg(short = 'n', long, default_value = "10")]
    pub limit: usize,

    /// Print JSON lines instead of text
    #[arg(long)]
    pub json: bool,
}

/// Run the records command
pub fn run(args: RecordsArgs) -> Result<()> {
    let config = Config::load()?;
    let store = RecordStore::open(config.records_path()?);
    let records = store.recent(args.limit)?;

    if args.json {
        for record in &records {
            println!("{}", serde_json::to_string(record)?);
        }
        return Ok(());
    }

    if records.is_empty() {
        println!("No records.");
        return Ok(());
    }

    println!("Recent records ({} of {}):\n", records.len(), store.len()?);
    for record in &records {
        print_record(record);
    }

    Ok(())
}

fn print_record(record: &DeviceRecord) {
    let when = DateTime::from_timestamp_millis(record.timestamp)
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| record.timestamp.to_string());

    println!(
        "{}  {}  {}",
        when,
        record.ip.as_deref().unwrap_or("-"),
        record.device_model.as_deref().unwrap_or("unknown device")
    );

    match (record.wgs84_lat, record.wgs84_lon) {
        (Some(lat), Some(lon)) => {
            let accuracy = record
                .wgs84_accuracy
                .map(|a| format!(" ±{:.0}m", a))
                .unwrap_or_default();
            println!("  position: {:.6}, {:.6}{}", lat, lon, accuracy);
        }
        _ => println!(
            "  position: none ({})",
            record.error.as_deref().unwrap_or("no error recorded")
        ),
    }

    if let Some(address) = &record.address {
        println!("  address:  {}", address);
    }
    println!("  id:       {}", record.id);
    println!();
}
