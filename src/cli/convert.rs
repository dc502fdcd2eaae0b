//! Convert command handler

use crate::datum::{wgs84_to_gcj02, Coordinate};
use crate::error::Result;
use clap::Args;
use serde_json::json;

/// Convert command arguments
#[derive(Args)]
pub struct ConvertArgs {
    /// WGS84 latitude
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// WGS84 longitude
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

/// Run the convert command
pub fn run(args: ConvertArgs) -> Result<()> {
    let wgs = Coordinate::wgs84(args.lat, args.lon);
    wgs.validate()?;

    let gcj = wgs84_to_gcj02(args.lat, args.lon);
    let bd = wgs.to_bd09()?;

    if args.json {
        let output = json!({
            "wgs84": {"lat": wgs.lat(), "lon": wgs.lon()},
            "gcj02": {"lat": gcj.coordinate.lat(), "lon": gcj.coordinate.lon(), "applicable": gcj.applicable},
            "bd09": {"lat": bd.lat(), "lon": bd.lon()},
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("WGS84: {:.7}, {:.7}", wgs.lat(), wgs.lon());
    if gcj.applicable {
        println!("GCJ02: {:.7}, {:.7}", gcj.coordinate.lat(), gcj.coordinate.lon());
    } else {
        println!(
            "GCJ02: {:.7}, {:.7} (outside correction region, unchanged)",
            gcj.coordinate.lat(),
            gcj.coordinate.lon()
        );
    }
    println!("BD09:  {:.7}, {:.7}", bd.lat(), bd.lon());

    Ok(())
}
