//! geocollect: device position collection for Chinese map providers
//!
//! A library and CLI tool that acquires a device position, converts it
//! between the WGS84, GCJ02 and BD09 datums, resolves it to an address
//! through several reverse-geocoding providers and stores the result.
//!
//! ## Features
//!
//! - WGS84 to GCJ02 correction gated to the China region, GCJ02 to BD09
//! - Single-shot and accuracy-refining acquisition strategies
//! - Amap primary with Baidu and Tencent secondaries, queried concurrently
//! - Collection server (axum) and a JSON-lines record store
//!
//! ## Quick Start
//!
//! ```rust
//! use geocollect::datum::{gcj02_to_bd09, wgs84_to_gcj02};
//!
//! // Tiananmen, as reported by a GPS receiver
//! let gcj = wgs84_to_gcj02(39.9087, 116.3975);
//! assert!(gcj.applicable);
//!
//! let bd = gcj02_to_bd09(gcj.coordinate.lat(), gcj.coordinate.lon());
//! println!("GCJ02 {:?} BD09 {:?}", gcj.coordinate, bd);
//! ```

pub mod acquire;
pub mod cli;
pub mod collect;
pub mod config;
pub mod constants;
pub mod datum;
pub mod error;
pub mod record;
pub mod resolve;
pub mod server;
pub mod store;

// Re-export commonly used types
pub use acquire::{Acquirer, Environment, FailureKind, PositionFix};
pub use collect::Collector;
pub use config::Config;
pub use datum::{Coordinate, Datum};
pub use error::{Error, Result};
pub use resolve::{AddressResult, ResolutionOutcome, Resolver};
