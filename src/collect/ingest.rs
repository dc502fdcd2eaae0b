//! Turning an uploaded report into a stored record
//!
//! The HTTP surface back-fills secondaries a client did not send before
//! persisting. The in-process backend has already run the full resolution,
//! so it only persists.

use crate::datum::Coordinate;
use crate::error::Result;
use crate::record::{DeviceRecord, DeviceReport};
use crate::resolve::{HttpClient, ProviderId, Resolver};
use crate::store::RecordSink;
use chrono::Utc;
use tracing::{debug, error};

/// Fill secondary addresses the client did not send
///
/// Only done when the report carries an applicable GCJ02 position; failed
/// providers leave their slot empty.
pub async fn backfill_secondaries<H: HttpClient>(resolver: &Resolver<H>, report: &mut DeviceReport) {
    if report.baidu_address.is_some() && report.tencent_address.is_some() {
        return;
    }

    let Some((lat, lon)) = report.location.applicable_gcj02() else {
        return;
    };

    match resolver.resolve_secondaries(&Coordinate::gcj02(lat, lon)).await {
        Ok(mut secondaries) => {
            if report.baidu_address.is_none() {
                report.baidu_address = secondaries.remove(&ProviderId::Baidu).flatten();
            }
            if report.tencent_address.is_none() {
                report.tencent_address = secondaries.remove(&ProviderId::Tencent).flatten();
            }
        }
        Err(e) => debug!("skipping secondary back-fill: {}", e),
    }
}

/// Flatten and persist a report
///
/// # Arguments
/// * `sink` - Record destination
/// * `report` - Client upload
/// * `ip` - Client address, if known
pub fn ingest<S>(sink: &S, report: DeviceReport, ip: Option<String>) -> Result<DeviceRecord>
where
    S: RecordSink + ?Sized,
{
    let record = DeviceRecord::from_report(report, ip, Utc::now().timestamp_millis());

    if let Err(e) = sink.append(&record) {
        error!(ip = record.ip.as_deref().unwrap_or("-"), "failed to save record: {}", e);
        return Err(e);
    }

    Ok(record)
}
