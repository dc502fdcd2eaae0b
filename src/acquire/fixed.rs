//! Operator-supplied position

use super::{FixSubscription, PlatformError, PositionFix, PositionOptions, Positioning};
use futures::stream;

/// Positioning that always reports the same coordinate
///
/// Used by the CLI when the operator passes `--lat/--lon`.
#[derive(Debug, Clone, Copy)]
pub struct FixedPositioning {
    lat: f64,
    lon: f64,
    accuracy_m: Option<f64>,
}

impl FixedPositioning {
    pub fn new(lat: f64, lon: f64, accuracy_m: Option<f64>) -> Self {
        Self { lat, lon, accuracy_m }
    }

    fn fix(&self) -> PositionFix {
        PositionFix::now(self.lat, self.lon, self.accuracy_m)
    }
}

impl Positioning for FixedPositioning {
    async fn request_fix(&self, _options: &PositionOptions) -> Result<PositionFix, PlatformError> {
        Ok(self.fix())
    }

    fn subscribe_fixes(&self, _options: &PositionOptions) -> FixSubscription {
        FixSubscription::new(stream::once(futures::future::ready(Ok(self.fix()))), || {})
    }
}
