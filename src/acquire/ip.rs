//! IP-based positioning
//!
//! Uses ip-api.com for a coarse, city-level fix with file-based caching.
//! Good enough for `collect --here` on a machine without a GNSS receiver.

use super::{
    FixSubscription, PlatformError, PlatformErrorKind, PositionFix, PositionOptions, Positioning,
};
use crate::config::defaults::APP_DIR_NAME;
use crate::constants::api::IP_API_URL;
use crate::constants::cache::{IP_LOCATION_CACHE_FILE, IP_LOCATION_TTL_SECS};
use crate::constants::position::IP_ACCURACY_METERS;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// IP positioning with an on-disk cache
#[derive(Debug)]
pub struct IpPositioning {
    client: reqwest::Client,
    url: String,
    cache_path: Option<PathBuf>,
}

/// ip-api.com response
#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    lat: Option<f64>,
    lon: Option<f64>,
    message: Option<String>,
}

/// Cached coordinate with the unix time it was fetched
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedPosition {
    lat: f64,
    lon: f64,
    timestamp: i64,
}

impl IpPositioning {
    /// Create with the default cache path under the user cache dir
    pub fn new() -> Self {
        let cache_path = dirs::cache_dir().map(|p| p.join(APP_DIR_NAME).join(IP_LOCATION_CACHE_FILE));

        Self {
            client: reqwest::Client::new(),
            url: IP_API_URL.to_string(),
            cache_path,
        }
    }

    /// Create with a specific cache path
    pub fn with_cache_path(cache_path: PathBuf) -> Self {
        Self {
            cache_path: Some(cache_path),
            ..Self::new()
        }
    }

    /// Create without caching
    pub fn without_cache() -> Self {
        Self {
            cache_path: None,
            ..Self::new()
        }
    }

    /// Point the lookup at a different endpoint
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Look up the current position, preferring a fresh cache entry
    pub async fn locate(&self, timeout: Duration) -> Result<PositionFix, PlatformError> {
        if let Some((lat, lon)) = self.load_cache() {
            debug!("using cached IP position");
            return Ok(PositionFix::now(lat, lon, Some(IP_ACCURACY_METERS)));
        }

        let (lat, lon) = self.fetch(timeout).await?;
        self.save_cache(lat, lon);

        Ok(PositionFix::now(lat, lon, Some(IP_ACCURACY_METERS)))
    }

    async fn fetch(&self, timeout: Duration) -> Result<(f64, f64), PlatformError> {
        let unavailable = |msg: String| PlatformError::new(PlatformErrorKind::PositionUnavailable, msg);

        let response = self
            .client
            .get(&self.url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PlatformError::new(PlatformErrorKind::Timeout, e.to_string())
                } else {
                    unavailable(format!("IP location request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            return Err(unavailable(format!(
                "IP location API returned status: {}",
                response.status()
            )));
        }

        let data: IpApiResponse = response
            .json()
            .await
            .map_err(|e| unavailable(format!("Failed to parse IP location response: {}", e)))?;

        if data.status != "success" {
            return Err(unavailable(format!(
                "IP location lookup failed: {}",
                data.message.unwrap_or_default()
            )));
        }

        match (data.lat, data.lon) {
            (Some(lat), Some(lon)) => Ok((lat, lon)),
            _ => Err(unavailable("No coordinates in IP location response".to_string())),
        }
    }

    fn load_cache(&self) -> Option<(f64, f64)> {
        let cache_path = self.cache_path.as_ref()?;
        let content = fs::read_to_string(cache_path).ok()?;
        let cached: CachedPosition = serde_json::from_str(&content).ok()?;

        let age = Utc::now().timestamp() - cached.timestamp;
        if (0..IP_LOCATION_TTL_SECS as i64).contains(&age) {
            Some((cached.lat, cached.lon))
        } else {
            None
        }
    }

    fn save_cache(&self, lat: f64, lon: f64) {
        let Some(cache_path) = &self.cache_path else {
            return;
        };

        if let Some(parent) = cache_path.parent() {
            let _ = fs::create_dir_all(parent);
        }

        let cached = CachedPosition {
            lat,
            lon,
            timestamp: Utc::now().timestamp(),
        };

        if let Ok(content) = serde_json::to_string_pretty(&cached) {
            let _ = fs::write(cache_path, content);
        }
    }

    /// Remove the cache file
    pub fn clear_cache(&self) {
        if let Some(cache_path) = &self.cache_path {
            let _ = fs::remove_file(cache_path);
        }
    }

    pub fn cache_duration() -> Duration {
        Duration::from_secs(IP_LOCATION_TTL_SECS)
    }
}

impl Default for IpPositioning {
    fn default() -> Self {
        Self::new()
    }
}

impl Positioning for IpPositioning {
    async fn request_fix(&self, options: &PositionOptions) -> Result<PositionFix, PlatformError> {
        self.locate(options.timeout).await
    }

    fn subscribe_fixes(&self, options: &PositionOptions) -> FixSubscription {
        // One lookup is all an IP source can offer; the stream ends after it
        let client = self.client.clone();
        let url = self.url.clone();
        let cache_path = self.cache_path.clone();
        let timeout = options.timeout;

        let lookup = async move {
            let positioning = IpPositioning {
                client,
                url,
                cache_path,
            };
            positioning.locate(timeout).await
        };

        FixSubscription::new(futures::stream::once(lookup), || {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_url() {
        let positioning = IpPositioning::new();
        assert_eq!(positioning.url, IP_API_URL);
    }

    #[test]
    fn test_without_cache() {
        let positioning = IpPositioning::without_cache();
        assert!(positioning.cache_path.is_none());
        assert!(positioning.load_cache().is_none());
    }

    #[test]
    fn test_cache_round_trip_and_clear() {
        let temp_dir = TempDir::new().unwrap();
        let positioning = IpPositioning::with_cache_path(temp_dir.path().join("ip.json"));

        assert!(positioning.load_cache().is_none());

        positioning.save_cache(31.2304, 121.4737);
        assert_eq!(positioning.load_cache(), Some((31.2304, 121.4737)));

        positioning.clear_cache();
        assert!(positioning.load_cache().is_none());
    }

    #[test]
    fn test_expired_cache_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ip.json");
        let stale = CachedPosition {
            lat: 1.0,
            lon: 2.0,
            timestamp: Utc::now().timestamp() - IP_LOCATION_TTL_SECS as i64 - 1,
        };
        fs::write(&path, serde_json::to_string(&stale).unwrap()).unwrap();

        let positioning = IpPositioning::with_cache_path(path);
        assert!(positioning.load_cache().is_none());
    }

    #[tokio::test]
    async fn test_cached_fix_has_city_accuracy() {
        let temp_dir = TempDir::new().unwrap();
        let positioning = IpPositioning::with_cache_path(temp_dir.path().join("ip.json"))
            .with_url("http://127.0.0.1:9/unreachable");
        positioning.save_cache(22.5431, 114.0579);

        let fix = positioning
            .request_fix(&PositionOptions::default())
            .await
            .unwrap();

        assert_eq!(fix.coordinate().lat(), 22.5431);
        assert_eq!(fix.accuracy_m(), 5000.0);
    }

    #[test]
    fn test_cache_duration() {
        assert_eq!(IpPositioning::cache_duration().as_secs(), 3600);
    }
}
