//! Centralized constants for the geocollect crate
//!
//! Values shared across modules live here so the datum math, the provider
//! clients and the acquisition strategies agree on them.

/// Datum conversion constants
pub mod datum {
    /// π to 20 digits, as used by the published GCJ02 reference formulas
    #[allow(clippy::excessive_precision, clippy::approx_constant)]
    pub const PI: f64 = 3.1415926535897932384626;

    /// Krasovsky 1940 ellipsoid semi-major axis in meters
    pub const SEMI_MAJOR_AXIS: f64 = 6378245.0;

    /// Krasovsky 1940 eccentricity squared
    #[allow(clippy::excessive_precision)]
    pub const ECCENTRICITY_SQ: f64 = 0.00669342162296594323;

    /// Longitude bounds of the GCJ02 correction region
    pub const MIN_LON: f64 = 72.004;
    pub const MAX_LON: f64 = 137.8347;

    /// Latitude bounds of the GCJ02 correction region
    pub const MIN_LAT: f64 = 0.8293;
    pub const MAX_LAT: f64 = 55.8271;

    /// Period factor of the BD09 perturbation (degrees scaled to radians by PI * 3000 / 180)
    pub const BD09_PERIOD: f64 = 3000.0;

    /// Fixed BD09 offsets applied after the perturbation
    pub const BD09_LON_OFFSET: f64 = 0.0065;
    pub const BD09_LAT_OFFSET: f64 = 0.006;
}

/// Positioning constants
pub mod position {
    /// Accuracy radius reported when the platform gives none
    pub const UNKNOWN_ACCURACY_METERS: f64 = 9999.0;

    /// Accuracy radius reported for IP-derived fixes (city level)
    pub const IP_ACCURACY_METERS: f64 = 5000.0;
}

/// External API endpoints
pub mod api {
    /// Amap (AutoNavi) web service base URL
    pub const AMAP_URL: &str = "https://restapi.amap.com";

    /// Baidu Maps web service base URL
    pub const BAIDU_URL: &str = "https://api.map.baidu.com";

    /// Tencent location service base URL
    pub const TENCENT_URL: &str = "https://apis.map.qq.com";

    /// IP geolocation API (free, no key required)
    pub const IP_API_URL: &str = "http://ip-api.com/json";
}

/// Cache settings
pub mod cache {
    /// IP location cache duration in seconds (1 hour)
    pub const IP_LOCATION_TTL_SECS: u64 = 3600;

    /// IP location cache file name
    pub const IP_LOCATION_CACHE_FILE: &str = "ip_location_cache.json";
}

/// Separator placed between a landmark name and the rest of an address
pub const ADDRESS_SEPARATOR: &str = "，";
