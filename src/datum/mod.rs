//! Geodetic datums used by Chinese map providers
//!
//! This module handles:
//! - Tagging coordinates with the datum they are expressed in
//! - WGS84 to GCJ02 ("Mars" datum) correction, gated to the China region
//! - GCJ02 to BD09 offset used by Baidu Maps

pub mod transform;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

pub use transform::{gcj02_to_bd09, out_of_china, wgs84_to_gcj02};

/// A coordinate reference datum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Datum {
    /// Global satellite positioning datum
    Wgs84,
    /// Obfuscated datum mandated for maps shown in mainland China
    Gcj02,
    /// Baidu's further-offset datum, derived from GCJ02
    Bd09,
}

impl std::fmt::Display for Datum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Wgs84 => write!(f, "wgs84"),
            Self::Gcj02 => write!(f, "gcj02"),
            Self::Bd09 => write!(f, "bd09"),
        }
    }
}

impl std::str::FromStr for Datum {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "wgs84" | "wgs-84" => Ok(Self::Wgs84),
            "gcj02" | "gcj-02" => Ok(Self::Gcj02),
            "bd09" | "bd-09" | "bd09ll" => Ok(Self::Bd09),
            _ => Err(format!("Unknown datum: {}", s)),
        }
    }
}

/// A latitude/longitude pair tagged with its datum
///
/// Fields are private so the tag can only change through a transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    datum: Datum,
    lat: f64,
    lon: f64,
}

/// Result of a WGS84 to GCJ02 conversion
///
/// When `applicable` is false the point lies outside the correction region
/// and `coordinate` is the untouched WGS84 input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gcj02Conversion {
    pub coordinate: Coordinate,
    pub applicable: bool,
}

impl Coordinate {
    pub(crate) fn new(datum: Datum, lat: f64, lon: f64) -> Self {
        Self { datum, lat, lon }
    }

    pub fn wgs84(lat: f64, lon: f64) -> Self {
        Self::new(Datum::Wgs84, lat, lon)
    }

    pub fn gcj02(lat: f64, lon: f64) -> Self {
        Self::new(Datum::Gcj02, lat, lon)
    }

    pub fn bd09(lat: f64, lon: f64) -> Self {
        Self::new(Datum::Bd09, lat, lon)
    }

    pub fn datum(&self) -> Datum {
        self.datum
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    /// Validate that the coordinate is finite and within valid ranges
    ///
    /// Latitude: -90 to 90
    /// Longitude: -180 to 180
    pub fn validate(&self) -> Result<()> {
        if !self.lat.is_finite() || self.lat < -90.0 || self.lat > 90.0 {
            return Err(Error::InvalidCoordinates(format!(
                "Latitude {} is out of range [-90, 90]",
                self.lat
            )));
        }
        if !self.lon.is_finite() || self.lon < -180.0 || self.lon > 180.0 {
            return Err(Error::InvalidCoordinates(format!(
                "Longitude {} is out of range [-180, 180]",
                self.lon
            )));
        }
        Ok(())
    }

    /// Convert a WGS84 coordinate to GCJ02
    pub fn to_gcj02(&self) -> Result<Gcj02Conversion> {
        match self.datum {
            Datum::Wgs84 => Ok(wgs84_to_gcj02(self.lat, self.lon)),
            other => Err(Error::InvalidCoordinates(format!(
                "No {} to gcj02 transform is defined",
                other
            ))),
        }
    }

    /// Convert to BD09
    ///
    /// WGS84 input goes through GCJ02 first. Outside the GCJ02 region the
    /// raw coordinate stands in for GCJ02, matching what map clients do.
    pub fn to_bd09(&self) -> Result<Coordinate> {
        match self.datum {
            Datum::Gcj02 => Ok(gcj02_to_bd09(self.lat, self.lon)),
            Datum::Wgs84 => {
                let gcj = self.to_gcj02()?.coordinate;
                Ok(gcj02_to_bd09(gcj.lat, gcj.lon))
            }
            Datum::Bd09 => Err(Error::InvalidCoordinates(
                "Coordinate is already bd09".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_datum_parse() {
        assert_eq!("GCJ02".parse::<Datum>().unwrap(), Datum::Gcj02);
        assert_eq!("bd09ll".parse::<Datum>().unwrap(), Datum::Bd09);
        assert_eq!("wgs-84".parse::<Datum>().unwrap(), Datum::Wgs84);
        assert!("mercator".parse::<Datum>().is_err());
    }

    #[test]
    fn test_datum_serde() {
        let json = serde_json::to_string(&Datum::Gcj02).unwrap();
        assert_eq!(json, "\"gcj02\"");
    }

    #[test]
    fn test_validate() {
        assert!(Coordinate::wgs84(39.9, 116.4).validate().is_ok());
        assert!(Coordinate::wgs84(91.0, 116.4).validate().is_err());
        assert!(Coordinate::wgs84(39.9, -181.0).validate().is_err());
        assert!(Coordinate::wgs84(f64::NAN, 0.0).validate().is_err());
    }

    #[test]
    fn test_to_gcj02_tags_result() {
        let conversion = Coordinate::wgs84(39.9087, 116.3975).to_gcj02().unwrap();
        assert!(conversion.applicable);
        assert_eq!(conversion.coordinate.datum(), Datum::Gcj02);
    }

    #[test]
    fn test_to_gcj02_rejects_other_datums() {
        assert!(Coordinate::gcj02(39.9, 116.4).to_gcj02().is_err());
        assert!(Coordinate::bd09(39.9, 116.4).to_gcj02().is_err());
    }

    #[test]
    fn test_to_bd09_from_wgs84_goes_through_gcj02() {
        let direct = Coordinate::wgs84(39.9087, 116.3975).to_bd09().unwrap();
        let gcj = Coordinate::wgs84(39.9087, 116.3975).to_gcj02().unwrap().coordinate;
        let staged = gcj.to_bd09().unwrap();

        assert_eq!(direct.datum(), Datum::Bd09);
        assert_abs_diff_eq!(direct.lat(), staged.lat(), epsilon = 1e-12);
        assert_abs_diff_eq!(direct.lon(), staged.lon(), epsilon = 1e-12);
    }

    #[test]
    fn test_to_bd09_rejects_bd09() {
        assert!(Coordinate::bd09(39.9, 116.4).to_bd09().is_err());
    }

    #[test]
    fn test_to_gcj02_outside_region_keeps_wgs84_tag() {
        let paris = Coordinate::wgs84(48.8566, 2.3522).to_gcj02().unwrap();
        assert!(!paris.applicable);
        assert_eq!(paris.coordinate.datum(), Datum::Wgs84);
        assert_eq!(paris.coordinate.lat(), 48.8566);
        assert_eq!(paris.coordinate.lon(), 2.3522);
    }
}
