//! Datum transforms
//!
//! WGS84 to GCJ02 uses the published polynomial + trigonometric
//! approximation of the official offset on the Krasovsky 1940 ellipsoid.
//! GCJ02 to BD09 applies Baidu's radius/angle perturbation.
//! Neither transform has an inverse here.

use super::{Coordinate, Gcj02Conversion};
use crate::constants::datum::{
    BD09_LAT_OFFSET, BD09_LON_OFFSET, BD09_PERIOD, ECCENTRICITY_SQ, MAX_LAT, MAX_LON, MIN_LAT,
    MIN_LON, PI, SEMI_MAJOR_AXIS,
};

/// Check whether a point falls outside the GCJ02 correction region
pub fn out_of_china(lat: f64, lon: f64) -> bool {
    !(MIN_LON..=MAX_LON).contains(&lon) || !(MIN_LAT..=MAX_LAT).contains(&lat)
}

fn transform_lat(x: f64, y: f64) -> f64 {
    let mut ret = -100.0 + 2.0 * x + 3.0 * y + 0.2 * y * y + 0.1 * x * y + 0.2 * x.abs().sqrt();
    ret += (20.0 * (6.0 * x * PI).sin() + 20.0 * (2.0 * x * PI).sin()) * 2.0 / 3.0;
    ret += (20.0 * (y * PI).sin() + 40.0 * (y / 3.0 * PI).sin()) * 2.0 / 3.0;
    ret += (160.0 * (y / 12.0 * PI).sin() + 320.0 * (y * PI / 30.0).sin()) * 2.0 / 3.0;
    ret
}

fn transform_lon(x: f64, y: f64) -> f64 {
    let mut ret = 300.0 + x + 2.0 * y + 0.1 * x * x + 0.1 * x * y + 0.1 * x.abs().sqrt();
    ret += (20.0 * (6.0 * x * PI).sin() + 20.0 * (2.0 * x * PI).sin()) * 2.0 / 3.0;
    ret += (20.0 * (x * PI).sin() + 40.0 * (x / 3.0 * PI).sin()) * 2.0 / 3.0;
    ret += (150.0 * (x / 12.0 * PI).sin() + 300.0 * (x / 30.0 * PI).sin()) * 2.0 / 3.0;
    ret
}

/// Convert a WGS84 point to GCJ02
///
/// # Returns
/// The corrected point tagged GCJ02 with `applicable = true`, or the input
/// tagged WGS84 with `applicable = false` when the point lies outside the
/// correction region.
pub fn wgs84_to_gcj02(lat: f64, lon: f64) -> Gcj02Conversion {
    if out_of_china(lat, lon) {
        return Gcj02Conversion {
            coordinate: Coordinate::wgs84(lat, lon),
            applicable: false,
        };
    }

    let mut d_lat = transform_lat(lon - 105.0, lat - 35.0);
    let mut d_lon = transform_lon(lon - 105.0, lat - 35.0);

    let rad_lat = lat / 180.0 * PI;
    let mut magic = rad_lat.sin();
    magic = 1.0 - ECCENTRICITY_SQ * magic * magic;
    let sqrt_magic = magic.sqrt();

    d_lat = (d_lat * 180.0) / ((SEMI_MAJOR_AXIS * (1.0 - ECCENTRICITY_SQ)) / (magic * sqrt_magic) * PI);
    d_lon = (d_lon * 180.0) / (SEMI_MAJOR_AXIS / sqrt_magic * rad_lat.cos() * PI);

    Gcj02Conversion {
        coordinate: Coordinate::gcj02(lat + d_lat, lon + d_lon),
        applicable: true,
    }
}

/// Convert a GCJ02 point to BD09
///
/// Defined for every input.
pub fn gcj02_to_bd09(lat: f64, lon: f64) -> Coordinate {
    let x = lon;
    let y = lat;
    let period = std::f64::consts::PI * BD09_PERIOD / 180.0;

    let z = (x * x + y * y).sqrt() + 0.00002 * (y * period).sin();
    let theta = y.atan2(x) + 0.000003 * (x * period).cos();

    Coordinate::bd09(
        z * theta.sin() + BD09_LAT_OFFSET,
        z * theta.cos() + BD09_LON_OFFSET,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datum::Datum;
    use approx::assert_abs_diff_eq;

    const EPS: f64 = 0.00001;

    #[test]
    fn test_beijing_reference() {
        let gcj = wgs84_to_gcj02(39.9087, 116.3975);
        assert!(gcj.applicable);
        assert_abs_diff_eq!(gcj.coordinate.lat(), 39.9101035, epsilon = EPS);
        assert_abs_diff_eq!(gcj.coordinate.lon(), 116.4037436, epsilon = EPS);

        let bd = gcj02_to_bd09(gcj.coordinate.lat(), gcj.coordinate.lon());
        assert_abs_diff_eq!(bd.lat(), 39.9164427, epsilon = EPS);
        assert_abs_diff_eq!(bd.lon(), 116.4101166, epsilon = EPS);
    }

    #[test]
    fn test_shanghai_and_shenzhen_reference() {
        let sh = wgs84_to_gcj02(31.2304, 121.4737).coordinate;
        assert_abs_diff_eq!(sh.lat(), 31.2284577, epsilon = EPS);
        assert_abs_diff_eq!(sh.lon(), 121.4782231, epsilon = EPS);

        let sz = wgs84_to_gcj02(22.5431, 114.0579).coordinate;
        assert_abs_diff_eq!(sz.lat(), 22.5403828, epsilon = EPS);
        assert_abs_diff_eq!(sz.lon(), 114.0630140, epsilon = EPS);

        let sz_bd = gcj02_to_bd09(sz.lat(), sz.lon());
        assert_abs_diff_eq!(sz_bd.lat(), 22.5460416, epsilon = EPS);
        assert_abs_diff_eq!(sz_bd.lon(), 114.0695640, epsilon = EPS);
    }

    #[test]
    fn test_outside_region_is_unchanged() {
        let samples = [
            (48.8566, 2.3522),    // Paris
            (40.7128, -74.0060),  // New York
            (-33.8688, 151.2093), // Sydney
            (0.5, 100.0),         // south of the box
            (56.0, 100.0),        // north of the box
            (30.0, 72.0),         // west of the box
            (30.0, 138.0),        // east of the box
        ];

        for (lat, lon) in samples {
            let result = wgs84_to_gcj02(lat, lon);
            assert!(!result.applicable, "({}, {}) should be outside", lat, lon);
            assert_eq!(result.coordinate.lat(), lat);
            assert_eq!(result.coordinate.lon(), lon);
            assert_eq!(result.coordinate.datum(), Datum::Wgs84);
        }
    }

    #[test]
    fn test_box_edges_are_inside() {
        assert!(!out_of_china(MIN_LAT, MIN_LON));
        assert!(!out_of_china(MAX_LAT, MAX_LON));
        assert!(out_of_china(MIN_LAT - 0.0001, MIN_LON));
        assert!(out_of_china(MAX_LAT, MAX_LON + 0.0001));
    }

    #[test]
    fn test_offset_magnitude_is_small() {
        // The GCJ02 shift is a few hundred meters, never degrees
        for lat in [10.0, 25.0, 40.0, 50.0] {
            for lon in [80.0, 100.0, 120.0, 135.0] {
                let gcj = wgs84_to_gcj02(lat, lon).coordinate;
                assert!((gcj.lat() - lat).abs() < 0.01);
                assert!((gcj.lon() - lon).abs() < 0.01);
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let a = wgs84_to_gcj02(34.2658, 108.9541);
        let b = wgs84_to_gcj02(34.2658, 108.9541);
        assert_eq!(a, b);
    }

    #[test]
    fn test_bd09_defined_everywhere() {
        let samples = [
            (0.0, 0.0),
            (90.0, 180.0),
            (-90.0, -180.0),
            (48.8566, 2.3522),
            (-33.8688, 151.2093),
        ];
        for (lat, lon) in samples {
            let bd = gcj02_to_bd09(lat, lon);
            assert_eq!(bd.datum(), Datum::Bd09);
            assert!(bd.lat().is_finite());
            assert!(bd.lon().is_finite());
        }
    }
}
