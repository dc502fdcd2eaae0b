//! Collected device records
//!
//! [`DeviceReport`] is what a collecting client uploads; [`DeviceRecord`] is
//! the flat shape handed to persistence. Location fields stay `None` when
//! acquisition failed, and address fields stay `None` when resolution did.

use crate::datum::Gcj02Conversion;
use crate::acquire::PositionFix;
use crate::resolve::AddressResult;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use uuid::Uuid;

static MODEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(iPhone|iPad|iPod|SM-|MI|Redmi|HUAWEI|HONOR|Pixel|OnePlus)[^;)]*")
        .expect("valid model regex")
});
static ANDROID_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Android\s([\d.]+)").expect("valid android regex"));
static IOS_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)OS\s([\d_]+)").expect("valid ios regex"));

/// Screen metrics reported by the client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenInfo {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub dpr: Option<f64>,
}

/// Network information reported by the client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub effective_type: Option<String>,
}

/// Device metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    #[serde(default)]
    pub os: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub os_version: Option<String>,
    #[serde(default)]
    pub screen: ScreenInfo,
    #[serde(default)]
    pub network: NetworkInfo,
}

impl DeviceInfo {
    /// Derive OS family, OS version and model from a user agent
    pub fn from_user_agent(ua: &str) -> Self {
        let lower = ua.to_lowercase();
        let os = if lower.contains("android") {
            Some("Android".to_string())
        } else if ["iphone", "ipad", "ipod"].iter().any(|d| lower.contains(d)) {
            Some("iOS".to_string())
        } else {
            None
        };

        let model = MODEL_RE.find(ua).map(|m| m.as_str().trim().to_string());

        let os_version = ANDROID_VERSION_RE
            .captures(ua)
            .map(|c| c[1].to_string())
            .or_else(|| IOS_VERSION_RE.captures(ua).map(|c| c[1].replace('_', ".")));

        Self {
            os,
            model,
            os_version,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Wgs84Report {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub accuracy: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Gcj02Report {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    #[serde(default)]
    pub applicable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationReport {
    #[serde(default)]
    pub wgs84: Wgs84Report,
    #[serde(default)]
    pub gcj02: Gcj02Report,
}

impl LocationReport {
    pub fn from_fix(fix: &PositionFix, gcj: &Gcj02Conversion) -> Self {
        Self {
            wgs84: Wgs84Report {
                lat: Some(fix.coordinate().lat()),
                lon: Some(fix.coordinate().lon()),
                accuracy: Some(fix.accuracy_m()),
            },
            gcj02: Gcj02Report {
                lat: Some(gcj.coordinate.lat()),
                lon: Some(gcj.coordinate.lon()),
                applicable: gcj.applicable,
            },
        }
    }

    /// GCJ02 position when the correction applied
    pub fn applicable_gcj02(&self) -> Option<(f64, f64)> {
        match (self.gcj02.applicable, self.gcj02.lat, self.gcj02.lon) {
            (true, Some(lat), Some(lon)) if lat != 0.0 && lon != 0.0 => Some((lat, lon)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrowserReport {
    #[serde(default)]
    pub ua: String,
}

/// Upload sent by a collecting client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceReport {
    /// Capture time in unix milliseconds
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub location: LocationReport,
    #[serde(default)]
    pub device: DeviceInfo,
    #[serde(default)]
    pub browser: BrowserReport,
    #[serde(default)]
    pub address: Option<AddressResult>,
    #[serde(default)]
    pub baidu_address: Option<AddressResult>,
    #[serde(default)]
    pub tencent_address: Option<AddressResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Flat record handed to persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub id: Uuid,
    pub timestamp: i64,
    pub ip: Option<String>,

    pub wgs84_lat: Option<f64>,
    pub wgs84_lon: Option<f64>,
    pub wgs84_accuracy: Option<f64>,
    pub gcj02_lat: Option<f64>,
    pub gcj02_lon: Option<f64>,
    pub gcj02_applicable: bool,

    pub address: Option<String>,
    pub country: Option<String>,
    pub province: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub street: Option<String>,
    pub adcode: Option<String>,
    pub citycode: Option<String>,

    pub baidu_address: Option<String>,
    pub baidu_country: Option<String>,
    pub baidu_province: Option<String>,
    pub baidu_city: Option<String>,
    pub baidu_district: Option<String>,
    pub baidu_street: Option<String>,
    pub baidu_adcode: Option<String>,
    pub baidu_citycode: Option<String>,

    pub tencent_address: Option<String>,
    pub tencent_country: Option<String>,
    pub tencent_province: Option<String>,
    pub tencent_city: Option<String>,
    pub tencent_district: Option<String>,
    pub tencent_street: Option<String>,
    pub tencent_street_number: Option<String>,
    pub tencent_adcode: Option<String>,
    pub tencent_town: Option<String>,
    pub tencent_landmark_l1: Option<String>,
    pub tencent_landmark_l2: Option<String>,

    pub device_model: Option<String>,
    pub os_version: Option<String>,
    pub screen_w: Option<u32>,
    pub screen_h: Option<u32>,
    pub dpr: Option<f64>,
    pub network_type: Option<String>,
    pub effective_type: Option<String>,
    pub ua: Option<String>,
    pub error: Option<String>,
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn extra(address: &AddressResult, key: &str) -> Option<String> {
    address.extras.get(key).and_then(|v| non_empty(v))
}

impl DeviceRecord {
    /// Flatten a client report
    ///
    /// # Arguments
    /// * `report` - Client upload
    /// * `ip` - Client address as seen by the receiver
    /// * `received_at_ms` - Used when the report carries no timestamp
    pub fn from_report(report: DeviceReport, ip: Option<String>, received_at_ms: i64) -> Self {
        let address = report.address.unwrap_or_default();
        let baidu = report.baidu_address.unwrap_or_default();
        let tencent = report.tencent_address.unwrap_or_default();
        let wgs = report.location.wgs84;
        let gcj = report.location.gcj02;
        let device = report.device;

        Self {
            id: Uuid::new_v4(),
            timestamp: report.timestamp.filter(|t| *t > 0).unwrap_or(received_at_ms),
            ip,
            wgs84_lat: wgs.lat,
            wgs84_lon: wgs.lon,
            wgs84_accuracy: wgs.accuracy,
            gcj02_lat: gcj.lat,
            gcj02_lon: gcj.lon,
            gcj02_applicable: gcj.applicable,
            address: non_empty(&address.formatted_address),
            country: non_empty(&address.country),
            province: non_empty(&address.province),
            city: non_empty(&address.city),
            district: non_empty(&address.district),
            street: non_empty(&address.street),
            adcode: non_empty(&address.admin_code),
            citycode: non_empty(&address.city_code),
            baidu_address: non_empty(&baidu.formatted_address),
            baidu_country: non_empty(&baidu.country),
            baidu_province: non_empty(&baidu.province),
            baidu_city: non_empty(&baidu.city),
            baidu_district: non_empty(&baidu.district),
            baidu_street: non_empty(&baidu.street),
            baidu_adcode: non_empty(&baidu.admin_code),
            baidu_citycode: non_empty(&baidu.city_code),
            tencent_address: non_empty(&tencent.formatted_address),
            tencent_country: non_empty(&tencent.country),
            tencent_province: non_empty(&tencent.province),
            tencent_city: non_empty(&tencent.city),
            tencent_district: non_empty(&tencent.district),
            tencent_street: non_empty(&tencent.street),
            tencent_street_number: extra(&tencent, "street_number"),
            tencent_adcode: non_empty(&tencent.admin_code),
            tencent_town: extra(&tencent, "town"),
            tencent_landmark_l1: extra(&tencent, "landmark_l1"),
            tencent_landmark_l2: extra(&tencent, "landmark_l2"),
            device_model: device.model,
            os_version: device.os_version,
            screen_w: device.screen.width,
            screen_h: device.screen.height,
            dpr: device.screen.dpr,
            network_type: device.network.kind,
            effective_type: device.network.effective_type,
            ua: non_empty(&report.browser.ua),
            error: report.error,
        }
    }

    pub fn has_location(&self) -> bool {
        self.wgs84_lat.is_some() && self.wgs84_lon.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ANDROID_UA: &str = "Mozilla/5.0 (Linux; Android 13; SM-S9180 Build/TP1A.220624.014; wv) AppleWebKit/537.36 MicroMessenger/8.0.42";
    const IPHONE_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_1_2 like Mac OS X) AppleWebKit/605.1.15 Mobile/15E148";

    #[test]
    fn test_android_device_info() {
        let info = DeviceInfo::from_user_agent(ANDROID_UA);
        assert_eq!(info.os.as_deref(), Some("Android"));
        assert_eq!(info.os_version.as_deref(), Some("13"));
        assert_eq!(info.model.as_deref(), Some("SM-S9180 Build/TP1A.220624.014"));
    }

    #[test]
    fn test_iphone_device_info() {
        let info = DeviceInfo::from_user_agent(IPHONE_UA);
        assert_eq!(info.os.as_deref(), Some("iOS"));
        assert_eq!(info.os_version.as_deref(), Some("17.1.2"));
        assert_eq!(info.model.as_deref(), Some("iPhone"));
    }

    #[test]
    fn test_unknown_device_info() {
        let info = DeviceInfo::from_user_agent("curl/8.4.0");
        assert!(info.os.is_none());
        assert!(info.model.is_none());
        assert!(info.os_version.is_none());
    }

    #[test]
    fn test_report_wire_shape() {
        let report: DeviceReport = serde_json::from_value(json!({
            "timestamp": 1700000000000i64,
            "location": {
                "wgs84": {"lat": 39.9087, "lon": 116.3975, "accuracy": 15.0},
                "gcj02": {"lat": 39.9101, "lon": 116.4037, "applicable": true}
            },
            "device": {
                "model": "iPhone",
                "osVersion": "17.1",
                "screen": {"width": 390, "height": 844, "dpr": 3.0},
                "network": {"type": "wifi", "effectiveType": "4g"}
            },
            "browser": {"ua": IPHONE_UA},
            "address": {"address": "天安门", "province": "北京市", "adcode": "110101"}
        }))
        .unwrap();

        let record = DeviceRecord::from_report(report, Some("10.0.0.1".into()), 5);

        assert_eq!(record.timestamp, 1700000000000);
        assert_eq!(record.wgs84_accuracy, Some(15.0));
        assert!(record.gcj02_applicable);
        assert_eq!(record.address.as_deref(), Some("天安门"));
        assert_eq!(record.adcode.as_deref(), Some("110101"));
        assert_eq!(record.city, None);
        assert_eq!(record.os_version.as_deref(), Some("17.1"));
        assert_eq!(record.screen_w, Some(390));
        assert_eq!(record.network_type.as_deref(), Some("wifi"));
        assert_eq!(record.effective_type.as_deref(), Some("4g"));
        assert!(record.has_location());
    }

    #[test]
    fn test_failed_location_record_is_null_filled() {
        let report = DeviceReport {
            error: Some("permission_denied: denied".into()),
            ..Default::default()
        };

        let record = DeviceRecord::from_report(report, None, 1234);

        assert_eq!(record.timestamp, 1234);
        assert!(!record.has_location());
        assert!(record.gcj02_lat.is_none());
        assert!(!record.gcj02_applicable);
        assert!(record.address.is_none());
        assert!(record.ua.is_none());
        assert_eq!(record.error.as_deref(), Some("permission_denied: denied"));

        let value = serde_json::to_value(&record).unwrap();
        assert!(value["wgs84_lat"].is_null());
        assert!(value["baidu_address"].is_null());
    }

    #[test]
    fn test_secondary_addresses_are_flattened() {
        let mut tencent = AddressResult {
            formatted_address: "北京市朝阳区三里屯路19号".into(),
            city: "北京市".into(),
            admin_code: "110105".into(),
            ..Default::default()
        };
        tencent.extras.insert("town".into(), "三里屯街道".into());
        tencent.extras.insert("landmark_l2".into(), String::new());

        let report = DeviceReport {
            baidu_address: Some(AddressResult {
                formatted_address: "北京市朝阳区".into(),
                city_code: "131".into(),
                ..Default::default()
            }),
            tencent_address: Some(tencent),
            ..Default::default()
        };

        let record = DeviceRecord::from_report(report, None, 1);

        assert_eq!(record.baidu_address.as_deref(), Some("北京市朝阳区"));
        assert_eq!(record.baidu_citycode.as_deref(), Some("131"));
        assert!(record.baidu_province.is_none());
        assert_eq!(record.tencent_adcode.as_deref(), Some("110105"));
        assert_eq!(record.tencent_town.as_deref(), Some("三里屯街道"));
        assert!(record.tencent_landmark_l2.is_none());

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["tencent_city"], "北京市");
        assert!(value["tencent_street_number"].is_null());
        assert!(value.as_object().unwrap().values().all(|v| !v.is_object()));
    }

    #[test]
    fn test_applicable_gcj02() {
        let mut location = LocationReport::default();
        assert!(location.applicable_gcj02().is_none());

        location.gcj02 = Gcj02Report {
            lat: Some(39.91),
            lon: Some(116.40),
            applicable: false,
        };
        assert!(location.applicable_gcj02().is_none());

        location.gcj02.applicable = true;
        assert_eq!(location.applicable_gcj02(), Some((39.91, 116.40)));
    }
}
