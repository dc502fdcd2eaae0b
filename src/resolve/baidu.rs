//! Baidu Maps reverse geocoding
//!
//! Baidu only accepts BD09 input (`coordtype=bd09ll`) and signals success
//! with the numeric status `0`.

use super::{lenient, prepend_name, AddressResult, ProviderEndpoint};
use crate::datum::Coordinate;
use crate::error::{Error, Result};
use serde::Deserialize;
use serde_json::Value;

const PATH: &str = "/reverse_geocoding/v3";

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default, deserialize_with = "lenient::string")]
    status: String,
    #[serde(default, deserialize_with = "lenient::string")]
    message: String,
    result: Option<Body>,
}

#[derive(Debug, Deserialize)]
struct Body {
    #[serde(default, deserialize_with = "lenient::string")]
    formatted_address: String,
    #[serde(default, deserialize_with = "lenient::string")]
    sematic_description: String,
    #[serde(rename = "addressComponent", default)]
    component: Component,
    #[serde(default)]
    pois: Vec<Poi>,
}

#[derive(Debug, Default, Deserialize)]
struct Component {
    #[serde(default, deserialize_with = "lenient::string")]
    country: String,
    #[serde(default, deserialize_with = "lenient::string")]
    province: String,
    #[serde(default, deserialize_with = "lenient::string")]
    city: String,
    #[serde(default, deserialize_with = "lenient::string")]
    district: String,
    #[serde(default, deserialize_with = "lenient::string")]
    street: String,
    #[serde(default, deserialize_with = "lenient::string")]
    adcode: String,
    #[serde(default, deserialize_with = "lenient::string")]
    citycode: String,
    #[serde(default, deserialize_with = "lenient::string")]
    town: String,
    #[serde(default, deserialize_with = "lenient::string")]
    town_code: String,
    #[serde(default, deserialize_with = "lenient::string")]
    direction: String,
    #[serde(default, deserialize_with = "lenient::string")]
    distance: String,
}

#[derive(Debug, Deserialize)]
struct Poi {
    #[serde(default, deserialize_with = "lenient::string")]
    name: String,
}

pub(super) fn request_url(endpoint: &ProviderEndpoint, coordinate: &Coordinate) -> String {
    format!(
        "{}{}?ak={}&output=json&coordtype=bd09ll&location={},{}&radius=100&extensions_poi=1",
        endpoint.base_url.trim_end_matches('/'),
        PATH,
        urlencoding::encode(&endpoint.key),
        coordinate.lat(),
        coordinate.lon(),
    )
}

pub(super) fn parse(body: Value) -> Result<AddressResult> {
    let response: Response = serde_json::from_value(body)?;

    let result = match response.result {
        Some(result) if response.status == "0" => result,
        _ => {
            return Err(Error::ProviderUnavailable(format!(
                "baidu status {}: {}",
                response.status, response.message
            )))
        }
    };

    let base = if result.formatted_address.is_empty() {
        result.sematic_description.as_str()
    } else {
        result.formatted_address.as_str()
    };
    let poi = result.pois.first().map(|p| p.name.as_str()).unwrap_or_default();
    let address = prepend_name(poi, base);

    let c = result.component;
    let city = if c.city.is_empty() { c.province.clone() } else { c.city };

    Ok(AddressResult {
        formatted_address: address,
        country: c.country,
        province: c.province,
        city,
        district: c.district,
        street: c.street,
        admin_code: c.adcode,
        city_code: c.citycode,
        extras: [
            ("town".to_string(), c.town),
            ("town_code".to_string(), c.town_code),
            ("direction".to_string(), c.direction),
            ("distance".to_string(), c.distance),
        ]
        .into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_url_orders_lat_lon() {
        let endpoint = ProviderEndpoint::new("https://api.map.baidu.com", "ak", 10_000);
        let url = request_url(&endpoint, &Coordinate::bd09(39.916, 116.41));
        assert_eq!(
            url,
            "https://api.map.baidu.com/reverse_geocoding/v3?ak=ak&output=json&coordtype=bd09ll&location=39.916,116.41&radius=100&extensions_poi=1"
        );
    }

    #[test]
    fn test_poi_prepended_and_extras() {
        let body = json!({
            "status": 0,
            "result": {
                "formatted_address": "广东省深圳市福田区福华三路",
                "sematic_description": "会展中心附近",
                "addressComponent": {
                    "country": "中国",
                    "province": "广东省",
                    "city": "深圳市",
                    "district": "福田区",
                    "street": "福华三路",
                    "adcode": "440304",
                    "town": "福田街道",
                    "town_code": "440304010",
                    "direction": "东",
                    "distance": "45"
                },
                "pois": [{"name": "深圳会展中心"}]
            }
        });

        let result = parse(body).unwrap();
        assert_eq!(result.formatted_address, "深圳会展中心，广东省深圳市福田区福华三路");
        assert_eq!(result.city, "深圳市");
        assert_eq!(result.city_code, "");
        assert_eq!(result.extras["town_code"], "440304010");
        assert_eq!(result.extras["distance"], "45");
    }

    #[test]
    fn test_semantic_description_fallback_and_city() {
        let body = json!({
            "status": 0,
            "result": {
                "formatted_address": "",
                "sematic_description": "外滩附近",
                "addressComponent": {"province": "上海市", "city": ""},
                "pois": []
            }
        });

        let result = parse(body).unwrap();
        assert_eq!(result.formatted_address, "外滩附近");
        assert_eq!(result.city, "上海市");
    }

    #[test]
    fn test_error_status() {
        let err = parse(json!({"status": 240, "message": "APP 服务被禁用"})).unwrap_err();
        assert!(matches!(err, Error::ProviderUnavailable(_)));
    }
}
