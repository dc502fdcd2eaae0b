//! Tencent location service reverse geocoding
//!
//! Works in GCJ02 like Amap but reports success with the numeric status `0`
//! and may send the admin code as a number. It has no city code.

use super::{lenient, prepend_name, AddressResult, ProviderEndpoint};
use crate::datum::Coordinate;
use crate::error::{Error, Result};
use serde::Deserialize;
use serde_json::Value;

const PATH: &str = "/ws/geocoder/v1/";

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
    address: String,
    #[serde(default, deserialize_with = "lenient::string")]
    recommend: String,
    #[serde(default)]
    formatted_addresses: FormattedAddresses,
    #[serde(default)]
    address_component: Component,
    #[serde(default)]
    ad_info: AdInfo,
    #[serde(default, deserialize_with = "lenient::title")]
    landmark_l1: String,
    #[serde(default, deserialize_with = "lenient::title")]
    landmark_l2: String,
    #[serde(default)]
    pois: Vec<Poi>,
}

#[derive(Debug, Default, Deserialize)]
struct FormattedAddresses {
    #[serde(default, deserialize_with = "lenient::string")]
    recommend: String,
    #[serde(default, deserialize_with = "lenient::string")]
    standard_address: String,
}

#[derive(Debug, Default, Deserialize)]
struct Component {
    #[serde(default, deserialize_with = "lenient::string")]
    nation: String,
    #[serde(default, deserialize_with = "lenient::string")]
    province: String,
    #[serde(default, deserialize_with = "lenient::string")]
    city: String,
    #[serde(default, deserialize_with = "lenient::string")]
    district: String,
    #[serde(default, deserialize_with = "lenient::string")]
    street: String,
    #[serde(default, deserialize_with = "lenient::string")]
    street_number: String,
    #[serde(default, deserialize_with = "lenient::string")]
    adcode: String,
    #[serde(default, deserialize_with = "lenient::title")]
    town: String,
}

#[derive(Debug, Default, Deserialize)]
struct AdInfo {
    #[serde(default, deserialize_with = "lenient::string")]
    adcode: String,
}

#[derive(Debug, Deserialize)]
struct Poi {
    #[serde(default, deserialize_with = "lenient::string")]
    title: String,
}

pub(super) fn request_url(endpoint: &ProviderEndpoint, coordinate: &Coordinate) -> String {
    format!(
        "{}{}?location={},{}&key={}&get_poi=1&output=json",
        endpoint.base_url.trim_end_matches('/'),
        PATH,
        coordinate.lat(),
        coordinate.lon(),
        urlencoding::encode(&endpoint.key),
    )
}

fn first_non_empty(candidates: [String; 3]) -> String {
    candidates
        .into_iter()
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

pub(super) fn parse(body: Value) -> Result<AddressResult> {
    let response: Response = serde_json::from_value(body)?;

    let result = match response.result {
        Some(result) if response.status == "0" => result,
        _ => {
            return Err(Error::ProviderUnavailable(format!(
                "tencent status {}: {}",
                response.status, response.message
            )))
        }
    };

    // The POI-based standard address beats the recommended one
    let base = if result.formatted_addresses.standard_address.is_empty() {
        first_non_empty([
            result.recommend,
            result.formatted_addresses.recommend,
            result.address,
        ])
    } else {
        result.formatted_addresses.standard_address
    };
    let poi = result.pois.first().map(|p| p.title.as_str()).unwrap_or_default();
    let address = prepend_name(poi, &base);

    let c = result.address_component;
    let city = if c.city.is_empty() { c.province.clone() } else { c.city };
    let admin_code = if c.adcode.is_empty() { result.ad_info.adcode } else { c.adcode };

    Ok(AddressResult {
        formatted_address: address,
        country: c.nation,
        province: c.province,
        city,
        district: c.district,
        street: c.street,
        admin_code,
        city_code: String::new(),
        extras: [
            ("street_number".to_string(), c.street_number),
            ("town".to_string(), c.town),
            ("landmark_l1".to_string(), result.landmark_l1),
            ("landmark_l2".to_string(), result.landmark_l2),
        ]
        .into(),
    })
}
