//! Amap (AutoNavi) reverse geocoding, the primary provider
//!
//! Amap works in GCJ02, orders the location as `lon,lat` and signals success
//! with the *string* status `"1"`. Empty fields come back as `[]`.

use super::{lenient, prepend_name, AddressResult, ProviderEndpoint};
use crate::datum::Coordinate;
use crate::error::{Error, Result};
use serde::Deserialize;
use serde_json::Value;

const PATH: &str = "/v3/geocode/regeo";

/// Road, shopping, residential POI categories
const POI_TYPES: &str = "120000|150000|160000";

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default, deserialize_with = "lenient::string")]
    status: String,
    #[serde(default, deserialize_with = "lenient::string")]
    info: String,
    regeocode: Option<Regeocode>,
}

#[derive(Debug, Deserialize)]
struct Regeocode {
    #[serde(default, deserialize_with = "lenient::string")]
    formatted_address: String,
    #[serde(rename = "addressComponent", default)]
    component: Component,
    #[serde(default)]
    roads: Vec<Named>,
    #[serde(default)]
    pois: Vec<Named>,
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
    #[serde(rename = "streetNumber", default)]
    street_number: StreetNumber,
    #[serde(default, deserialize_with = "lenient::string")]
    adcode: String,
    #[serde(default, deserialize_with = "lenient::string")]
    citycode: String,
    #[serde(default, deserialize_with = "lenient::string")]
    township: String,
    #[serde(default, deserialize_with = "lenient::name")]
    neighborhood: String,
    #[serde(default, deserialize_with = "lenient::name")]
    building: String,
}

#[derive(Debug, Default, Deserialize)]
struct StreetNumber {
    #[serde(default, deserialize_with = "lenient::string")]
    street: String,
}

#[derive(Debug, Deserialize)]
struct Named {
    #[serde(default, deserialize_with = "lenient::string")]
    name: String,
}

pub(super) fn request_url(endpoint: &ProviderEndpoint, coordinate: &Coordinate) -> String {
    format!(
        "{}{}?key={}&location={},{}&output=json&radius=100&extensions=all&roadlevel=1&poitype={}",
        endpoint.base_url.trim_end_matches('/'),
        PATH,
        urlencoding::encode(&endpoint.key),
        coordinate.lon(),
        coordinate.lat(),
        POI_TYPES,
    )
}

pub(super) fn parse(body: Value) -> Result<AddressResult> {
    let response: Response = serde_json::from_value(body)?;

    let regeocode = match response.regeocode {
        Some(regeocode) if response.status == "1" => regeocode,
        _ => {
            return Err(Error::ProviderUnavailable(format!(
                "amap status {}: {}",
                response.status, response.info
            )))
        }
    };

    let first_road = regeocode
        .roads
        .first()
        .map(|r| r.name.as_str())
        .unwrap_or_default();
    let first_poi = regeocode
        .pois
        .first()
        .map(|p| p.name.as_str())
        .unwrap_or_default();

    let address = prepend_name(first_poi, &prepend_name(first_road, &regeocode.formatted_address));

    let c = regeocode.component;
    let city = if c.city.is_empty() { c.province.clone() } else { c.city };
    let street = [c.street.as_str(), c.street_number.street.as_str(), first_road]
        .into_iter()
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string();

    Ok(AddressResult {
        formatted_address: address,
        country: c.country,
        province: c.province,
        city,
        district: c.district,
        street,
        admin_code: c.adcode,
        city_code: c.citycode,
        extras: [
            ("township".to_string(), c.township),
            ("neighborhood".to_string(), c.neighborhood),
            ("building".to_string(), c.building),
        ]
        .into(),
    })
}
