//! Multi-provider reverse geocoding
//!
//! One primary provider (Amap) decides whether a resolution succeeds. Two
//! secondary providers (Baidu, Tencent) are queried alongside it; if they
//! fail, their slot in the outcome is simply empty.
//!
//! ## Flex Point
//! Each provider is a [`ProviderId`] variant backed by its own module with a
//! `request_url` and a `parse` function. Adding a provider means adding a
//! variant and a module; nothing else branches on provider identity.

pub mod amap;
pub mod baidu;
pub mod http;
pub mod lenient;
pub mod tencent;

#[cfg(test)]
pub(crate) mod testing;

use crate::config::Config;
use crate::constants::ADDRESS_SEPARATOR;
use crate::datum::{Coordinate, Datum};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

pub use http::{HttpClient, ReqwestHttpClient};

/// Reverse-geocoding providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Amap,
    Baidu,
    Tencent,
}

impl ProviderId {
    pub const PRIMARY: ProviderId = ProviderId::Amap;
    pub const SECONDARIES: [ProviderId; 2] = [ProviderId::Baidu, ProviderId::Tencent];

    /// Datum the provider expects its input in
    pub fn input_datum(&self) -> Datum {
        match self {
            Self::Amap | Self::Tencent => Datum::Gcj02,
            Self::Baidu => Datum::Bd09,
        }
    }

    pub fn is_primary(&self) -> bool {
        *self == Self::PRIMARY
    }

    fn request_url(&self, endpoint: &ProviderEndpoint, coordinate: &Coordinate) -> String {
        match self {
            Self::Amap => amap::request_url(endpoint, coordinate),
            Self::Baidu => baidu::request_url(endpoint, coordinate),
            Self::Tencent => tencent::request_url(endpoint, coordinate),
        }
    }

    fn parse(&self, body: Value) -> Result<AddressResult> {
        match self {
            Self::Amap => amap::parse(body),
            Self::Baidu => baidu::parse(body),
            Self::Tencent => tencent::parse(body),
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Amap => write!(f, "amap"),
            Self::Baidu => write!(f, "baidu"),
            Self::Tencent => write!(f, "tencent"),
        }
    }
}

/// A normalized address from one provider
///
/// Serializes to the flat shape the collection UI and the record store use:
/// `address`, the admin fields, `adcode`, `citycode`, then any
/// provider-specific extras inline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressResult {
    #[serde(rename = "address", default)]
    pub formatted_address: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub province: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub street: String,
    #[serde(rename = "adcode", default)]
    pub admin_code: String,
    #[serde(rename = "citycode", default)]
    pub city_code: String,
    #[serde(flatten)]
    pub extras: BTreeMap<String, String>,
}

/// Aggregate of one resolution
///
/// A successful [`Resolver::resolve`] always carries a primary result;
/// secondary slots are `None` when that provider failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionOutcome {
    pub primary: Option<AddressResult>,
    pub secondary: BTreeMap<ProviderId, Option<AddressResult>>,
}

impl ResolutionOutcome {
    pub fn secondary(&self, provider: ProviderId) -> Option<&AddressResult> {
        self.secondary.get(&provider).and_then(Option::as_ref)
    }
}

/// Prepend a landmark name to an address with the locale separator
///
/// Empty names leave the address untouched; an empty address yields just
/// the name.
pub fn prepend_name(name: &str, address: &str) -> String {
    match (name.is_empty(), address.is_empty()) {
        (true, _) => address.to_string(),
        (false, true) => name.to_string(),
        (false, false) => format!("{}{}{}", name, ADDRESS_SEPARATOR, address),
    }
}

/// Where and how to reach one provider
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderEndpoint {
    pub base_url: String,
    pub key: String,
    pub timeout: Duration,
}

impl ProviderEndpoint {
    pub fn new(base_url: impl Into<String>, key: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            base_url: base_url.into(),
            key: key.into(),
            timeout: Duration::from_millis(timeout_ms),
        }
    }
}

/// Endpoints for every provider
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSettings {
    pub amap: ProviderEndpoint,
    pub baidu: ProviderEndpoint,
    pub tencent: ProviderEndpoint,
}

impl ProviderSettings {
    pub fn endpoint(&self, provider: ProviderId) -> &ProviderEndpoint {
        match provider {
            ProviderId::Amap => &self.amap,
            ProviderId::Baidu => &self.baidu,
            ProviderId::Tencent => &self.tencent,
        }
    }
}

impl From<&Config> for ProviderSettings {
    fn from(config: &Config) -> Self {
        let p = &config.providers;
        let k = &config.api_keys;
        Self {
            amap: ProviderEndpoint::new(&p.amap_url, &k.amap, p.primary_timeout_ms),
            baidu: ProviderEndpoint::new(&p.baidu_url, &k.baidu, p.baidu_timeout_ms),
            tencent: ProviderEndpoint::new(&p.tencent_url, &k.tencent, p.tencent_timeout_ms),
        }
    }
}

/// Queries the providers concurrently and aggregates their answers
#[derive(Debug, Clone)]
pub struct Resolver<H> {
    client: H,
    providers: ProviderSettings,
}

impl<H: HttpClient> Resolver<H> {
    pub fn new(client: H, providers: ProviderSettings) -> Self {
        Self { client, providers }
    }

    pub fn client(&self) -> &H {
        &self.client
    }

    /// Resolve a coordinate with every provider
    ///
    /// # Errors
    /// `AddressNotFound` when the primary provider fails, whatever the
    /// secondaries return. `InvalidCoordinates` for BD09 input.
    pub async fn resolve(&self, coordinate: &Coordinate) -> Result<ResolutionOutcome> {
        let target = Self::prepare(coordinate)?;

        let (primary, baidu, tencent) = tokio::join!(
            self.query(ProviderId::Amap, &target),
            self.query(ProviderId::Baidu, &target),
            self.query(ProviderId::Tencent, &target),
        );

        let primary = primary.ok_or(Error::AddressNotFound {
            lat: coordinate.lat(),
            lon: coordinate.lon(),
        })?;

        Ok(ResolutionOutcome {
            primary: Some(primary),
            secondary: BTreeMap::from([(ProviderId::Baidu, baidu), (ProviderId::Tencent, tencent)]),
        })
    }

    /// Resolve with the primary provider only
    pub async fn resolve_primary(&self, coordinate: &Coordinate) -> Result<AddressResult> {
        let target = Self::prepare(coordinate)?;

        self.query(ProviderId::PRIMARY, &target)
            .await
            .ok_or(Error::AddressNotFound {
                lat: coordinate.lat(),
                lon: coordinate.lon(),
            })
    }

    /// Resolve with the secondary providers only
    ///
    /// Never fails for a valid coordinate; failed providers map to `None`.
    pub async fn resolve_secondaries(
        &self,
        coordinate: &Coordinate,
    ) -> Result<BTreeMap<ProviderId, Option<AddressResult>>> {
        let target = Self::prepare(coordinate)?;

        let (baidu, tencent) = tokio::join!(
            self.query(ProviderId::Baidu, &target),
            self.query(ProviderId::Tencent, &target),
        );

        Ok(BTreeMap::from([(ProviderId::Baidu, baidu), (ProviderId::Tencent, tencent)]))
    }

    /// Coordinate the GCJ02 providers are queried with
    ///
    /// WGS84 inside the correction region is converted. Outside it the raw
    /// point is used and keeps its WGS84 tag.
    fn prepare(coordinate: &Coordinate) -> Result<Coordinate> {
        coordinate.validate()?;
        match coordinate.datum() {
            Datum::Gcj02 => Ok(*coordinate),
            Datum::Wgs84 => Ok(coordinate.to_gcj02()?.coordinate),
            Datum::Bd09 => Err(Error::InvalidCoordinates(
                "bd09 input cannot be converted back to gcj02".to_string(),
            )),
        }
    }

    /// Query one provider, absorbing every failure into `None`
    async fn query(&self, provider: ProviderId, target: &Coordinate) -> Option<AddressResult> {
        match self.fetch(provider, target).await {
            Ok(address) => {
                debug!(%provider, "address resolved");
                Some(address)
            }
            Err(e) if provider.is_primary() => {
                warn!(%provider, lat = target.lat(), lon = target.lon(), "primary provider failed: {}", e);
                None
            }
            Err(e) => {
                debug!(%provider, "secondary provider failed: {}", e);
                None
            }
        }
    }

    async fn fetch(&self, provider: ProviderId, target: &Coordinate) -> Result<AddressResult> {
        let input = match provider.input_datum() {
            Datum::Bd09 => target.to_bd09()?,
            _ => *target,
        };

        let endpoint = self.providers.endpoint(provider);
        let url = provider.request_url(endpoint, &input);

        let body = tokio::time::timeout(endpoint.timeout, self.client.get_json(&url, endpoint.timeout))
            .await
            .map_err(|_| {
                Error::ProviderUnavailable(format!("{} timed out after {:?}", provider, endpoint.timeout))
            })??;

        provider.parse(body)
    }
}
