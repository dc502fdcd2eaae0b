//! Backend that talks to a running collection server over HTTP

use super::Backend;
use crate::datum::Coordinate;
use crate::error::{Error, Result};
use crate::record::DeviceReport;
use crate::resolve::{AddressResult, ProviderId, ResolutionOutcome};
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Request timeout for calls to the collection server
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Common envelope of every API response
#[derive(Debug, Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    address: Option<AddressResult>,
    #[serde(default)]
    baidu: Option<AddressResult>,
    #[serde(default)]
    tencent: Option<AddressResult>,
}

impl Envelope {
    fn failure(self, coordinate: Option<&Coordinate>) -> Error {
        let msg = self.msg.unwrap_or_default();
        match (self.code.as_deref(), coordinate) {
            (Some("address_not_found"), Some(c)) => Error::AddressNotFound {
                lat: c.lat(),
                lon: c.lon(),
            },
            (Some("invalid_params"), _) => Error::InvalidCoordinates(msg),
            (Some("save_failed"), _) => Error::Storage(msg),
            (code, _) => Error::Transport(format!(
                "server answered {}: {}",
                code.unwrap_or("without a code"),
                msg
            )),
        }
    }
}

/// Collection server client
#[derive(Debug, Clone)]
pub struct RemoteBackend {
    client: Client,
    base_url: String,
}

impl RemoteBackend {
    /// Create a client for the server at `base_url` (e.g. `http://127.0.0.1:3000`)
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("geocollect/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn envelope(response: reqwest::Response) -> Result<Envelope> {
        let status = response.status();
        response
            .json::<Envelope>()
            .await
            .map_err(|e| Error::Transport(format!("unreadable response ({}): {}", status, e)))
    }
}

impl Backend for RemoteBackend {
    async fn resolve_address(&self, coordinate: &Coordinate) -> Result<ResolutionOutcome> {
        let url = format!("{}/api/address", self.base_url);
        debug!(%url, lat = coordinate.lat(), lon = coordinate.lon(), "requesting address");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", coordinate.lat().to_string()),
                ("lon", coordinate.lon().to_string()),
                ("coordType", coordinate.datum().to_string()),
                ("includeSecondary", "true".to_string()),
            ])
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let envelope = Self::envelope(response).await?;
        if !envelope.ok {
            return Err(envelope.failure(Some(coordinate)));
        }

        let primary = envelope.address.ok_or(Error::AddressNotFound {
            lat: coordinate.lat(),
            lon: coordinate.lon(),
        })?;

        Ok(ResolutionOutcome {
            primary: Some(primary),
            secondary: BTreeMap::from([
                (ProviderId::Baidu, envelope.baidu),
                (ProviderId::Tencent, envelope.tencent),
            ]),
        })
    }

    async fn save(&self, report: &DeviceReport) -> Result<()> {
        let url = format!("{}/api/device-data", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(report)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let envelope = Self::envelope(response).await?;
        if envelope.ok {
            Ok(())
        } else {
            Err(envelope.failure(None))
        }
    }
}
