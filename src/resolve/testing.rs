//! Canned provider responses for unit tests

use super::{HttpClient, ProviderId};
use crate::error::{Error, Result};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Answers every provider with a fixed successful body unless told to fail
#[derive(Debug, Default)]
pub struct CannedClient {
    failing: Vec<ProviderId>,
    calls: AtomicUsize,
}

impl CannedClient {
    pub fn failing(providers: &[ProviderId]) -> Self {
        Self {
            failing: providers.to_vec(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn provider_of(url: &str) -> ProviderId {
        if url.contains("/v3/geocode/regeo") {
            ProviderId::Amap
        } else if url.contains("/reverse_geocoding/") {
            ProviderId::Baidu
        } else {
            ProviderId::Tencent
        }
    }
}

impl HttpClient for CannedClient {
    async fn get_json(&self, url: &str, _timeout: Duration) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let provider = Self::provider_of(url);
        if self.failing.contains(&provider) {
            return Err(Error::Transport("connection refused".into()));
        }

        Ok(match provider {
            ProviderId::Amap => json!({
                "status": "1",
                "regeocode": {
                    "formatted_address": "北京市东城区东华门街道天安门",
                    "addressComponent": {
                        "country": "中国",
                        "province": "北京市",
                        "city": [],
                        "district": "东城区",
                        "adcode": "110101",
                        "citycode": "010"
                    },
                    "pois": [{"name": "天安门广场"}]
                }
            }),
            ProviderId::Baidu => json!({
                "status": 0,
                "result": {
                    "formatted_address": "北京市东城区中华路甲10号",
                    "addressComponent": {"province": "北京市", "city": "北京市", "adcode": "110101"}
                }
            }),
            ProviderId::Tencent => json!({
                "status": 0,
                "result": {
                    "address": "北京市东城区东长安街",
                    "address_component": {"nation": "中国", "province": "北京市", "city": "北京市", "adcode": 110101}
                }
            }),
        })
    }
}
