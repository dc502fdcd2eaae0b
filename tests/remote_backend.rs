//! Integration tests for `RemoteBackend`, first against wiremock and then
//! against a real server whose providers are wiremock mocks.

use geocollect::acquire::fixed::FixedPositioning;
use geocollect::acquire::{AcquireSettings, Acquirer, Environment};
use geocollect::collect::remote::RemoteBackend;
use geocollect::collect::{Backend, CollectOutcome, Collector, Phase};
use geocollect::config::Config;
use geocollect::datum::Coordinate;
use geocollect::record::DeviceReport;
use geocollect::resolve::{ProviderEndpoint, ProviderId, ProviderSettings, ReqwestHttpClient, Resolver};
use geocollect::server::routes::create_router;
use geocollect::server::state::AppState;
use geocollect::store::RecordStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::TcpListener;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_backend(base_url: &str) -> RemoteBackend {
    RemoteBackend::new(base_url).expect("client construction should not fail")
}

#[tokio::test]
async fn resolve_address_reads_every_slot() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "ok": true,
        "address": {"address": "北京市东城区天安门", "city": "北京市", "adcode": "110101"},
        "baidu": null,
        "tencent": {"address": "北京市东城区东长安街", "street_number": "东长安街"}
    });
    Mock::given(method("GET"))
        .and(path("/api/address"))
        .and(query_param("coordType", "gcj02"))
        .and(query_param("includeSecondary", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let backend = test_backend(&server.uri());
    let outcome = backend
        .resolve_address(&Coordinate::gcj02(39.9101035, 116.4037436))
        .await
        .expect("should resolve");

    let primary = outcome.primary.expect("primary present");
    assert_eq!(primary.formatted_address, "北京市东城区天安门");
    assert_eq!(primary.admin_code, "110101");
    assert!(outcome.secondary.get(&ProviderId::Baidu).unwrap().is_none());

    let tencent = outcome.secondary.get(&ProviderId::Tencent).unwrap().as_ref().unwrap();
    assert_eq!(tencent.extras.get("street_number").map(String::as_str), Some("东长安街"));
}

#[tokio::test]
async fn address_not_found_is_mapped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/address"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ok": false,
            "code": "address_not_found",
            "msg": "no address"
        })))
        .mount(&server)
        .await;

    let err = test_backend(&server.uri())
        .resolve_address(&Coordinate::gcj02(39.91, 116.40))
        .await
        .unwrap_err();

    assert_eq!(err.code(), "address_not_found");
}

#[tokio::test]
async fn save_posts_report_and_maps_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/device-data"))
        .and(body_partial_json(serde_json::json!({"error": "denied"})))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "ok": false,
            "code": "save_failed",
            "msg": "disk full"
        })))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/device-data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .mount(&server)
        .await;

    let backend = test_backend(&server.uri());
    backend.save(&DeviceReport::default()).await.expect("plain report saves");

    let failing = DeviceReport {
        error: Some("denied".to_string()),
        ..Default::default()
    };
    let err = backend.save(&failing).await.unwrap_err();
    assert_eq!(err.code(), "save_failed");
}

#[tokio::test]
async fn non_json_response_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/device-data"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let err = test_backend(&server.uri())
        .save(&DeviceReport::default())
        .await
        .unwrap_err();

    assert_eq!(err.code(), "transport_error");
}

/// Serve the real router on an ephemeral port with providers at `providers_url`
async fn spawn_server(providers_url: &str, records: &TempDir) -> String {
    let settings = ProviderSettings {
        amap: ProviderEndpoint::new(providers_url, "amap-key", 2_000),
        baidu: ProviderEndpoint::new(providers_url, "baidu-key", 2_000),
        tencent: ProviderEndpoint::new(providers_url, "tencent-key", 2_000),
    };
    let resolver = Resolver::new(ReqwestHttpClient::new().unwrap(), settings);
    let store = RecordStore::open(records.path().join("records.jsonl"));
    let state = Arc::new(AppState::with_parts(Config::default(), resolver, Arc::new(store)));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_router(state).into_make_service_with_connect_info::<SocketAddr>();
    tokio::spawn(async move { axum::serve(listener, app).await });

    format!("http://{}", addr)
}

#[tokio::test]
async fn collector_round_trip_through_server() {
    let providers = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/geocode/regeo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "1",
            "regeocode": {
                "formatted_address": "上海市黄浦区南京东路街道人民大道",
                "addressComponent": {"province": "上海市", "city": [], "district": "黄浦区", "adcode": "310101"},
                "pois": [],
                "roads": [{"name": "人民大道"}]
            }
        })))
        .mount(&providers)
        .await;
    Mock::given(method("GET"))
        .and(path("/reverse_geocoding/v3"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&providers)
        .await;
    Mock::given(method("GET"))
        .and(path("/ws/geocoder/v1/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": 0,
            "result": {"address": "上海市黄浦区人民大道200号", "address_component": {"province": "上海市"}}
        })))
        .mount(&providers)
        .await;

    let records = TempDir::new().unwrap();
    let base_url = spawn_server(&providers.uri(), &records).await;

    let acquirer = Acquirer::new(
        FixedPositioning::new(31.2304, 121.4737, Some(10.0)),
        Environment::Standalone,
        AcquireSettings::default(),
    );
    let mut collector = Collector::new(acquirer, test_backend(&base_url), "Mozilla/5.0 (Linux; Android 14; Pixel 8)");

    let result = collector.collect(None).await;

    assert_eq!(result.outcome, CollectOutcome::Completed);
    assert!(result.phases.contains(&Phase::AddressResolved));

    let address = result.report.address.as_ref().expect("primary address");
    assert_eq!(address.formatted_address, "人民大道，上海市黄浦区南京东路街道人民大道");
    assert_eq!(address.city, "上海市");
    assert!(result.report.baidu_address.is_none());
    assert!(result.report.tencent_address.is_some());

    let stored = RecordStore::open(records.path().join("records.jsonl")).load().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].ip.as_deref(), Some("127.0.0.1"));
    assert_eq!(stored[0].adcode.as_deref(), Some("310101"));
    assert_eq!(stored[0].os_version.as_deref(), Some("14"));
    assert!(stored[0].gcj02_applicable);
}
