//! Integration tests for wes-exporter-core.
//!
//! A mock WES device is served by axum on an ephemeral port and polled
//! through the real HTTP client:
//! device → client → extractor → mapper → registry.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    routing::get,
};

use wes_exporter_core::{
    ClientConfig, Extractor, Mapper, Poller, PollerConfig, Registry, WesClient, schema,
};

const DATA: &str = include_str!("fixtures/data.xml");
const PCEVAL: &str = include_str!("fixtures/pceval.html");

/// `admin:wes`
const EXPECTED_AUTH: &str = "Basic YWRtaW46d2Vz";

struct Device {
    data: String,
    pceval: String,
    diagnostics_status: StatusCode,
}

type Shared = Arc<Mutex<Device>>;

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(EXPECTED_AUTH)
}

async fn data_cgx(State(device): State<Shared>, headers: HeaderMap) -> (StatusCode, String) {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, String::new());
    }
    (StatusCode::OK, device.lock().unwrap().data.clone())
}

async fn pceval_cgx(State(device): State<Shared>, headers: HeaderMap) -> (StatusCode, String) {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, String::new());
    }
    let device = device.lock().unwrap();
    (device.diagnostics_status, device.pceval.clone())
}

async fn spawn_device() -> (SocketAddr, Shared) {
    let device = Arc::new(Mutex::new(Device {
        data: DATA.to_string(),
        pceval: PCEVAL.to_string(),
        diagnostics_status: StatusCode::OK,
    }));
    let app = Router::new()
        .route("/DATA.CGX", get(data_cgx))
        .route("/WEBPROG/CGX/PCEVAL.CGX", get(pceval_cgx))
        .with_state(Arc::clone(&device));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, device)
}

fn poller_for(addr: SocketAddr, password: &str) -> Poller<WesClient> {
    let client = WesClient::new(ClientConfig {
        base_url: format!("http://{addr}"),
        password: password.to_string(),
        ..ClientConfig::default()
    })
    .unwrap();
    Poller::new(
        client,
        Extractor::default(),
        Mapper::default(),
        Arc::new(schema::registry().unwrap()),
        PollerConfig::default(),
    )
}

fn dump(registry: &Registry) -> Vec<(String, Vec<String>, String)> {
    registry
        .families()
        .into_iter()
        .flat_map(|f| {
            f.series
                .into_iter()
                .map(move |(labels, value)| (f.desc.name.to_string(), labels, format!("{value:?}")))
        })
        .collect()
}

#[tokio::test]
async fn full_cycle_against_mock_device() {
    let (addr, _device) = spawn_device().await;
    let poller = poller_for(addr, "wes");
    poller.poll_once().await.unwrap();

    let r = poller.registry();
    assert_eq!(r.value(schema::TIC_ISOUSC, &["2"]), Some(30.0));
    assert_eq!(r.value(schema::TIC_INDEX, &["1", "tempo", "red", "hp"]), Some(345001.0));
    assert_eq!(r.value(schema::IMPULSION_INDEX, &["1"]), Some(1520.0));
    assert_eq!(r.value(schema::PINCE_AMPS, &["3"]), Some(11.2));
    assert_eq!(r.value(schema::PINCE_COSPHI, &["1"]), Some(0.93));
    assert_eq!(r.value(schema::MAINS_VOLTAGE, &[]), Some(231.4));
    assert_eq!(r.state(schema::TIC_PTEC, &[]), Some("H. Pleine BLANC"));
    assert_eq!(r.value(schema::TIC_PTEC_NUM, &[]), Some(3.0));
    assert_eq!(r.state(schema::TIC_DEMAIN, &[]), Some("Jour ROUGE"));
}

#[tokio::test]
async fn wrong_credentials_are_a_transport_error() {
    let (addr, _device) = spawn_device().await;
    let poller = poller_for(addr, "not-the-password");
    let err = poller.run_cycle().await.unwrap_err();
    assert_eq!(err.kind(), "transport");
    assert!(err.to_string().contains("401"));
    assert_eq!(dump(poller.registry()), dump(&schema::registry().unwrap()));
}

#[tokio::test]
async fn failed_diagnostics_fetch_publishes_nothing_then_recovers() {
    let (addr, device) = spawn_device().await;
    let poller = poller_for(addr, "wes");

    device.lock().unwrap().diagnostics_status = StatusCode::INTERNAL_SERVER_ERROR;
    assert!(poller.run_cycle().await.is_err());
    assert_eq!(dump(poller.registry()), dump(&schema::registry().unwrap()));

    device.lock().unwrap().diagnostics_status = StatusCode::OK;
    poller.run_cycle().await.unwrap();
    assert_eq!(poller.registry().value(schema::PINCE_KWH, &["2"]), Some(96.1));

    let stats = poller.stats().snapshot();
    assert_eq!(stats.cycles, 2);
    assert_eq!(stats.failures, 1);
    assert_eq!(stats.consecutive_failures, 0);
}

#[tokio::test]
async fn absent_index_is_not_reset_by_later_cycles() {
    let (addr, device) = spawn_device().await;
    let poller = poller_for(addr, "wes");
    poller.poll_once().await.unwrap();

    let labels = ["2", "base", "none", "none"];
    assert_eq!(poller.registry().value(schema::TIC_INDEX, &labels), Some(1203345.0));

    device.lock().unwrap().data = DATA.replace("<BASE>1203345</BASE>", "");
    poller.poll_once().await.unwrap();
    assert_eq!(poller.registry().value(schema::TIC_INDEX, &labels), Some(1203345.0));
}

#[tokio::test]
async fn truncated_diagnostics_fail_the_cycle() {
    let (addr, device) = spawn_device().await;
    let poller = poller_for(addr, "wes");
    let cut = PCEVAL.find("<name>Pince 4</name>").unwrap();
    device.lock().unwrap().pceval = PCEVAL[..cut].to_string();

    let err = poller.poll_once().await.unwrap_err();
    assert_eq!(err.kind(), "extraction");
    assert_eq!(dump(poller.registry()), dump(&schema::registry().unwrap()));
}

#[tokio::test]
async fn replaying_identical_input_is_idempotent() {
    let (addr, _device) = spawn_device().await;
    let poller = poller_for(addr, "wes");
    poller.poll_once().await.unwrap();
    let first = dump(poller.registry());
    poller.poll_once().await.unwrap();
    assert_eq!(first, dump(poller.registry()));
}
