mod common;

use chrono::{TimeZone, Utc};
use common::{memory_store, status_value, test_device, LicenseFixture, DEVICE_ID, DEVICE_NAME, LICENSE_ID};
use lcp_engine::{
    LcpConfig, LcpError, LcpStore, LicenseStatusClient, NetworkError, RenewError,
    ReqwestHttpClient, ReturnError,
};
use lcp_license::{Status, StatusDocument};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(store: Arc<LcpStore>) -> LicenseStatusClient {
    let http = ReqwestHttpClient::new(&LcpConfig::default()).unwrap();
    LicenseStatusClient::new(Arc::new(http), store, test_device(), Duration::from_secs(5))
}

fn status(base: &str, value: &str) -> StatusDocument {
    StatusDocument::parse(status_value(base, value).to_string().as_bytes()).unwrap()
}

fn store_with_license() -> Arc<LcpStore> {
    let store = memory_store();
    store.ensure_rights(LICENSE_ID, None, None).unwrap();
    store
}

// ── fetch_status ────────────────────────────────────────────────

#[tokio::test]
async fn fetch_status_persists_server_bytes() {
    let server = MockServer::start().await;
    let body = serde_json::to_vec(&status_value(&server.uri(), "active")).unwrap();
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_with_license();
    let license = LicenseFixture::with_status(&server.uri()).document();
    let status = client(store.clone())
        .fetch_status(&license, None)
        .await
        .unwrap();

    assert_eq!(status.status, Status::Active);
    assert_eq!(store.load_status(LICENSE_ID).unwrap(), Some(body));
}

#[tokio::test]
async fn unparseable_status_is_malformed_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "paused" })))
        .mount(&server)
        .await;

    let store = store_with_license();
    let license = LicenseFixture::with_status(&server.uri()).document();
    let err = client(store.clone())
        .fetch_status(&license, None)
        .await
        .unwrap_err();

    assert!(matches!(err, LcpError::Network(NetworkError::MalformedResponse(_))));
    assert_eq!(store.load_status(LICENSE_ID).unwrap(), None);
}

#[tokio::test]
async fn license_without_status_link_has_no_interaction() {
    let store = store_with_license();
    let err = client(store)
        .fetch_status(&LicenseFixture::default().document(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, LcpError::InteractionNotAvailable));
}

// ── register ────────────────────────────────────────────────────

#[tokio::test]
async fn register_sends_device_and_marks_registered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/register"))
        .and(query_param("id", DEVICE_ID))
        .and(query_param("name", DEVICE_NAME))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_value(&server.uri(), "active")))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_with_license();
    let ready = status(&server.uri(), "ready");
    let registered = client(store.clone())
        .register(LICENSE_ID, &ready, None)
        .await
        .unwrap();

    assert_eq!(registered.status, Status::Active);
    assert!(store.is_registered(LICENSE_ID).unwrap());
}

#[tokio::test]
async fn conflict_counts_as_registered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/register"))
        .respond_with(ResponseTemplate::new(409).set_body_string("conflict"))
        .mount(&server)
        .await;

    let store = store_with_license();
    let active = status(&server.uri(), "active");
    let kept = client(store.clone())
        .register(LICENSE_ID, &active, None)
        .await
        .unwrap();

    assert_eq!(kept, active);
    assert!(store.is_registered(LICENSE_ID).unwrap());
}

#[tokio::test]
async fn register_failure_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let store = store_with_license();
    let err = client(store.clone())
        .register(LICENSE_ID, &status(&server.uri(), "ready"), None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        LcpError::Network(NetworkError::Server { status: 500, .. })
    ));
    assert!(!store.is_registered(LICENSE_ID).unwrap());
}

#[tokio::test]
async fn register_honors_per_call_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/register"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(status_value(&server.uri(), "active"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let store = store_with_license();
    let err = client(store.clone())
        .register(
            LICENSE_ID,
            &status(&server.uri(), "ready"),
            Some(Duration::from_millis(200)),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, LcpError::Network(NetworkError::Timeout)));
    assert!(!store.is_registered(LICENSE_ID).unwrap());
}

// ── renew ───────────────────────────────────────────────────────

#[tokio::test]
async fn renew_sends_end_date() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/renew"))
        .and(query_param("end", "2030-06-01T00:00:00Z"))
        .and(query_param("id", DEVICE_ID))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_value(&server.uri(), "active")))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_with_license();
    let end = Utc.with_ymd_and_hms(2030, 6, 1, 0, 0, 0).unwrap();
    let renewed = client(store.clone())
        .renew(LICENSE_ID, &status(&server.uri(), "active"), Some(end))
        .await
        .unwrap();

    assert_eq!(renewed.status, Status::Active);
    assert!(store.load_status(LICENSE_ID).unwrap().is_some());
}

#[tokio::test]
async fn renew_rejections_map_to_renew_errors() {
    let server = MockServer::start().await;
    let current = status(&server.uri(), "active");
    let client = client(store_with_license());

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(403))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    let err = client.renew(LICENSE_ID, &current, None).await.unwrap_err();
    assert!(matches!(
        err,
        LcpError::Renew(RenewError::InvalidRenewalPeriod { max_renew_date: Some(_) })
    ));

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(400))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    let err = client.renew(LICENSE_ID, &current, None).await.unwrap_err();
    assert!(matches!(err, LcpError::Renew(RenewError::Failed)));

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    let err = client.renew(LICENSE_ID, &current, None).await.unwrap_err();
    assert!(matches!(err, LcpError::Renew(RenewError::UnexpectedServerError(502))));
}

#[tokio::test]
async fn html_only_renew_needs_the_browser() {
    let mut value = status_value("https://lsd.example", "active");
    value["links"] = json!([
        { "rel": "renew", "href": "https://lsd.example/renew-page", "type": "text/html" }
    ]);
    let current = StatusDocument::parse(value.to_string().as_bytes()).unwrap();

    let err = client(store_with_license())
        .renew(LICENSE_ID, &current, None)
        .await
        .unwrap_err();
    match err {
        LcpError::WebInteractionRequired { url } => {
            assert_eq!(url, "https://lsd.example/renew-page");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

// ── return ──────────────────────────────────────────────────────

#[tokio::test]
async fn return_publication_rejections() {
    let server = MockServer::start().await;
    let current = status(&server.uri(), "active");
    let client = client(store_with_license());

    Mock::given(method("PUT"))
        .and(path("/return"))
        .respond_with(ResponseTemplate::new(403))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    let err = client.return_publication(LICENSE_ID, &current).await.unwrap_err();
    assert!(matches!(err, LcpError::Return(ReturnError::AlreadyReturnedOrExpired)));

    Mock::given(method("PUT"))
        .and(path("/return"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;
    let err = client.return_publication(LICENSE_ID, &current).await.unwrap_err();
    assert!(matches!(err, LcpError::Return(ReturnError::Failed)));
}

// ── license refresh ─────────────────────────────────────────────

#[tokio::test]
async fn newer_license_is_fetched() {
    let server = MockServer::start().await;
    let newer = LicenseFixture {
        updated: Some("2024-04-01T00:00:00Z".into()),
        ..LicenseFixture::with_status(&server.uri())
    };
    let newer_bytes = newer.bytes();
    Mock::given(method("GET"))
        .and(path("/license"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(newer_bytes.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let mut value = status_value(&server.uri(), "active");
    value["updated"]["license"] = json!("2024-04-01T00:00:00Z");
    let current = StatusDocument::parse(value.to_string().as_bytes()).unwrap();
    let license = LicenseFixture::with_status(&server.uri()).document();

    let updated = client(store_with_license())
        .fetch_updated_license(&license, &current, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.raw_bytes(), newer_bytes.as_slice());
}

#[tokio::test]
async fn up_to_date_license_is_not_fetched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let license = LicenseFixture::with_status(&server.uri()).document();
    let current = status(&server.uri(), "active");
    let updated = client(store_with_license())
        .fetch_updated_license(&license, &current, None)
        .await
        .unwrap();
    assert!(updated.is_none());
}

#[tokio::test]
async fn license_with_another_id_is_rejected() {
    let server = MockServer::start().await;
    let other = LicenseFixture {
        id: "another-license".into(),
        updated: Some("2024-04-01T00:00:00Z".into()),
        ..LicenseFixture::default()
    };
    Mock::given(method("GET"))
        .and(path("/license"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(other.bytes()))
        .mount(&server)
        .await;

    let mut value = status_value(&server.uri(), "active");
    value["updated"]["license"] = json!("2024-04-01T00:00:00Z");
    let current = StatusDocument::parse(value.to_string().as_bytes()).unwrap();
    let license = LicenseFixture::with_status(&server.uri()).document();

    let err = client(store_with_license())
        .fetch_updated_license(&license, &current, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LcpError::LicenseIdMismatch { .. }));
}
