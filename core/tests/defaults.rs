//! Process-wide defaults.
//!
//! This is the only test binary that mutates the singleton, and it does so
//! from a single test so nothing else can observe the intermediate states.

use std::sync::Arc;

use async_trait::async_trait;
use http_service::config;
use http_service::{
    Defaults, Headers, HttpRequest, HttpService, RequestOptions, Response, Transport,
    TransportError,
};
use tokio::sync::{Mutex, Notify};

/// Records requests; the first one waits for `release` before answering.
#[derive(Default)]
struct GatedTransport {
    requests: Mutex<Vec<HttpRequest>>,
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl Transport for GatedTransport {
    async fn send(&self, request: HttpRequest) -> Result<Response, TransportError> {
        let first = {
            let mut requests = self.requests.lock().await;
            requests.push(request);
            requests.len() == 1
        };
        if first {
            self.entered.notify_one();
            self.release.notified().await;
        }
        Ok(Response::new(200, "ok"))
    }
}

#[tokio::test]
async fn process_wide_defaults_lifecycle() {
    config::reset();
    assert_eq!(config::defaults(), Defaults::default());

    let mut headers = Headers::new();
    headers.insert("Authorization", "Bearer startup");
    config::configure(Defaults {
        path_prefix: "http://first.test".to_string(),
        retry_count: 3,
        headers,
    });
    assert_eq!(config::defaults().retry_count, 3);

    let transport = Arc::new(GatedTransport::default());
    let service = HttpService::from_transport(transport.clone());

    // The in-flight call keeps the snapshot taken when it started.
    let in_flight = service.get("/a", RequestOptions::new());
    transport.entered.notified().await;
    config::configure(Defaults {
        path_prefix: "http://second.test".to_string(),
        ..Defaults::default()
    });
    transport.release.notify_one();
    in_flight.await.unwrap();

    // Later calls see the new defaults; call-site options still win.
    service.get("/b", RequestOptions::new()).await.unwrap();
    service
        .get("/c", RequestOptions::new().path_prefix("http://override.test"))
        .await
        .unwrap();

    let requests = transport.requests.lock().await.clone();
    assert_eq!(requests[0].url, "http://first.test/a");
    assert_eq!(requests[0].header("authorization"), Some("Bearer startup"));
    assert_eq!(requests[1].url, "http://second.test/b");
    assert!(requests[1].header("authorization").is_none());
    assert_eq!(requests[2].url, "http://override.test/c");

    // A pinned service ignores the singleton entirely.
    let pinned = HttpService::from_transport(transport.clone()).with_defaults(Defaults::default());
    pinned.get("/d", RequestOptions::new()).await.unwrap();
    assert_eq!(transport.requests.lock().await.last().unwrap().url, "/d");

    // Defaults are read when the verb is called, not when the task first runs.
    config::configure(Defaults {
        path_prefix: "http://at-call.test".to_string(),
        ..Defaults::default()
    });
    let pending = service.get("/e", RequestOptions::new());
    config::configure(Defaults {
        path_prefix: "http://later.test".to_string(),
        ..Defaults::default()
    });
    pending.await.unwrap();
    assert_eq!(
        transport.requests.lock().await.last().unwrap().url,
        "http://at-call.test/e"
    );

    config::reset();
    assert_eq!(config::defaults(), Defaults::default());
}
