//! HTTP-level routing tests.

use algostream_api::{router, HubState};
use axum_test::TestServer;

fn server() -> TestServer {
    let app = router(HubState::default()).expect("router");
    TestServer::new(app).expect("server")
}

#[tokio::test]
async fn test_plain_get_on_channel_is_rejected() {
    let server = server();

    for path in ["/ws/ticks", "/ws/orders", "/ws/pnl"] {
        let response = server.get(path).await;
        assert!(
            response.status_code().is_client_error(),
            "{path} accepted a request without upgrade"
        );
    }
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let server = server();
    let response = server.get("/ws/unknown").await;
    response.assert_status_not_found();
}

#[tokio::test]
async fn test_no_connection_without_upgrade() {
    let state = HubState::default();
    let app = router(state.clone()).expect("router");
    let server = TestServer::new(app).expect("server");

    let _ = server.get("/ws/ticks").await;

    assert!(state.registry.is_empty());
    assert!(!state.ticks.is_running());
    assert_eq!(state.metrics.connections_opened(), 0);
}
