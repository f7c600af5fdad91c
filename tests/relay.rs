//! `/tracing` relay against mock downstream services.

mod common;

fn relay_config(downstream: String) -> echo_server::ServerConfig {
    let mut config = common::test_config();
    config.relay.downstream_url = downstream;
    config
}

#[tokio::test]
async fn downstream_response_is_relayed_verbatim() {
    let backend = common::start_mock_backend("201 Created", "from downstream", false).await;
    let server = common::spawn_app(relay_config(format!("http://{backend}/")), None).await;

    let response = common::client()
        .get(server.url("/tracing"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 201);
    assert_eq!(response.headers()["x-backend"], "mock");
    assert_eq!(response.text().await.unwrap(), "from downstream");

    server.shutdown.trigger();
    server.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn inbound_headers_reach_downstream() {
    let backend = common::start_mock_backend("200 OK", "", true).await;
    let server = common::spawn_app(relay_config(format!("http://{backend}/")), None).await;

    let response = common::client()
        .get(server.url("/tracing"))
        .header("x-b3-traceid", "463ac35c9f6413ad")
        .header("x-request-id", "req-7")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let head = response.text().await.unwrap().to_ascii_lowercase();
    assert!(head.starts_with("get / http/1.1"));
    assert!(head.contains("x-b3-traceid: 463ac35c9f6413ad"));
    assert!(head.contains("x-request-id: req-7"));
    assert!(head.contains(&format!("host: {backend}")));

    server.shutdown.trigger();
    server.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn unreachable_downstream_is_bad_gateway() {
    let nowhere = common::unused_addr().await;
    let server = common::spawn_app(relay_config(format!("http://{nowhere}/")), None).await;

    let response = common::client()
        .get(server.url("/tracing"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 502);
    assert_eq!(response.text().await.unwrap(), "Downstream request failed\n");

    server.shutdown.trigger();
    server.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn disabled_relay_falls_through_to_echo() {
    let mut config = common::test_config();
    config.relay.enabled = false;
    let server = common::spawn_app(config, None).await;

    let response = common::client()
        .get(server.url("/tracing"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], "application/json");

    server.shutdown.trigger();
    server.handle.await.unwrap().unwrap();
}
