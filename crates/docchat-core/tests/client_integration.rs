use std::net::TcpListener;
use std::time::{Duration, Instant};

use docchat_core::{ApiClient, ClientError, Config};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ApiClient {
    ApiClient::new(Config::new(server.uri())).expect("client build")
}

fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind temp port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    port
}

#[tokio::test]
async fn test_ask_posts_query_and_returns_sources() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(header("accept", "application/json"))
        .and(body_json(json!({ "query": "What is ROS 2?" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "ROS 2 is a middleware framework.",
            "sources": ["module-1/ros2-basics", "module-1/nodes"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = client_for(&server).ask("What is ROS 2?").await.expect("ask reply");
    assert_eq!(reply.response, "ROS 2 is a middleware framework.");
    assert_eq!(reply.sources, vec!["module-1/ros2-basics", "module-1/nodes"]);
}

#[tokio::test]
async fn test_ask_without_sources_defaults_to_empty() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "ok" })))
        .mount(&server)
        .await;

    let reply = client_for(&server).ask("x").await.expect("ask reply");
    assert!(reply.sources.is_empty());
}

#[tokio::test]
async fn test_ask_about_selection_body_shape() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat/selected-text"))
        .and(body_json(json!({
            "selected_text": "Gazebo simulates rigid bodies.",
            "query": "Which physics engine?"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "ODE by default." })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = client_for(&server)
        .ask_about_selection("Gazebo simulates rigid bodies.", "Which physics engine?")
        .await
        .expect("selection reply");
    assert_eq!(reply.response, "ODE by default.");
}

#[tokio::test]
async fn test_server_error_status_is_surfaced() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client_for(&server).ask("x").await.unwrap_err();
    assert_eq!(err, ClientError::Server { status: 500 });
}

#[tokio::test]
async fn test_selection_not_found_is_server_error() {
    let server = MockServer::start().await;

    let err = client_for(&server)
        .ask_about_selection("passage", "question")
        .await
        .unwrap_err();
    assert_eq!(err, ClientError::Server { status: 404 });
}

#[tokio::test]
async fn test_malformed_body_is_invalid_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client_for(&server).ask("x").await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidResponse(_)), "got {err:?}");
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "response": "late" }))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let config = Config::new(server.uri()).with_timeout(Duration::from_millis(200));
    let client = ApiClient::new(config).expect("client build");

    let started = Instant::now();
    let err = client.ask("x").await.unwrap_err();
    assert_eq!(err, ClientError::Timeout);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
    let config = Config::new(format!("http://127.0.0.1:{}", free_port()));
    let client = ApiClient::new(config).expect("client build");

    let err = client.ask("x").await.unwrap_err();
    assert!(matches!(err, ClientError::Network(_)), "got {err:?}");
}

#[tokio::test]
async fn test_translate_makes_no_request() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    let started = Instant::now();
    let translation = client.translate("hello").await.expect("stub translation");
    assert!(started.elapsed() < client.config().timeout);
    assert!(translation.translated_text.contains("hello"));
    assert!(translation.is_stub());

    let received = server.received_requests().await.expect("request recording");
    assert!(received.is_empty());
}
