mod common;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Request, Response, StatusCode};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bearer_fetch::{BoxError, Config, Error, FetchClient, FetchOptions, TokenPair, Transport};

use common::{StubRefresh, jwt};

#[tokio::test]
async fn slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let refresh = StubRefresh::issuing(jwt("fresh", 3600));
    let client = common::client(&server, Some(jwt("valid", 3600)), &refresh);

    let err = client
        .fetch("/slow", FetchOptions::new().timeout(Duration::from_millis(50)))
        .await
        .unwrap_err();
    match err {
        Error::Timeout(limit) => assert_eq!(limit, Some(Duration::from_millis(50))),
        other => panic!("expected Timeout, got {other:?}"),
    }
    assert_eq!(refresh.calls(), 0);
}

#[tokio::test]
async fn response_inside_the_timeout_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(20))
                .set_body_json(serde_json::json!([1, 2, 3])),
        )
        .mount(&server)
        .await;

    let refresh = StubRefresh::issuing(jwt("fresh", 3600));
    let client = common::client(&server, Some(jwt("valid", 3600)), &refresh);

    let numbers: Vec<u8> = client
        .fetch_json("/list", FetchOptions::new().timeout(Duration::from_secs(2)))
        .await
        .unwrap();
    assert_eq!(numbers, vec![1, 2, 3]);
}

struct TimingOutTransport;

#[async_trait]
impl Transport for TimingOutTransport {
    async fn send(&self, _request: Request) -> Result<Response, BoxError> {
        Err(Box::new(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "upstream gave up",
        )))
    }
}

#[tokio::test]
async fn transport_timeout_without_a_request_timer_has_no_budget() {
    let client = FetchClient::builder()
        .config(Config {
            timeout_ms: 0,
            ..Config::from_values("http://127.0.0.1:9", None, Some(jwt("valid", 3600)), None)
        })
        .transport(TimingOutTransport)
        .refresh_operation(|_: Option<String>| async {
            Ok::<_, Error>(TokenPair::new("unused", "unused"))
        })
        .build()
        .unwrap();

    let err = client.fetch("/anything", FetchOptions::new()).await.unwrap_err();
    assert!(matches!(err, Error::Timeout(None)), "{err:?}");
    assert_eq!(err.to_string(), "request timed out");
}

#[tokio::test]
async fn closed_port_is_network_unavailable() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let client = FetchClient::builder()
        .config(Config::from_values(
            format!("http://127.0.0.1:{port}"),
            None,
            Some(jwt("valid", 3600)),
            None,
        ))
        .refresh_operation(|_: Option<String>| async {
            Ok::<_, Error>(TokenPair::new("unused", "unused"))
        })
        .build()
        .unwrap();

    let err = client.fetch("/anything", FetchOptions::new()).await.unwrap_err();
    assert!(matches!(err, Error::NetworkUnavailable(_)), "{err:?}");
}

#[tokio::test]
async fn server_error_keeps_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/things/9"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(serde_json::json!({"reason": "in use"})),
        )
        .mount(&server)
        .await;

    let refresh = StubRefresh::issuing(jwt("fresh", 3600));
    let client = common::client(&server, Some(jwt("valid", 3600)), &refresh);

    let err = client
        .fetch("/things/9", FetchOptions::new().method(reqwest::Method::DELETE))
        .await
        .unwrap_err();
    match err {
        Error::HttpStatus {
            status,
            status_text,
            body,
        } => {
            assert_eq!(status, StatusCode::CONFLICT);
            assert_eq!(status_text, "Conflict");
            assert_eq!(body, Some(serde_json::json!({"reason": "in use"})));
        }
        other => panic!("expected HttpStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn plain_text_error_body_is_dropped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let refresh = StubRefresh::issuing(jwt("fresh", 3600));
    let client = common::client(&server, Some(jwt("valid", 3600)), &refresh);

    let err = client.fetch("/", FetchOptions::new()).await.unwrap_err();
    assert!(matches!(
        err,
        Error::HttpStatus {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: None,
            ..
        }
    ));
}

#[tokio::test]
async fn builder_rejects_missing_refresh_source() {
    let err = FetchClient::builder()
        .config(Config::from_values("https://api.example.com", None, None, None))
        .build()
        .err()
        .expect("no refresh operation");
    assert!(matches!(err, Error::Config(ref msg) if msg.contains("refresh")), "{err:?}");
}

#[tokio::test]
async fn builder_rejects_invalid_base_url() {
    let err = FetchClient::builder()
        .config(Config::from_values("not a url", None, None, None))
        .refresh_operation(|_: Option<String>| async {
            Ok::<_, Error>(TokenPair::new("a", "b"))
        })
        .build()
        .err()
        .expect("invalid base url");
    assert!(matches!(err, Error::Config(ref msg) if msg.contains("Invalid base URL")));
}

#[tokio::test]
async fn relative_url_without_base_is_rejected() {
    let client = FetchClient::builder()
        .config(Config::default())
        .refresh_operation(|_: Option<String>| async {
            Ok::<_, Error>(TokenPair::new("a", "b"))
        })
        .build()
        .unwrap();
    let err = client.fetch("/orphan", FetchOptions::new().skip_auth(true)).await.unwrap_err();
    assert!(matches!(err, Error::InvalidUrl { .. }), "{err:?}");
}
