use std::io::Read;
use std::net::{TcpListener, TcpStream};
use std::time::Duration;

use engine_logging::MemorySink;
use log::Level;
use scraper_engine::{
    extract_title, AttemptOutcome, FailureKind, FetchConfig, FetchResult, HttpTransport,
    ReqwestTransport, TitleProbe,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(5);

fn failure_kind(outcome: AttemptOutcome) -> FailureKind {
    match outcome {
        AttemptOutcome::Failure { kind, .. } => kind,
        other => panic!("expected failure, got {other:?}"),
    }
}

/// Accepts one connection on a plain socket and hands it to `handle`.
fn single_connection_server(handle: impl FnOnce(TcpStream) + Send + 'static) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        if let Ok((stream, _)) = listener.accept() {
            handle(stream);
        }
    });
    format!("http://{addr}/")
}

fn read_request_head(stream: &mut TcpStream) {
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        match stream.read(&mut byte) {
            Ok(1) => head.push(byte[0]),
            _ => break,
        }
    }
}

#[tokio::test]
async fn transport_returns_decoded_body_and_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/doc"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "<html><head><title>Doc</title></head></html>",
            "text/html; charset=utf-8",
        ))
        .mount(&server)
        .await;

    engine_logging::initialize_for_tests();
    let transport = ReqwestTransport::new();
    let outcome = transport.get(&format!("{}/doc", server.uri()), TIMEOUT).await;

    assert_eq!(
        outcome,
        AttemptOutcome::Success {
            body: "<html><head><title>Doc</title></head></html>".to_string(),
            status: 200,
        }
    );
}

#[tokio::test]
async fn transport_honours_latin1_charset() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/latin"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            b"<title>caf\xe9</title>".to_vec(),
            "text/html; charset=ISO-8859-1",
        ))
        .mount(&server)
        .await;

    let outcome = ReqwestTransport::new()
        .get(&format!("{}/latin", server.uri()), TIMEOUT)
        .await;

    match outcome {
        AttemptOutcome::Success { body, .. } => assert_eq!(body, "<title>café</title>"),
        other => panic!("expected success, got {other:?}"),
    }
}

#[tokio::test]
async fn transport_sends_configured_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("user-agent", "title-probe-test"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<title>ua</title>"))
        .mount(&server)
        .await;

    let outcome = ReqwestTransport::with_user_agent("title-probe-test")
        .get(&server.uri(), TIMEOUT)
        .await;

    assert!(matches!(outcome, AttemptOutcome::Success { status: 200, .. }));
}

#[tokio::test]
async fn transport_classifies_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let outcome = ReqwestTransport::new()
        .get(&format!("{}/missing", server.uri()), TIMEOUT)
        .await;

    assert_eq!(failure_kind(outcome), FailureKind::HttpStatusError(404));
}

#[tokio::test]
async fn transport_times_out_on_slow_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(500))
                .set_body_string("slow"),
        )
        .mount(&server)
        .await;

    let outcome = ReqwestTransport::new()
        .get(&format!("{}/slow", server.uri()), Duration::from_millis(50))
        .await;

    assert_eq!(failure_kind(outcome), FailureKind::Timeout);
}

#[tokio::test]
async fn transport_classifies_refused_connection() {
    // Bind and drop a listener so the port is known to be closed.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let outcome = ReqwestTransport::new()
        .get(&format!("http://127.0.0.1:{port}/"), TIMEOUT)
        .await;

    assert_eq!(failure_kind(outcome), FailureKind::ConnectionError);
}

#[tokio::test]
async fn transport_classifies_close_before_response_as_connection_error() {
    let url = single_connection_server(|mut stream| {
        read_request_head(&mut stream);
        drop(stream);
    });

    let outcome = ReqwestTransport::new().get(&url, TIMEOUT).await;

    assert_eq!(failure_kind(outcome), FailureKind::ConnectionError);
}

#[tokio::test]
async fn transport_classifies_reset_as_connection_error() {
    // Closing a socket with unread input makes the kernel answer with RST.
    let url = single_connection_server(|stream| {
        std::thread::sleep(Duration::from_millis(300));
        drop(stream);
    });

    let outcome = ReqwestTransport::new().get(&url, TIMEOUT).await;

    assert_eq!(failure_kind(outcome), FailureKind::ConnectionError);
}

#[tokio::test]
async fn transport_truncates_oversized_body_but_keeps_title() {
    let server = MockServer::start().await;
    let page = format!(
        "<html><head><title>Big</title></head><body>{}</body></html>",
        "x".repeat(10_000)
    );
    Mock::given(method("GET"))
        .and(path("/big"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(page, "text/html"))
        .mount(&server)
        .await;

    let outcome = ReqwestTransport::new()
        .max_body_bytes(64)
        .get(&format!("{}/big", server.uri()), TIMEOUT)
        .await;

    match outcome {
        AttemptOutcome::Success { body, status } => {
            assert_eq!(status, 200);
            assert_eq!(body.len(), 64);
            assert_eq!(extract_title(&body), Some("Big".to_string()));
        }
        other => panic!("expected success, got {other:?}"),
    }
}

#[tokio::test]
async fn transport_reports_malformed_url_as_other_error() {
    let outcome = ReqwestTransport::new().get("not a url", TIMEOUT).await;
    assert_eq!(failure_kind(outcome), FailureKind::OtherRequestError);
}

#[tokio::test]
async fn probe_retries_server_error_then_finds_title() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<html><head><title> Recovered </title></head></html>", "text/html"),
        )
        .expect(1)
        .mount(&server)
        .await;

    engine_logging::initialize_for_tests();
    let probe = TitleProbe::new();
    let log = MemorySink::new();
    let config = FetchConfig::new(TIMEOUT, 3, Duration::from_millis(10));

    let result = probe
        .fetch_with_retry(&format!("{}/flaky", server.uri()), &config, &log)
        .await;

    assert_eq!(result, FetchResult::Title("Recovered".to_string()));
    assert!(log.contains(Level::Warn, "http status 503"));
}

#[tokio::test]
async fn probe_gives_up_on_persistent_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&server)
        .await;

    let probe = TitleProbe::new();
    let log = MemorySink::new();
    let config = FetchConfig::new(TIMEOUT, 2, Duration::ZERO);

    let result = probe.fetch_with_retry(&server.uri(), &config, &log).await;

    assert_eq!(result, FetchResult::Failed);
    assert!(log.contains(Level::Error, "after 2 attempts"));
}
