use crate::mock::*;
use libcloudlink::network::application::http::{
    Header, HttpEngine, Phase, Request, Step, Target, Timeouts,
};
use libcloudlink::network::error::Error;
use libcloudlink::network::tls::{PlainOnly, TlsPolicy};
use libcloudlink::network::{ConnectionId, Event};

type PlainEngine = HttpEngine<PlainOnly, 512, 1024>;
type SecureEngine = HttpEngine<ToyTls, 512, 1024>;

fn plain() -> PlainEngine {
    HttpEngine::new(PlainOnly, TlsPolicy::default())
}

fn secure() -> SecureEngine {
    HttpEngine::new(ToyTls::default(), TlsPolicy::default())
}

#[test]
fn test_plain_get_through_every_phase() {
    let mut stack = MockStack::new();
    let mut engine = plain();

    engine
        .start(&mut stack, &Target::http("example.org"), &Request::get("/status"))
        .unwrap();
    assert_eq!(stack.lookups, ["example.org"]);
    assert_eq!(engine.phase(), Phase::Resolving);
    assert!(engine.is_active());

    assert_eq!(engine.drive(&mut stack, Event::Resolved(SERVER_IP)), Step::Pending);
    assert_eq!(engine.phase(), Phase::Connecting);
    assert_eq!(stack.connects, [(SERVER_IP, 80, ConnectionId(1))]);

    let conn = stack.last_conn();
    assert_eq!(engine.drive(&mut stack, Event::Connected(conn)), Step::Pending);
    assert_eq!(engine.phase(), Phase::Receiving);
    assert!(
        stack
            .written_text()
            .starts_with("GET /status HTTP/1.1\r\nHost: example.org\r\n")
    );
    assert!(stack.written_text().ends_with("Connection: close\r\n\r\n"));
    assert_eq!(stack.flushes, 1);

    let head = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhel";
    assert_eq!(engine.drive(&mut stack, Event::DataArrived(conn, head)), Step::Pending);
    assert_eq!(engine.drive(&mut stack, Event::DataArrived(conn, b"lo")), Step::Pending);
    assert_eq!(engine.drive(&mut stack, Event::Closed(conn)), Step::Response);
    assert_eq!(stack.closed, [conn]);
    assert!(stack.aborted.is_empty());
    assert!(!engine.is_active());

    let response = engine.response().unwrap();
    assert_eq!(response.status_code, 200);
    assert_eq!(response.header("content-length"), Some("5"));
    assert_eq!(response.body, b"hello");
}

#[test]
fn test_cached_lookup_connects_immediately() {
    let mut stack = MockStack::cached();
    let mut engine = plain();

    engine
        .start(&mut stack, &Target::http("example.org").with_port(8080), &Request::get("/"))
        .unwrap();
    assert_eq!(engine.phase(), Phase::Connecting);
    assert_eq!(stack.connects[0].1, 8080);
}

#[test]
fn test_partial_writes_are_completed() {
    let mut stack = MockStack::cached();
    stack.write_limit = Some(7);
    let mut engine = plain();

    let headers = [Header::new("Accept", "application/json")];
    let request = Request::post("/submit", b"a=1").with_headers(&headers);
    engine.start(&mut stack, &Target::http("example.org"), &request).unwrap();
    let conn = stack.last_conn();
    engine.drive(&mut stack, Event::Connected(conn));

    let text = stack.written_text();
    assert!(text.starts_with("POST /submit HTTP/1.1\r\n"));
    assert!(text.contains("Accept: application/json\r\n"));
    assert!(text.contains("Content-Length: 3\r\n"));
    assert!(text.ends_with("\r\n\r\na=1"));
}

#[test]
fn test_fragmented_handshake_then_response() {
    let mut stack = MockStack::cached();
    let mut engine = secure();

    engine
        .start(&mut stack, &Target::https("api.example.org"), &Request::get("/v1"))
        .unwrap();
    assert_eq!(stack.connects[0].1, 443);
    let conn = stack.last_conn();

    engine.drive(&mut stack, Event::Connected(conn));
    assert_eq!(engine.phase(), Phase::Handshaking);
    assert_eq!(stack.written, CLIENT_HELLO);
    assert_eq!(engine.session().engine().last_server_name, "api.example.org");

    engine.drive(&mut stack, Event::DataArrived(conn, b"SER"));
    assert_eq!(engine.phase(), Phase::Handshaking);
    assert!(!engine.session().is_handshake_done());

    // The rest of the hello and the start of the response in one segment.
    let mut segment = b"VER".to_vec();
    segment.extend(seal(b"HTTP/1.1 200 OK\r\n\r\nsec"));
    engine.drive(&mut stack, Event::DataArrived(conn, &segment));
    assert_eq!(engine.phase(), Phase::Receiving);
    assert!(opened_request(&stack).starts_with("GET /v1 HTTP/1.1\r\nHost: api.example.org\r\n"));

    engine.drive(&mut stack, Event::DataArrived(conn, &seal(b"ure")));
    assert_eq!(engine.drive(&mut stack, Event::Closed(conn)), Step::Response);
    assert_eq!(engine.response().unwrap().body, b"secure");
}

#[test]
fn test_handshake_failure_aborts() {
    let mut stack = MockStack::cached();
    let mut engine = secure();

    engine
        .start(&mut stack, &Target::https("api.example.org"), &Request::get("/"))
        .unwrap();
    let conn = stack.last_conn();
    engine.drive(&mut stack, Event::Connected(conn));

    let step = engine.drive(&mut stack, Event::DataArrived(conn, &[b'S', ALERT]));
    assert_eq!(step, Step::Failed(Error::HandshakeError));
    assert_eq!(stack.aborted, [conn]);
    assert_eq!(engine.phase(), Phase::Done);
    assert_eq!(stack.written, CLIENT_HELLO);

    // Nothing further is processed for the dead request.
    assert_eq!(engine.drive(&mut stack, Event::Closed(conn)), Step::Pending);
    assert!(engine.raw_response().is_empty());
}

#[test]
fn test_plain_only_engine_rejects_secure_target() {
    let mut stack = MockStack::cached();
    let mut engine = plain();

    engine
        .start(&mut stack, &Target::https("api.example.org"), &Request::get("/"))
        .unwrap();
    let conn = stack.last_conn();
    let step = engine.drive(&mut stack, Event::Connected(conn));
    assert_eq!(step, Step::Failed(Error::HandshakeError));
    assert_eq!(stack.aborted, [conn]);
    assert!(stack.written.is_empty());
}

#[test]
fn test_staging_overflow_fails() {
    let mut stack = MockStack::cached();
    let mut engine = HttpEngine::<ToyTls, 512, 1024>::new(
        ToyTls {
            stall: true,
            ..ToyTls::default()
        },
        TlsPolicy::default(),
    );

    engine
        .start(&mut stack, &Target::https("api.example.org"), &Request::get("/"))
        .unwrap();
    let conn = stack.last_conn();
    engine.drive(&mut stack, Event::Connected(conn));

    let flood = vec![b'x'; 5000];
    let step = engine.drive(&mut stack, Event::DataArrived(conn, &flood));
    assert_eq!(step, Step::Failed(Error::CapacityExceeded));
    assert_eq!(stack.aborted, [conn]);
}

#[test]
fn test_restart_aborts_prior_and_ignores_stale_events() {
    let mut stack = MockStack::cached();
    let mut engine = plain();

    engine.start(&mut stack, &Target::http("a.example"), &Request::get("/1")).unwrap();
    let first = stack.last_conn();
    engine.drive(&mut stack, Event::Connected(first));
    assert_eq!(engine.phase(), Phase::Receiving);

    engine.start(&mut stack, &Target::http("b.example"), &Request::get("/2")).unwrap();
    let second = stack.last_conn();
    assert_ne!(first, second);
    assert_eq!(stack.aborted, [first]);

    // Late callbacks from the first connection change nothing.
    assert_eq!(engine.drive(&mut stack, Event::DataArrived(first, b"HTTP/1.1 200 OK\r\n\r\nold")), Step::Pending);
    assert_eq!(engine.drive(&mut stack, Event::Closed(first)), Step::Pending);
    assert_eq!(engine.phase(), Phase::Connecting);
    assert!(engine.raw_response().is_empty());

    engine.drive(&mut stack, Event::Connected(second));
    engine.drive(&mut stack, Event::DataArrived(second, b"HTTP/1.1 200 OK\r\n\r\nnew"));
    assert_eq!(engine.drive(&mut stack, Event::Closed(second)), Step::Response);
    assert_eq!(engine.response().unwrap().body, b"new");
}

#[test]
fn test_phase_timeouts() {
    let mut stack = MockStack::new();
    let mut engine = plain().with_timeouts(Timeouts {
        resolve_ms: 100,
        connect_ms: 200,
        handshake_ms: 0,
        receive_ms: 300,
    });

    engine.start(&mut stack, &Target::http("example.org"), &Request::get("/")).unwrap();
    stack.now = 99;
    assert_eq!(engine.drive(&mut stack, Event::Tick), Step::Pending);
    stack.now = 100;
    assert_eq!(engine.drive(&mut stack, Event::Tick), Step::Failed(Error::Timeout));
    assert_eq!(engine.phase(), Phase::Done);

    // The receive limit runs from the moment the request went out.
    engine.start(&mut stack, &Target::http("example.org"), &Request::get("/")).unwrap();
    engine.drive(&mut stack, Event::Resolved(SERVER_IP));
    let conn = stack.last_conn();
    stack.now = 250;
    engine.drive(&mut stack, Event::Connected(conn));
    assert_eq!(engine.phase(), Phase::Receiving);
    stack.now = 549;
    assert_eq!(engine.drive(&mut stack, Event::DataArrived(conn, b"HTTP/1.1")), Step::Pending);
    stack.now = 550;
    assert_eq!(engine.drive(&mut stack, Event::Tick), Step::Failed(Error::Timeout));
    assert_eq!(stack.aborted, [conn]);
}

#[test]
fn test_disabled_timeouts_never_fire() {
    let mut stack = MockStack::new();
    let mut engine = plain().with_timeouts(Timeouts::disabled());

    engine.start(&mut stack, &Target::http("example.org"), &Request::get("/")).unwrap();
    stack.now = u64::MAX / 2;
    assert_eq!(engine.drive(&mut stack, Event::Tick), Step::Pending);
    assert_eq!(engine.phase(), Phase::Resolving);
}

#[test]
fn test_close_without_data_is_an_error() {
    let mut stack = MockStack::cached();
    let mut engine = plain();

    engine.start(&mut stack, &Target::http("example.org"), &Request::get("/")).unwrap();
    let conn = stack.last_conn();
    engine.drive(&mut stack, Event::Connected(conn));
    let step = engine.drive(&mut stack, Event::Closed(conn));
    assert_eq!(step, Step::Failed(Error::ConnectionClosed));
    assert_eq!(Error::ConnectionClosed.message(), "Empty response");
}

#[test]
fn test_response_overflow_is_truncated() {
    let mut stack = MockStack::cached();
    let mut engine: HttpEngine<PlainOnly, 256, 64> = HttpEngine::new(PlainOnly, TlsPolicy::default());

    engine.start(&mut stack, &Target::http("example.org"), &Request::get("/")).unwrap();
    let conn = stack.last_conn();
    engine.drive(&mut stack, Event::Connected(conn));
    let mut response = b"HTTP/1.1 200 OK\r\n\r\n".to_vec();
    response.extend([b'z'; 100]);
    engine.drive(&mut stack, Event::DataArrived(conn, &response));

    assert_eq!(engine.drive(&mut stack, Event::Closed(conn)), Step::Response);
    assert!(engine.is_truncated());
    assert_eq!(engine.raw_response().len(), 64);
    assert_eq!(engine.response().unwrap().body.len(), 64 - 19);
}

#[test]
fn test_chunked_response_reads_the_same_twice() {
    let mut stack = MockStack::cached();
    let mut engine = plain();

    engine.start(&mut stack, &Target::http("example.org"), &Request::get("/")).unwrap();
    let conn = stack.last_conn();
    engine.drive(&mut stack, Event::Connected(conn));
    assert!(engine.response().is_err());

    let reply = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n";
    engine.drive(&mut stack, Event::DataArrived(conn, reply));
    assert_eq!(engine.drive(&mut stack, Event::Closed(conn)), Step::Response);

    assert_eq!(engine.response().unwrap().body, b"Wikipedia");
    assert_eq!(engine.response().unwrap().body, b"Wikipedia");
    assert_eq!(engine.response().unwrap().header("transfer-encoding"), Some("chunked"));
}

#[test]
fn test_start_failures() {
    let mut stack = MockStack::new();
    stack.refuse_lookup = true;
    let mut engine = plain();
    let result = engine.start(&mut stack, &Target::http("example.org"), &Request::get("/"));
    assert_eq!(result, Err(Error::ResolveError));
    assert!(!engine.is_active());

    let mut stack = MockStack::cached();
    stack.refuse_connect = true;
    let result = engine.start(&mut stack, &Target::http("example.org"), &Request::get("/"));
    assert_eq!(result, Err(Error::ConnectError));
    assert_eq!(engine.connection(), None);

    let mut stack = MockStack::cached();
    let mut small: HttpEngine<PlainOnly, 32, 64> = HttpEngine::new(PlainOnly, TlsPolicy::default());
    let result = small.start(
        &mut stack,
        &Target::http("example.org"),
        &Request::get("/a/path/that/cannot/fit/in/thirty/two/bytes"),
    );
    assert_eq!(result, Err(Error::RequestTooLarge));
    assert!(stack.lookups.is_empty());
}

#[test]
fn test_stack_reported_failures() {
    let mut stack = MockStack::new();
    let mut engine = plain();

    engine.start(&mut stack, &Target::http("example.org"), &Request::get("/")).unwrap();
    assert_eq!(
        engine.drive(&mut stack, Event::ResolveFailed),
        Step::Failed(Error::ResolveError)
    );

    engine.start(&mut stack, &Target::http("example.org"), &Request::get("/")).unwrap();
    engine.drive(&mut stack, Event::Resolved(SERVER_IP));
    let conn = stack.last_conn();
    assert_eq!(
        engine.drive(&mut stack, Event::ConnectFailed(conn)),
        Step::Failed(Error::ConnectError)
    );
    assert!(stack.aborted.is_empty());

    engine.start(&mut stack, &Target::http("example.org"), &Request::get("/")).unwrap();
    engine.drive(&mut stack, Event::Resolved(SERVER_IP));
    let conn = stack.last_conn();
    engine.drive(&mut stack, Event::Connected(conn));
    assert_eq!(
        engine.drive(&mut stack, Event::ReceiveFailed(conn)),
        Step::Failed(Error::ReadError)
    );
    assert_eq!(stack.aborted, [conn]);

    engine.start(&mut stack, &Target::http("example.org"), &Request::get("/")).unwrap();
    engine.drive(&mut stack, Event::Resolved(SERVER_IP));
    let conn = stack.last_conn();
    assert_eq!(
        engine.drive(&mut stack, Event::Error(conn)),
        Step::Failed(Error::NetworkError)
    );
    // The stack already released it.
    assert_eq!(stack.aborted.len(), 1);
}
