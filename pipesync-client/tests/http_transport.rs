//! `HttpTransport` against an in-process HTTP stub.
//!
//! Each stub connection serves exactly one canned reply, optionally after a
//! delay, and records the raw request head.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use pipesync_client::{ClientError, RegistryClient};
use pipesync_core::{PipelineName, ServerConfig};

// ---------------------------------------------------------------------------
// Stub server
// ---------------------------------------------------------------------------

struct Reply {
    delay: Duration,
    raw: String,
}

fn reply(status: &str, headers: &[(&str, &str)], body: &str) -> Reply {
    let mut raw = format!("HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n", body.len());
    for (name, value) in headers {
        raw.push_str(&format!("{name}: {value}\r\n"));
    }
    raw.push_str("\r\n");
    raw.push_str(body);
    Reply {
        delay: Duration::ZERO,
        raw,
    }
}

struct Stub {
    addr: SocketAddr,
    heads: Arc<Mutex<Vec<String>>>,
}

impl Stub {
    fn serve(replies: Vec<Reply>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub");
        let addr = listener.local_addr().expect("stub addr");
        let heads = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&heads);

        thread::spawn(move || {
            for reply in replies {
                let Ok((stream, _)) = listener.accept() else { return };
                let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
                let mut head = String::new();
                let mut content_length = 0usize;
                loop {
                    let mut line = String::new();
                    if reader.read_line(&mut line).unwrap_or(0) == 0 || line == "\r\n" {
                        break;
                    }
                    if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                        content_length = value.trim().parse().unwrap_or(0);
                    }
                    head.push_str(&line);
                }
                let mut body = vec![0u8; content_length];
                let _ = reader.read_exact(&mut body);
                seen.lock().unwrap().push(head);

                thread::sleep(reply.delay);
                let mut stream = stream;
                let _ = stream.write_all(reply.raw.as_bytes());
                let _ = stream.flush();
            }
        });

        Self { addr, heads }
    }

    fn config(&self) -> ServerConfig {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut config = ServerConfig::default()
            .with_host("http://127.0.0.1")
            .unwrap()
            .with_timeout(Duration::from_secs(5));
        config.port = self.addr.port();
        config
    }

    fn heads(&self) -> Vec<String> {
        self.heads.lock().unwrap().clone()
    }
}

const PIPELINE: &str = r#"{"name":"build","environment_variables":[],"stages":[]}"#;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn fetch_reads_etag_and_body() {
    let stub = Stub::serve(vec![reply("200 OK", &[("ETag", "\"abc123\"")], PIPELINE)]);
    let client = RegistryClient::new(stub.config());

    let fetched = client
        .fetch(&PipelineName::from("build"))
        .expect("fetch")
        .expect("present");
    assert_eq!(fetched.token.as_str(), "\"abc123\"");
    assert_eq!(fetched.pipeline.name.0, "build");

    let head = stub.heads().remove(0);
    assert!(head.starts_with("GET /go/api/admin/pipelines/build HTTP/1.1"));
    assert!(head.to_ascii_lowercase().contains("accept: application/vnd.go.cd.v4+json"));
}

#[test]
fn missing_pipeline_is_none_not_error() {
    let stub = Stub::serve(vec![reply("404 Not Found", &[], r#"{"message":"not found"}"#)]);
    let client = RegistryClient::new(stub.config());
    assert!(client.fetch(&PipelineName::from("ghost")).expect("fetch").is_none());
}

#[test]
fn credentials_are_sent_as_basic_auth() {
    let stub = Stub::serve(vec![reply("404 Not Found", &[], "")]);
    let config = stub.config().with_credentials("admin", "badger");
    RegistryClient::new(config)
        .fetch(&PipelineName::from("build"))
        .expect("fetch");
    let head = stub.heads().remove(0).to_ascii_lowercase();
    assert!(head.contains("authorization: basic ywrtaw46ymfkz2vy"), "head was: {head}");
}

#[test]
fn slow_server_times_out_but_responsive_server_succeeds() {
    let mut slow_reply = reply("200 OK", &[("ETag", "\"slow\"")], PIPELINE);
    slow_reply.delay = Duration::from_millis(1500);
    let slow = Stub::serve(vec![slow_reply]);
    let slow_client = RegistryClient::new(slow.config().with_timeout(Duration::from_millis(100)));

    let err = slow_client
        .fetch(&PipelineName::from("build"))
        .expect_err("slow server must time out");
    assert!(err.is_timeout(), "expected a timeout, got {err}");

    let fast = Stub::serve(vec![reply("200 OK", &[("ETag", "\"fast\"")], PIPELINE)]);
    let fast_client = RegistryClient::new(fast.config().with_timeout(Duration::from_secs(5)));
    let fetched = fast_client
        .fetch(&PipelineName::from("build"))
        .expect("fast fetch")
        .expect("present");
    assert_eq!(fetched.token.as_str(), "\"fast\"");
}

#[test]
fn refused_connection_is_transport_error() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let mut config = ServerConfig::default().with_host("http://127.0.0.1").unwrap();
    config.port = port;
    let err = RegistryClient::new(config)
        .fetch(&PipelineName::from("build"))
        .unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
    assert!(!err.is_timeout(), "refusal is not a timeout: {err}");
}

#[test]
fn stale_token_over_http_is_conflict() {
    let stub = Stub::serve(vec![reply(
        "412 Precondition Failed",
        &[],
        r#"{"message":"Someone has modified the configuration for pipeline 'build'"}"#,
    )]);
    let client = RegistryClient::new(stub.config());
    let pipeline = pipesync_core::codec::decode(PIPELINE.as_bytes()).unwrap();
    let err = client
        .update(&pipeline, &pipesync_core::ConcurrencyToken::from("\"old\""))
        .unwrap_err();
    assert!(err.is_conflict());

    let head = stub.heads().remove(0).to_ascii_lowercase();
    assert!(head.starts_with("put /go/api/admin/pipelines/build"));
    assert!(head.contains("if-match: \"old\""));
}
