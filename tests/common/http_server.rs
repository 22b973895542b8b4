//! One-route HTTP/1.1 server for integration tests.
//!
//! Every request gets the same canned response; `delay` holds the response back
//! to exercise client timeouts. `start_tls` serves the same thing over HTTPS with
//! a certificate generated on the fly and signed by nobody.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::{ServerConfig, ServerConnection, StreamOwned};

#[derive(Debug, Clone)]
pub struct CannedResponse {
    pub status: u16,
    pub reason: &'static str,
    pub content_type: Option<String>,
    pub location: Option<String>,
    pub body: Vec<u8>,
    pub delay: Option<Duration>,
}

impl CannedResponse {
    pub fn ok(content_type: Option<&str>, body: Vec<u8>) -> Self {
        Self {
            status: 200,
            reason: "OK",
            content_type: content_type.map(str::to_string),
            location: None,
            body,
            delay: None,
        }
    }

    pub fn status(status: u16, reason: &'static str) -> Self {
        Self {
            status,
            reason,
            content_type: Some("text/plain".to_string()),
            location: None,
            body: reason.as_bytes().to_vec(),
            delay: None,
        }
    }
}

/// Starts the server on an ephemeral port and returns its base URL,
/// e.g. `http://127.0.0.1:12345`. The server runs until the process exits.
pub fn start(response: CannedResponse) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let response = Arc::new(response);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let response = Arc::clone(&response);
            thread::spawn(move || handle(stream, &response));
        }
    });
    format!("http://127.0.0.1:{port}")
}

/// Like `start`, over TLS with a fresh self-signed certificate for
/// `localhost` and `127.0.0.1`. Returns e.g. `https://127.0.0.1:12345`.
pub fn start_tls(response: CannedResponse) -> String {
    let config = Arc::new(self_signed_config());
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let response = Arc::new(response);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let response = Arc::clone(&response);
            let config = Arc::clone(&config);
            thread::spawn(move || {
                let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
                let Ok(conn) = ServerConnection::new(config) else {
                    return;
                };
                let mut tls = StreamOwned::new(conn, stream);
                respond(&mut tls, &response);
                tls.conn.send_close_notify();
                let _ = tls.flush();
            });
        }
    });
    format!("https://127.0.0.1:{port}")
}

fn self_signed_config() -> ServerConfig {
    let certified = rcgen::generate_simple_self_signed(vec![
        "localhost".to_string(),
        "127.0.0.1".to_string(),
    ])
    .expect("generate certificate");
    let cert = CertificateDer::from(certified.cert.der().to_vec());
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(
        certified.key_pair.serialize_der(),
    ));
    ServerConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
        .with_safe_default_protocol_versions()
        .expect("protocol versions")
        .with_no_client_auth()
        .with_single_cert(vec![cert], key)
        .expect("server config")
}

/// A URL on a port that nothing listens on.
pub fn refused_url(path: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}{path}")
}

fn handle(mut stream: TcpStream, response: &CannedResponse) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    respond(&mut stream, response);
}

fn respond<S: Read + Write>(stream: &mut S, response: &CannedResponse) {
    let mut buf = [0u8; 8192];
    let mut request = Vec::new();
    loop {
        match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                request.extend_from_slice(&buf[..n]);
                if request.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            Err(_) => return,
        }
    }

    if let Some(delay) = response.delay {
        thread::sleep(delay);
    }

    let mut head = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        response.status,
        response.reason,
        response.body.len()
    );
    if let Some(content_type) = &response.content_type {
        head.push_str(&format!("Content-Type: {content_type}\r\n"));
    }
    if let Some(location) = &response.location {
        head.push_str(&format!("Location: {location}\r\n"));
    }
    head.push_str("\r\n");

    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(&response.body);
    let _ = stream.flush();
}
