//! Throwaway HTTP server for exercising the reqwest-based clients.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;

/// The request a [`serve_once`] server received.
pub(crate) struct CapturedRequest {
    /// Request line and headers, lossily decoded.
    pub head: String,
    pub body: Vec<u8>,
}

/// Accept exactly one connection, read the whole request, answer with the
/// given status line and body, and hand the request back through the join
/// handle.
pub(crate) fn serve_once(
    status_line: &'static str,
    content_type: &'static str,
    body: &'static [u8],
) -> (String, thread::JoinHandle<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server failed");
    let addr = listener.local_addr().expect("read local addr failed");

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept failed");
        let request = read_request(&mut stream);

        let response = format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        stream
            .write_all(response.as_bytes())
            .expect("write headers failed");
        stream.write_all(body).expect("write body failed");
        stream.flush().expect("flush failed");
        request
    });

    (format!("http://127.0.0.1:{}", addr.port()), handle)
}

/// An address with nothing listening on it.
pub(crate) fn dead_endpoint() -> String {
    let port = TcpListener::bind("127.0.0.1:0")
        .expect("bind failed")
        .local_addr()
        .expect("read local addr failed")
        .port();
    format!("http://127.0.0.1:{port}")
}

fn read_request(stream: &mut impl Read) -> CapturedRequest {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        let n = stream.read(&mut chunk).unwrap_or(0);
        if n == 0 {
            break buf.len();
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|l| {
            let (name, value) = l.split_once(':')?;
            name.trim()
                .eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);
    let chunked = head.to_ascii_lowercase().contains("transfer-encoding: chunked");

    loop {
        let body_len = buf.len() - head_end;
        let done = if chunked {
            buf.ends_with(b"0\r\n\r\n")
        } else {
            body_len >= content_length
        };
        if done {
            break;
        }
        let n = stream.read(&mut chunk).unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    CapturedRequest {
        head,
        body: buf[head_end..].to_vec(),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
