//! Issues raw HTTP/1.x `GET` requests and classifies what comes back.
//!
//! This is deliberately not a full HTTP client: only the status line and the
//! `Content-Length` header are interpreted, and the body is read in bounded
//! chunks so that under-length, over-length and malformed responses can be
//! told apart. Chunked transfer encoding and redirects are not handled.

use std::fmt;
use std::io;
use std::time::Instant;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Synthetic classifier for a response without a `Content-Length` header.
pub const NO_CONTENT_LENGTH: u16 = 600;
/// Synthetic classifier for a non-numeric `Content-Length` value.
pub const BAD_CONTENT_LENGTH: u16 = 601;
/// Synthetic classifier for a body shorter than advertised.
pub const MESSAGE_SHORT: u16 = 602;
/// Synthetic classifier for a body longer than advertised.
pub const MESSAGE_LONG: u16 = 603;
/// Synthetic classifier for transport-level failures.
pub const TRANSPORT_ERROR: u16 = 610;

/// Read granularity for response bodies.
const CHUNK_SIZE: usize = 65_000;

/// Upper bound on the response head. Anything larger is treated as a
/// transport failure.
const MAX_HEAD: usize = 64 * 1024;

/// The terminal classification of one fetch attempt.
#[derive(Clone, Debug, PartialEq)]
pub struct Outcome {
    /// Identifier of the session that performed the fetch.
    pub session: u64,
    /// Requested resource path.
    pub path: String,
    /// HTTP status, or one of the synthetic classifiers above.
    pub class: u16,
    /// Short reason text for the classification.
    pub reason: String,
    /// Number of body bytes transferred.
    pub bytes: u64,
    /// Wall-clock seconds from request to the last body byte.
    pub elapsed: f64,
}

impl Outcome {
    /// A complete, well-formed response.
    pub fn ok(session: u64, path: &str, bytes: u64, elapsed: f64) -> Self {
        Self {
            session,
            path: path.to_owned(),
            class: 200,
            reason: "OK".to_owned(),
            bytes,
            elapsed,
        }
    }

    /// A response the server answered with a non-2xx status.
    pub fn rejected(session: u64, path: &str, status: u16, reason: String) -> Self {
        Self {
            session,
            path: path.to_owned(),
            class: status,
            reason,
            bytes: 0,
            elapsed: 0.0,
        }
    }

    /// A response that violated the content-length protocol expectations.
    pub fn classified(session: u64, path: &str, class: u16, reason: &str) -> Self {
        Self {
            session,
            path: path.to_owned(),
            class,
            reason: reason.to_owned(),
            bytes: 0,
            elapsed: 0.0,
        }
    }

    /// A transport-level failure during connect, request, or read.
    pub fn transport(session: u64, path: &str, err: &io::Error) -> Self {
        Self {
            session,
            path: path.to_owned(),
            class: TRANSPORT_ERROR,
            reason: err.to_string(),
            bytes: 0,
            elapsed: 0.0,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {:.6}",
            self.session, self.path, self.class, self.reason, self.bytes, self.elapsed
        )
    }
}

/// A client connection to the target server, private to one session.
///
/// The underlying connection is opened on the first [`get`](Self::get) and
/// kept for the rest of the session; it is never shared between sessions.
#[derive(Debug)]
pub struct Fetcher {
    session: u64,
    host: String,
    port: u16,
    stream: Option<TcpStream>,
}

impl Fetcher {
    /// Creates a fetcher for the given target.
    pub fn new(session: u64, host: impl Into<String>, port: u16) -> Self {
        Self {
            session,
            host: host.into(),
            port,
            stream: None,
        }
    }

    /// Fetches `path` and classifies the result.
    ///
    /// Transport failures are caught here and converted into an [`Outcome`],
    /// so a failing fetch never aborts anything beyond its own session.
    pub async fn get(&mut self, path: &str) -> Outcome {
        let start = Instant::now();
        match self.try_get(path, start).await {
            Ok(outcome) => outcome,
            Err(err) => Outcome::transport(self.session, path, &err),
        }
    }

    async fn try_get(&mut self, path: &str, start: Instant) -> io::Result<Outcome> {
        let stream = match &mut self.stream {
            Some(stream) => stream,
            stream => {
                let conn = TcpStream::connect((self.host.as_str(), self.port)).await?;
                stream.insert(conn)
            }
        };

        let request = format!("GET {path} HTTP/1.1\r\nHost: {}\r\n\r\n", self.host);
        stream.write_all(request.as_bytes()).await?;

        let (head, body_prefix) = read_head(stream).await?;
        let (status, reason) = parse_status_line(&head)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "malformed status line"))?;

        if !(200..300).contains(&status) {
            return Ok(Outcome::rejected(self.session, path, status, reason));
        }

        let Some(value) = header_value(&head, "content-length") else {
            return Ok(Outcome::classified(
                self.session,
                path,
                NO_CONTENT_LENGTH,
                "NoContentLength",
            ));
        };
        let Ok(declared) = value.parse::<u64>() else {
            return Ok(Outcome::classified(
                self.session,
                path,
                BAD_CONTENT_LENGTH,
                "BadContentLength",
            ));
        };

        let mut received = body_prefix.len() as u64;
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            if received > declared {
                return Ok(Outcome::classified(
                    self.session,
                    path,
                    MESSAGE_LONG,
                    "MessageLong",
                ));
            }
            if received == declared {
                break;
            }
            let n = stream.read(&mut buf).await?;
            if n == 0 {
                return Ok(Outcome::classified(
                    self.session,
                    path,
                    MESSAGE_SHORT,
                    "MessageShort",
                ));
            }
            received += n as u64;
        }

        Ok(Outcome::ok(
            self.session,
            path,
            received,
            start.elapsed().as_secs_f64(),
        ))
    }
}

/// Reads up to and including the CRLFCRLF terminator, returning the head and
/// any body bytes that arrived with it.
async fn read_head(stream: &mut TcpStream) -> io::Result<(String, Vec<u8>)> {
    let mut head = Vec::new();
    let mut buf = [0u8; 2048];
    loop {
        if let Some(end) = head.windows(4).position(|w| w == b"\r\n\r\n") {
            let body_prefix = head.split_off(end + 4);
            head.truncate(end);
            let head = String::from_utf8_lossy(&head).into_owned();
            return Ok((head, body_prefix));
        }
        if head.len() > MAX_HEAD {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "response head too large",
            ));
        }
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        head.extend_from_slice(&buf[..n]);
    }
}

fn parse_status_line(head: &str) -> Option<(u16, String)> {
    let line = head.lines().next()?;
    let mut parts = line.splitn(3, ' ');
    let _version = parts.next()?;
    let status = parts.next()?.parse().ok()?;
    let reason = parts.next().unwrap_or("").trim();
    let reason = if reason.is_empty() { "-" } else { reason };
    Some((status, reason.to_owned()))
}

fn header_value<'a>(head: &'a str, name: &str) -> Option<&'a str> {
    head.lines().skip(1).find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim().eq_ignore_ascii_case(name).then(|| value.trim())
    })
}
