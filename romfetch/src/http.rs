//! HTTP client abstraction for testability.
//!
//! Every component that talks to the network receives an `Arc<dyn HttpClient>`
//! instead of building its own session, so tests can substitute an in-memory
//! implementation and the real client is constructed exactly once.

use std::io::Read;
use std::time::Duration;

use reqwest::header::{CONTENT_RANGE, RANGE};
use thiserror::Error;

/// Default timeout for establishing a connection.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default user agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!("romfetch/", env!("CARGO_PKG_VERSION"));

/// Result type for HTTP operations.
pub type HttpResult<T> = Result<T, HttpError>;

/// Errors raised by an [`HttpClient`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HttpError {
    /// The underlying client could not be constructed.
    #[error("failed to create HTTP client: {0}")]
    ClientBuild(String),

    /// The request did not complete within its timeout.
    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// The request could not be sent or the connection failed.
    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// The response body could not be read.
    #[error("failed to read response from {url}: {reason}")]
    Body { url: String, reason: String },
}

/// Parsed `Content-Range` response header.
///
/// Covers both `bytes <start>-<end>/<total>` and the unsatisfied-range form
/// `bytes */<total>`. A total of `*` (unknown) parses as `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    /// Inclusive byte range carried by this response, if any.
    pub range: Option<(u64, u64)>,
    /// Complete length of the resource, if the server reported it.
    pub total: Option<u64>,
}

impl ContentRange {
    /// Parse a `Content-Range` header value.
    pub fn parse(value: &str) -> Option<Self> {
        let rest = value.trim().strip_prefix("bytes")?.trim_start();
        let (range, total) = rest.split_once('/')?;

        let total = match total.trim() {
            "*" => None,
            t => Some(t.parse().ok()?),
        };

        let range = match range.trim() {
            "*" => None,
            r => {
                let (start, end) = r.split_once('-')?;
                Some((start.trim().parse().ok()?, end.trim().parse().ok()?))
            }
        };

        Some(Self { range, total })
    }

    /// First byte offset carried by the response.
    pub fn start(&self) -> Option<u64> {
        self.range.map(|(start, _)| start)
    }
}

/// A streaming response opened for a download.
///
/// Unlike [`HttpClient::get`], opening a body never fails on HTTP status: the
/// caller decides what a `206`, `200` or `416` means for its resume state.
pub struct RemoteBody {
    /// HTTP status code.
    pub status: u16,
    /// Value of `Content-Length`, i.e. the bytes this body will carry.
    pub content_length: Option<u64>,
    /// Parsed `Content-Range`, present on partial and unsatisfiable responses.
    pub content_range: Option<ContentRange>,
    /// The response body.
    pub body: Box<dyn Read + Send>,
}

impl RemoteBody {
    /// True for any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl std::fmt::Debug for RemoteBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteBody")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .field("content_range", &self.content_range)
            .finish_non_exhaustive()
    }
}

/// Trait for HTTP client operations.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling mock HTTP clients in tests.
pub trait HttpClient: Send + Sync {
    /// Performs a bounded HTTP GET and returns the full body.
    ///
    /// Non-success statuses are reported as [`HttpError::Status`].
    fn get(&self, url: &str, timeout: Duration) -> HttpResult<Vec<u8>>;

    /// Opens a streaming GET, optionally asking for the bytes from `range_start`
    /// onwards via a `Range` header.
    fn open(&self, url: &str, range_start: Option<u64>) -> HttpResult<RemoteBody>;
}

/// Real HTTP client implementation using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Creates a client with the default connect timeout and user agent.
    pub fn new() -> HttpResult<Self> {
        Self::with_settings(
            Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            DEFAULT_USER_AGENT,
        )
    }

    /// Creates a client with a custom connect timeout and user agent.
    ///
    /// No overall request timeout is set on the client: listing fetches set a
    /// per-request timeout, while downloads of large files must not be cut off.
    pub fn with_settings(connect_timeout: Duration, user_agent: &str) -> HttpResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(None::<Duration>)
            .user_agent(user_agent)
            .build()
            .map_err(|e| HttpError::ClientBuild(e.to_string()))?;

        Ok(Self { client })
    }

    fn map_send_error(url: &str, e: reqwest::Error) -> HttpError {
        if e.is_timeout() {
            HttpError::Timeout {
                url: url.to_string(),
            }
        } else {
            HttpError::Request {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str, timeout: Duration) -> HttpResult<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .map_err(|e| Self::map_send_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| HttpError::Body {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    fn open(&self, url: &str, range_start: Option<u64>) -> HttpResult<RemoteBody> {
        let mut request = self.client.get(url);
        if let Some(offset) = range_start {
            request = request.header(RANGE, format!("bytes={}-", offset));
        }

        let response = request.send().map_err(|e| Self::map_send_error(url, e))?;

        let content_range = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(ContentRange::parse);

        Ok(RemoteBody {
            status: response.status().as_u16(),
            content_length: response.content_length(),
            content_range,
            body: Box::new(response),
        })
    }
}

/// In-memory [`HttpClient`] used by unit tests across the crate.
#[cfg(test)]
pub(crate) mod mock {
    use std::collections::HashMap;
    use std::io::{self, Cursor, Read};
    use std::time::Duration;

    use parking_lot::Mutex;

    use super::{ContentRange, HttpClient, HttpError, HttpResult, RemoteBody};

    #[derive(Clone)]
    enum Behaviour {
        /// Full body for `get`, range-aware for `open`.
        Serve { data: Vec<u8>, honour_range: bool },
        /// Stream `limit` bytes of the remaining body, then fail.
        FailAfter { data: Vec<u8>, limit: usize },
        /// Answer every request with this status.
        Status(u16),
        /// Connection-level failure.
        Unreachable,
    }

    /// Reader that yields a prefix of its data and then errors.
    struct FailingReader {
        inner: Cursor<Vec<u8>>,
        remaining: usize,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.remaining == 0 {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset"));
            }
            let max = buf.len().min(self.remaining);
            let n = self.inner.read(&mut buf[..max])?;
            self.remaining -= n;
            Ok(n)
        }
    }

    #[derive(Default)]
    pub struct MockHttpClient {
        routes: Mutex<HashMap<String, Behaviour>>,
        requests: Mutex<Vec<(String, Option<u64>)>>,
    }

    impl MockHttpClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn serve(self, url: &str, data: impl Into<Vec<u8>>) -> Self {
            self.route(url, Behaviour::Serve { data: data.into(), honour_range: true })
        }

        pub fn serve_ignoring_range(self, url: &str, data: impl Into<Vec<u8>>) -> Self {
            self.route(url, Behaviour::Serve { data: data.into(), honour_range: false })
        }

        pub fn fail_after(self, url: &str, data: impl Into<Vec<u8>>, limit: usize) -> Self {
            self.route(url, Behaviour::FailAfter { data: data.into(), limit })
        }

        pub fn status(self, url: &str, status: u16) -> Self {
            self.route(url, Behaviour::Status(status))
        }

        pub fn unreachable(self, url: &str) -> Self {
            self.route(url, Behaviour::Unreachable)
        }

        /// Swap the behaviour of an existing route.
        pub fn set_serve(&self, url: &str, data: impl Into<Vec<u8>>) {
            self.routes.lock().insert(
                url.to_string(),
                Behaviour::Serve { data: data.into(), honour_range: true },
            );
        }

        pub fn request_count(&self, url: &str) -> usize {
            self.requests.lock().iter().filter(|(u, _)| u == url).count()
        }

        pub fn requests(&self) -> Vec<(String, Option<u64>)> {
            self.requests.lock().clone()
        }

        fn route(self, url: &str, behaviour: Behaviour) -> Self {
            self.routes.lock().insert(url.to_string(), behaviour);
            self
        }

        fn lookup(&self, url: &str, range_start: Option<u64>) -> Option<Behaviour> {
            self.requests.lock().push((url.to_string(), range_start));
            self.routes.lock().get(url).cloned()
        }
    }

    fn ranged(data: Vec<u8>, range_start: Option<u64>) -> RemoteBody {
        let len = data.len() as u64;
        match range_start {
            Some(offset) if offset >= len => RemoteBody {
                status: 416,
                content_length: Some(0),
                content_range: Some(ContentRange { range: None, total: Some(len) }),
                body: Box::new(io::empty()),
            },
            Some(offset) => RemoteBody {
                status: 206,
                content_length: Some(len - offset),
                content_range: Some(ContentRange {
                    range: Some((offset, len - 1)),
                    total: Some(len),
                }),
                body: Box::new(Cursor::new(data[offset as usize..].to_vec())),
            },
            None => RemoteBody {
                status: 200,
                content_length: Some(len),
                content_range: None,
                body: Box::new(Cursor::new(data)),
            },
        }
    }

    impl HttpClient for MockHttpClient {
        fn get(&self, url: &str, _timeout: Duration) -> HttpResult<Vec<u8>> {
            match self.lookup(url, None) {
                Some(Behaviour::Serve { data, .. }) => Ok(data),
                Some(Behaviour::FailAfter { .. }) => Err(HttpError::Body {
                    url: url.to_string(),
                    reason: "connection reset".to_string(),
                }),
                Some(Behaviour::Status(status)) => Err(HttpError::Status {
                    url: url.to_string(),
                    status,
                }),
                Some(Behaviour::Unreachable) => Err(HttpError::Request {
                    url: url.to_string(),
                    reason: "connection refused".to_string(),
                }),
                None => Err(HttpError::Status {
                    url: url.to_string(),
                    status: 404,
                }),
            }
        }

        fn open(&self, url: &str, range_start: Option<u64>) -> HttpResult<RemoteBody> {
            match self.lookup(url, range_start) {
                Some(Behaviour::Serve { data, honour_range: true }) => Ok(ranged(data, range_start)),
                Some(Behaviour::Serve { data, honour_range: false }) => Ok(ranged(data, None)),
                Some(Behaviour::FailAfter { data, limit }) => {
                    let mut body = ranged(data, range_start);
                    let mut rest = Vec::new();
                    body.body.read_to_end(&mut rest).ok();
                    body.body = Box::new(FailingReader {
                        inner: Cursor::new(rest),
                        remaining: limit,
                    });
                    Ok(body)
                }
                Some(Behaviour::Status(status)) => Ok(RemoteBody {
                    status,
                    content_length: Some(0),
                    content_range: None,
                    body: Box::new(io::empty()),
                }),
                Some(Behaviour::Unreachable) => Err(HttpError::Request {
                    url: url.to_string(),
                    reason: "connection refused".to_string(),
                }),
                None => Ok(RemoteBody {
                    status: 404,
                    content_length: Some(0),
                    content_range: None,
                    body: Box::new(io::empty()),
                }),
            }
        }
    }
}
