//! Transport engine seam and the default ureq-backed engine.
//!
//! An engine executes one request to completion on the calling thread and
//! reports back through a [`TransferHandler`]: once when the response status
//! is known, once per received chunk, and periodically with progress.

use std::io::{self, Read};
use std::time::{Duration, Instant, SystemTime};
use url::Url;

use super::error::TransportError;
use super::runtime::TransportRuntime;

/// One request as seen by the engine.
#[derive(Debug, Clone)]
pub struct Request<'a> {
    pub url: &'a Url,
    /// Sent as `If-Modified-Since` when set.
    pub if_modified_since: Option<SystemTime>,
    /// Bound on the whole request, not just connection setup.
    pub timeout: Option<Duration>,
    /// Progress total reported when the server sends no length.
    pub expected_size: u64,
}

/// Callbacks invoked by [`Transport::execute`].
pub trait TransferHandler {
    /// Final response status, before any body bytes.
    fn on_response(&mut self, status: u16);

    /// A chunk of body bytes.
    fn on_data(&mut self, chunk: &[u8]) -> io::Result<()>;

    /// Periodic progress, plus one final call when the body is complete.
    fn on_progress(&mut self, downloaded: u64, total: u64);
}

/// What the engine learned once the transfer finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub status: u16,
    /// Parsed `Last-Modified` header.
    pub last_modified: Option<SystemTime>,
}

pub trait Transport {
    fn execute(
        &mut self,
        request: &Request<'_>,
        handler: &mut dyn TransferHandler,
    ) -> Result<Completion, TransportError>;
}

const CHUNK_SIZE: usize = 16 * 1024;

/// Blocking HTTP engine built on a per-session `ureq::Agent`.
pub struct UreqTransport {
    agent: ureq::Agent,
    poll_interval: Duration,
}

impl UreqTransport {
    pub fn new(runtime: &TransportRuntime) -> Self {
        let agent = ureq::AgentBuilder::new()
            .user_agent(runtime.user_agent())
            .redirects(runtime.max_redirects())
            .max_idle_connections_per_host(1)
            .build();
        Self {
            agent,
            poll_interval: runtime.poll_interval(),
        }
    }
}

impl Transport for UreqTransport {
    fn execute(
        &mut self,
        request: &Request<'_>,
        handler: &mut dyn TransferHandler,
    ) -> Result<Completion, TransportError> {
        let mut req = self.agent.request_url("GET", request.url);
        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }
        if let Some(since) = request.if_modified_since {
            req = req.set("If-Modified-Since", &httpdate::fmt_http_date(since));
        }

        let response = match req.call() {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                handler.on_response(status);
                return Ok(Completion {
                    status,
                    last_modified: last_modified(&response),
                });
            }
            Err(e) => return Err(TransportError::Connect(e.to_string())),
        };

        let status = response.status();
        handler.on_response(status);
        let mtime = last_modified(&response);
        let total = response
            .header("Content-Length")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(request.expected_size);

        let mut reader = response.into_reader();
        let mut buffer = vec![0u8; CHUNK_SIZE];
        let mut downloaded = 0u64;
        let mut last_tick = Instant::now();

        loop {
            let n = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(TransportError::Read(e)),
            };
            handler
                .on_data(&buffer[..n])
                .map_err(TransportError::Write)?;
            downloaded += n as u64;

            if last_tick.elapsed() >= self.poll_interval {
                last_tick = Instant::now();
                handler.on_progress(downloaded, total.max(downloaded));
            }
        }

        handler.on_progress(downloaded, total.max(downloaded));

        Ok(Completion {
            status,
            last_modified: mtime,
        })
    }
}

fn last_modified(response: &ureq::Response) -> Option<SystemTime> {
    response
        .header("Last-Modified")
        .and_then(|v| httpdate::parse_http_date(v).ok())
}
