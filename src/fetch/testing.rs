//! In-memory transport for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use super::error::TransportError;
use super::transport::{Completion, Request, TransferHandler, Transport};

#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Status {
        status: u16,
        body: Vec<u8>,
        last_modified: Option<SystemTime>,
    },
    /// Connection-level failure before any response.
    Fail(String),
    /// 200 response whose body breaks off after `sent` bytes.
    Truncated { sent: Vec<u8> },
}

impl Reply {
    pub(crate) fn status(status: u16) -> Self {
        Reply::Status {
            status,
            body: Vec::new(),
            last_modified: None,
        }
    }

    pub(crate) fn ok(body: &[u8], last_modified: Option<SystemTime>) -> Self {
        Reply::Status {
            status: 200,
            body: body.to_vec(),
            last_modified,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Seen {
    pub url: String,
    pub if_modified_since: Option<SystemTime>,
    pub timeout: Option<Duration>,
}

/// Plays back replies in order; the last reply repeats forever.
pub(crate) struct ScriptedTransport {
    replies: VecDeque<Reply>,
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl ScriptedTransport {
    pub(crate) fn new(replies: Vec<Reply>) -> (Self, Arc<Mutex<Vec<Seen>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                replies: replies.into(),
                seen: Arc::clone(&seen),
            },
            seen,
        )
    }

    pub(crate) fn boxed_empty() -> Box<dyn Transport + Send> {
        Box::new(Self::new(vec![Reply::Fail("unscripted".into())]).0)
    }

    fn next_reply(&mut self) -> Reply {
        if self.replies.len() > 1 {
            self.replies.pop_front().unwrap_or_else(|| Reply::Fail("empty".into()))
        } else {
            self.replies
                .front()
                .cloned()
                .unwrap_or_else(|| Reply::Fail("empty".into()))
        }
    }
}

impl Transport for ScriptedTransport {
    fn execute(
        &mut self,
        request: &Request<'_>,
        handler: &mut dyn TransferHandler,
    ) -> Result<Completion, TransportError> {
        self.seen.lock().unwrap().push(Seen {
            url: request.url.to_string(),
            if_modified_since: request.if_modified_since,
            timeout: request.timeout,
        });

        match self.next_reply() {
            Reply::Fail(msg) => Err(TransportError::Connect(msg)),
            Reply::Truncated { sent } => {
                handler.on_response(200);
                handler.on_data(&sent).map_err(TransportError::Write)?;
                handler.on_progress(sent.len() as u64, request.expected_size);
                Err(TransportError::Read(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "connection reset",
                )))
            }
            Reply::Status {
                status,
                body,
                last_modified,
            } => {
                handler.on_response(status);
                let total = body.len() as u64;
                let mut downloaded = 0u64;
                // two chunks so progress sees intermediate values
                let mid = body.len() / 2;
                for chunk in [&body[..mid], &body[mid..]] {
                    if chunk.is_empty() {
                        continue;
                    }
                    handler.on_data(chunk).map_err(TransportError::Write)?;
                    downloaded += chunk.len() as u64;
                    handler.on_progress(downloaded, total);
                }
                handler.on_progress(downloaded, total);
                Ok(Completion {
                    status,
                    last_modified,
                })
            }
        }
    }
}
