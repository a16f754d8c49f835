//! Fetch orchestration: mirror rotation, retries, outcome classification.
//!
//! One call to [`fetch`] walks this state machine:
//!
//! ```text
//! START -> REQUESTING -> SUCCESS | UNCHANGED | FATAL
//!              ^   |
//!              +---+ RETRY (rotate mirror, spend one unit of budget)
//! ```

use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;
use std::time::SystemTime;
use tempfile::NamedTempFile;

use super::artifact::ArtifactDescriptor;
use super::error::{FetchError, SetupError, TransportError};
use super::mirror::MirrorCursor;
use super::progress::{FetchEvents, ProgressReporter};
use super::repo::Repository;
use super::transport::{Completion, Request, TransferHandler};
use crate::config::FetchConfig;
use crate::core::output;

/// Non-fatal terminal result of a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// 200: the destination holds the new content.
    Fetched,
    /// 304: the caller's copy is still current, nothing was written.
    Unchanged,
}

/// Remaining transient failures allowed in one fetch call.
#[derive(Debug, Clone, Copy)]
pub struct RetryBudget {
    remaining: u32,
    attempts: u32,
}

impl RetryBudget {
    pub fn new(retries: u32) -> Self {
        Self {
            remaining: retries,
            attempts: 0,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    fn start_attempt(&mut self) {
        self.attempts += 1;
    }

    /// Spend one unit after a failure. `false` once the budget is gone.
    fn consume(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining > 0
    }
}

/// Classified result of one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Success(Option<SystemTime>),
    Unchanged,
    NotFound,
    Retry(String),
}

fn classify(result: Result<Completion, TransportError>) -> Step {
    match result {
        Ok(done) => match done.status {
            200 => Step::Success(done.last_modified),
            304 => Step::Unchanged,
            404 => Step::NotFound,
            status => Step::Retry(format!("HTTP status {status}")),
        },
        Err(e) => Step::Retry(e.to_string()),
    }
}

/// Per-attempt state handed to the transport as its callback target.
struct FetchAttemptState<'a> {
    sink: BufWriter<&'a mut File>,
    bytes_written: u64,
    total_bytes: u64,
    response_code: Option<u16>,
    progress: ProgressReporter<'a>,
}

impl<'a> FetchAttemptState<'a> {
    fn new(sink: &'a mut File, events: &'a mut dyn FetchEvents, url: &'a str) -> Self {
        Self {
            sink: BufWriter::new(sink),
            bytes_written: 0,
            total_bytes: 0,
            response_code: None,
            progress: ProgressReporter::new(events, url),
        }
    }

    fn confirmed(&self) -> bool {
        self.response_code == Some(200)
    }

    /// Flush buffered bytes. Returns bytes written and the reported total.
    fn finish(mut self) -> io::Result<(u64, u64)> {
        self.sink.flush()?;
        Ok((self.bytes_written, self.total_bytes))
    }
}

impl TransferHandler for FetchAttemptState<'_> {
    fn on_response(&mut self, status: u16) {
        self.response_code = Some(status);
        if status == 200 {
            self.progress.begin();
        }
    }

    fn on_data(&mut self, chunk: &[u8]) -> io::Result<()> {
        // error bodies are not content
        if !self.confirmed() {
            return Ok(());
        }
        self.sink.write_all(chunk)?;
        self.bytes_written += chunk.len() as u64;
        Ok(())
    }

    fn on_progress(&mut self, downloaded: u64, total: u64) {
        self.total_bytes = total;
        if self.confirmed() {
            self.progress.tick(downloaded, total);
        }
    }
}

fn rewind(sink: &mut File) -> io::Result<()> {
    sink.set_len(0)?;
    sink.seek(SeekFrom::Start(0))?;
    Ok(())
}

/// Fetch `artifact` from `repo` into `destination`.
///
/// The repository must have an open session. `destination` must be a
/// writable file positioned at its start; it is truncated between attempts
/// so that on [`Outcome::Fetched`] it holds exactly the transferred bytes.
/// On success `artifact.last_modified` is replaced with the server-reported
/// modification time.
///
/// 404 is fatal at once. Any other failure spends one unit of
/// `config.fetch_retry` and moves to the next mirror candidate; the fetch
/// fails when the budget runs out.
pub fn fetch(
    repo: &mut Repository,
    artifact: &mut ArtifactDescriptor,
    destination: &File,
    config: &FetchConfig,
    events: &mut dyn FetchEvents,
) -> Result<Outcome, FetchError> {
    let verbosity = config.debug_level;
    let mut sink = destination
        .try_clone()
        .map_err(SetupError::Destination)?;

    let Repository {
        name,
        mirror_type,
        srv,
        timeout,
        session,
        ..
    } = repo;
    let session = session
        .as_mut()
        .ok_or_else(|| SetupError::NoSession(name.clone()))?;

    let mut cursor = MirrorCursor::new(
        *mirror_type,
        srv.as_deref(),
        session.base_url(),
        &artifact.url,
    )?;
    let mut budget = RetryBudget::new(config.fetch_retry);
    let mut dirty = false;

    output::debug(verbosity, 1, &format!("fetching {}", artifact.url));

    loop {
        budget.start_attempt();

        let (target, step) = match cursor.next_candidate() {
            Err(reason) => (artifact.url.clone(), Step::Retry(reason)),
            Ok(url) => {
                if dirty {
                    rewind(&mut sink).map_err(FetchError::Write)?;
                }
                output::debug(
                    verbosity,
                    2,
                    &format!(
                        "attempt {} -> {} (mtime {:?})",
                        budget.attempts(),
                        url,
                        artifact.last_modified
                    ),
                );

                let request = Request {
                    url: &url,
                    if_modified_since: artifact.last_modified,
                    timeout: *timeout,
                    expected_size: artifact.expected_size,
                };
                let mut state = FetchAttemptState::new(&mut sink, &mut *events, &artifact.url);
                let result = session.transport().execute(&request, &mut state);
                let step = match state.finish() {
                    Ok((written, total)) => {
                        dirty = written > 0;
                        output::debug(verbosity, 2, &format!("{written}/{total} bytes written"));
                        classify(result)
                    }
                    Err(e) => {
                        dirty = true;
                        Step::Retry(format!("write error: {e}"))
                    }
                };
                (url.to_string(), step)
            }
        };

        match step {
            Step::Success(mtime) => {
                artifact.last_modified = mtime;
                output::debug(verbosity, 1, &format!("fetched {target}"));
                return Ok(Outcome::Fetched);
            }
            Step::Unchanged => {
                output::debug(verbosity, 1, &format!("{target} unchanged"));
                return Ok(Outcome::Unchanged);
            }
            Step::NotFound => {
                discard(&mut sink, dirty);
                return Err(FetchError::NotFound { url: target });
            }
            Step::Retry(reason) => {
                output::debug(
                    verbosity,
                    1,
                    &format!("attempt {} on {target} failed: {reason}", budget.attempts()),
                );
                if !budget.consume() {
                    discard(&mut sink, dirty);
                    return Err(FetchError::RetriesExhausted {
                        url: artifact.url.clone(),
                        attempts: budget.attempts(),
                        reason,
                    });
                }
            }
        }
    }
}

/// Fetch `artifact` into the file at `dest`, replacing it only on success.
///
/// The transfer goes to a temporary file in the same directory, which is
/// renamed over `dest` on [`Outcome::Fetched`]. On [`Outcome::Unchanged`] or
/// an error `dest` is left as it was, so a cached copy stays usable.
pub fn fetch_to_path(
    repo: &mut Repository,
    artifact: &mut ArtifactDescriptor,
    dest: &Path,
    config: &FetchConfig,
    events: &mut dyn FetchEvents,
) -> Result<Outcome, FetchError> {
    let dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let staging = NamedTempFile::new_in(dir).map_err(SetupError::Destination)?;

    let outcome = fetch(repo, artifact, staging.as_file(), config, events)?;
    if outcome == Outcome::Fetched {
        staging
            .persist(dest)
            .map_err(|e| FetchError::Write(e.error))?;
    }
    Ok(outcome)
}

/// Drop partial content left by a failed attempt. `false` if some may remain.
fn discard(sink: &mut File, dirty: bool) -> bool {
    if !dirty {
        return true;
    }
    match rewind(sink) {
        Ok(()) => true,
        Err(e) => {
            output::warning(&format!("partial download left in destination: {e}"));
            false
        }
    }
}
