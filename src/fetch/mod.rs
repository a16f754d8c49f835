//! Artifact fetching with mirror failover.
//!
//! A [`Repository`] gets a [`TransportSession`] once; every [`fetch`] on it
//! then reuses that session, rotates through service-record mirrors when
//! configured, and ends in [`Outcome::Fetched`], [`Outcome::Unchanged`] or a
//! [`FetchError`].

mod artifact;
mod error;
mod mirror;
mod operation;
mod progress;
mod repo;
mod resolver;
mod runtime;
mod session;
mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use artifact::ArtifactDescriptor;
pub use error::{ConfigError, FetchError, SetupError, TransportError};
pub use mirror::{parse_url, service_name, Host, MirrorCursor, MirrorType};
pub use operation::{fetch, fetch_to_path, Outcome, RetryBudget};
pub use progress::{ConsoleEvents, FetchEvent, FetchEvents, NoEvents, ProgressReporter};
pub use repo::Repository;
pub use resolver::{SrvResolver, StaticResolver};
pub use runtime::{init_transport_runtime, shutdown_transport_runtime, TransportRuntime};
pub use session::TransportSession;
pub use transport::{Completion, Request, TransferHandler, Transport, UreqTransport};
