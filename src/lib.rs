//! Package repository artifact fetcher
//!
//! Downloads one artifact (a catalogue, a package) from a repository into a
//! caller-supplied file. Repositories are either reached directly or through
//! a set of equivalent mirrors discovered from a `_http._tcp` service record.
//!
//! # Example
//!
//! ```no_run
//! use pkg_fetch::fetch::{
//!     fetch, init_transport_runtime, ArtifactDescriptor, MirrorType, NoEvents, Outcome,
//!     Repository, StaticResolver, TransportSession,
//! };
//! use pkg_fetch::config::FetchConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let runtime = init_transport_runtime();
//! let mut repo = Repository::new("FreeBSD", "pkg+http://pkg.FreeBSD.org/FreeBSD:14:amd64/latest")
//!     .with_mirror_type(MirrorType::ServiceRecord);
//! TransportSession::open(&mut repo, &runtime, &StaticResolver::new())?;
//!
//! let dest = std::fs::File::create("packagesite.pkg")?;
//! let mut artifact = ArtifactDescriptor::new(
//!     "pkg+http://pkg.FreeBSD.org/FreeBSD:14:amd64/latest/packagesite.pkg",
//!     0,
//! );
//! match fetch(&mut repo, &mut artifact, &dest, &FetchConfig::default(), &mut NoEvents)? {
//!     Outcome::Fetched => println!("updated"),
//!     Outcome::Unchanged => println!("up to date"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Retry Semantics
//!
//! - `200` writes the body and records the server's `Last-Modified`
//! - `304` leaves the destination untouched
//! - `404` fails immediately
//! - anything else moves to the next mirror until `fetch_retry` attempts are spent

mod core;

pub mod config;
pub mod fetch;

pub use crate::core::output;
pub use fetch::{fetch, fetch_to_path, ArtifactDescriptor, FetchError, Outcome, Repository};
