//! Repository description and ownership of its transport session.

use std::time::Duration;

use super::mirror::{Host, MirrorType};
use super::session::TransportSession;

/// A package repository reachable through one or more equivalent endpoints.
///
/// The repository owns its [`TransportSession`]; the session is created by
/// [`TransportSession::open`] and torn down by [`Repository::close`] or when
/// the repository is dropped.
#[derive(Debug)]
pub struct Repository {
    pub name: String,
    pub url: String,
    pub mirror_type: MirrorType,
    /// Resolved or statically configured mirror candidates.
    pub srv: Option<Vec<Host>>,
    /// Bound on each whole request to this repository.
    pub timeout: Option<Duration>,
    pub(crate) session: Option<TransportSession>,
}

impl Repository {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            mirror_type: MirrorType::Direct,
            srv: None,
            timeout: None,
            session: None,
        }
    }

    pub fn with_mirror_type(mut self, mirror_type: MirrorType) -> Self {
        self.mirror_type = mirror_type;
        self
    }

    pub fn with_srv(mut self, hosts: Vec<Host>) -> Self {
        self.srv = Some(hosts);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Release the transport session. Safe to call when none is open.
    pub fn close(&mut self) {
        TransportSession::close(self);
    }
}
