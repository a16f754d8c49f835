//! Per-repository transport session lifecycle.

use std::fmt;
use url::Url;

use super::error::SetupError;
use super::mirror::{self, MirrorType};
use super::repo::Repository;
use super::resolver::SrvResolver;
use super::runtime::{SessionTicket, TransportRuntime};
use super::transport::{Transport, UreqTransport};
use crate::core::output;

/// Reusable engine state for one repository.
///
/// Holds the engine (and with it the connection pool) plus, in
/// service-record mode, the parsed repository URL used as the template for
/// every mirror request.
pub struct TransportSession {
    transport: Box<dyn Transport + Send>,
    base_url: Option<Url>,
    _ticket: Option<SessionTicket>,
}

impl fmt::Debug for TransportSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportSession")
            .field("base_url", &self.base_url.as_ref().map(Url::as_str))
            .finish_non_exhaustive()
    }
}

impl TransportSession {
    /// Open the session for `repo` with the default ureq engine.
    ///
    /// Idempotent: an existing session is left untouched, nothing is
    /// re-resolved or reallocated.
    pub fn open(
        repo: &mut Repository,
        runtime: &TransportRuntime,
        resolver: &dyn SrvResolver,
    ) -> Result<(), SetupError> {
        if repo.session.is_some() {
            return Ok(());
        }
        let transport = Box::new(UreqTransport::new(runtime));
        establish(repo, resolver, transport, Some(runtime.register_session()))
    }

    /// Open the session with a caller-supplied engine.
    ///
    /// `make_transport` only runs when no session exists yet.
    pub fn open_with<F>(
        repo: &mut Repository,
        resolver: &dyn SrvResolver,
        make_transport: F,
    ) -> Result<(), SetupError>
    where
        F: FnOnce() -> Box<dyn Transport + Send>,
    {
        if repo.session.is_some() {
            return Ok(());
        }
        establish(repo, resolver, make_transport(), None)
    }

    /// Release engine and URL state. No-op without a session.
    pub fn close(repo: &mut Repository) {
        repo.session = None;
    }

    pub(crate) fn transport(&mut self) -> &mut (dyn Transport + Send) {
        self.transport.as_mut()
    }

    pub(crate) fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }
}

fn establish(
    repo: &mut Repository,
    resolver: &dyn SrvResolver,
    transport: Box<dyn Transport + Send>,
    ticket: Option<SessionTicket>,
) -> Result<(), SetupError> {
    let mut base_url = None;

    if repo.mirror_type == MirrorType::ServiceRecord {
        let url = mirror::parse_url(&repo.url)?;
        let host = url
            .host_str()
            .ok_or_else(|| SetupError::MissingHost(repo.url.clone()))?
            .to_string();

        if repo.srv.is_none() {
            let zone = mirror::service_name(&host);
            match resolver.resolve(&zone).filter(|hosts| !hosts.is_empty()) {
                Some(hosts) => repo.srv = Some(hosts),
                None => {
                    output::error(&format!(
                        "No SRV record found for the repo '{}'",
                        repo.name
                    ));
                    repo.mirror_type = MirrorType::Direct;
                }
            }
        }

        if repo.mirror_type == MirrorType::ServiceRecord {
            base_url = Some(url);
        }
    }

    repo.session = Some(TransportSession {
        transport,
        base_url,
        _ticket: ticket,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::mirror::Host;
    use crate::fetch::testing::ScriptedTransport;
    use std::cell::Cell;

    fn srv_repo() -> Repository {
        Repository::new("FreeBSD", "pkg+http://pkg.example.org/FreeBSD:14:amd64/latest")
            .with_mirror_type(MirrorType::ServiceRecord)
    }

    #[test]
    fn test_open_resolves_service_record() {
        let mut repo = srv_repo();
        let asked = Cell::new(String::new());
        let resolver = |s: &str| {
            asked.set(s.to_string());
            Some(vec![Host::new("a.example.org", 80)])
        };

        TransportSession::open_with(&mut repo, &resolver, ScriptedTransport::boxed_empty).unwrap();

        assert_eq!(asked.take(), "_http._tcp.pkg.example.org");
        assert_eq!(repo.srv, Some(vec![Host::new("a.example.org", 80)]));
        assert_eq!(repo.mirror_type, MirrorType::ServiceRecord);
        let base = repo.session.as_ref().unwrap().base_url().unwrap();
        assert_eq!(base.scheme(), "http");
    }

    #[test]
    fn test_open_is_idempotent() {
        let mut repo = srv_repo();
        let lookups = Cell::new(0);
        let engines = Cell::new(0);
        let resolver = |_: &str| {
            lookups.set(lookups.get() + 1);
            Some(vec![Host::new("a.example.org", 80)])
        };
        let make = || {
            engines.set(engines.get() + 1);
            ScriptedTransport::boxed_empty()
        };

        TransportSession::open_with(&mut repo, &resolver, make).unwrap();
        TransportSession::open_with(&mut repo, &resolver, || {
            engines.set(engines.get() + 1);
            ScriptedTransport::boxed_empty()
        })
        .unwrap();

        assert_eq!(lookups.get(), 1);
        assert_eq!(engines.get(), 1);
    }

    #[test]
    fn test_missing_record_degrades_to_direct() {
        let mut repo = srv_repo();
        let resolver = |_: &str| -> Option<Vec<Host>> { None };

        TransportSession::open_with(&mut repo, &resolver, ScriptedTransport::boxed_empty).unwrap();

        assert_eq!(repo.mirror_type, MirrorType::Direct);
        assert!(repo.srv.is_none());
        assert!(repo.has_session());
        assert!(repo.session.as_ref().unwrap().base_url().is_none());
    }

    #[test]
    fn test_empty_record_degrades_to_direct() {
        let mut repo = srv_repo();
        let resolver = |_: &str| -> Option<Vec<Host>> { Some(Vec::new()) };

        TransportSession::open_with(&mut repo, &resolver, ScriptedTransport::boxed_empty).unwrap();

        assert_eq!(repo.mirror_type, MirrorType::Direct);
    }

    #[test]
    fn test_preconfigured_candidates_skip_resolution() {
        let mut repo = srv_repo().with_srv(vec![Host::new("static.example.org", 8080)]);
        let resolver = |_: &str| -> Option<Vec<Host>> { panic!("must not resolve") };

        TransportSession::open_with(&mut repo, &resolver, ScriptedTransport::boxed_empty).unwrap();

        assert!(repo.session.as_ref().unwrap().base_url().is_some());
    }

    #[test]
    fn test_direct_repo_never_resolves() {
        let mut repo = Repository::new("local", "http://pkg.example.org/latest");
        let resolver = |_: &str| -> Option<Vec<Host>> { panic!("must not resolve") };

        TransportSession::open_with(&mut repo, &resolver, ScriptedTransport::boxed_empty).unwrap();

        assert!(repo.has_session());
    }

    #[test]
    fn test_unparseable_srv_url_is_setup_error() {
        let mut repo = Repository::new("broken", "pkg+::not a url")
            .with_mirror_type(MirrorType::ServiceRecord);
        let resolver = |_: &str| -> Option<Vec<Host>> { None };

        let err = TransportSession::open_with(&mut repo, &resolver, ScriptedTransport::boxed_empty)
            .unwrap_err();

        assert!(matches!(err, SetupError::InvalidUrl { .. }));
        assert!(!repo.has_session());
    }

    #[test]
    fn test_close_without_session_is_noop() {
        let mut repo = Repository::new("local", "http://pkg.example.org/latest");
        repo.close();
        repo.close();
        assert!(!repo.has_session());
    }

    #[test]
    fn test_open_registers_with_runtime() {
        let rt = crate::fetch::runtime::init_transport_runtime();
        let mut repo = Repository::new("local", "http://pkg.example.org/latest");
        let resolver = |_: &str| -> Option<Vec<Host>> { None };

        TransportSession::open(&mut repo, &rt, &resolver).unwrap();
        TransportSession::open(&mut repo, &rt, &resolver).unwrap();
        assert_eq!(rt.live_sessions(), 1);

        repo.close();
        assert_eq!(rt.live_sessions(), 0);
    }
}
