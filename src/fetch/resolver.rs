//! Service-record resolution.
//!
//! The crate does not talk to DNS itself; callers plug in a resolver. The
//! bundled [`StaticResolver`] serves answers from configuration.

use std::collections::HashMap;

use super::mirror::Host;

/// Resolve a service name such as `_http._tcp.pkg.example.org` into an
/// ordered host list. `None` or an empty list means "no record".
pub trait SrvResolver {
    fn resolve(&self, service: &str) -> Option<Vec<Host>>;
}

impl<F> SrvResolver for F
where
    F: Fn(&str) -> Option<Vec<Host>>,
{
    fn resolve(&self, service: &str) -> Option<Vec<Host>> {
        self(service)
    }
}

/// Resolver backed by a fixed table, usually the `[srv]` config section.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    records: HashMap<String, Vec<Host>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, service: impl Into<String>, hosts: Vec<Host>) {
        self.records.insert(service.into(), hosts);
    }
}

impl FromIterator<(String, Vec<Host>)> for StaticResolver {
    fn from_iter<I: IntoIterator<Item = (String, Vec<Host>)>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl SrvResolver for StaticResolver {
    fn resolve(&self, service: &str) -> Option<Vec<Host>> {
        // DNS names are case-insensitive
        self.records
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(service))
            .map(|(_, hosts)| hosts.clone())
            .filter(|hosts| !hosts.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_resolver_lookup() {
        let mut r = StaticResolver::new();
        r.insert(
            "_http._tcp.pkg.example.org",
            vec![Host::new("a.example.org", 80), Host::new("b.example.org", 8080)],
        );
        let hosts = r.resolve("_http._tcp.PKG.example.org").unwrap();
        assert_eq!(hosts.len(), 2);
        assert_eq!(hosts[1].port, 8080);
        assert!(r.resolve("_http._tcp.other.example.org").is_none());
    }

    #[test]
    fn test_empty_record_is_absent() {
        let r: StaticResolver = [("_http._tcp.x".to_string(), Vec::new())]
            .into_iter()
            .collect();
        assert!(r.resolve("_http._tcp.x").is_none());
    }

    #[test]
    fn test_closure_resolver() {
        let r = |s: &str| (s == "svc").then(|| vec![Host::new("h", 1)]);
        assert_eq!(r.resolve("svc").unwrap(), vec![Host::new("h", 1)]);
        assert!(r.resolve("other").is_none());
    }
}
