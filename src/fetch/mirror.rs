//! Mirror strategies and per-fetch candidate rotation.

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use url::Url;

use super::error::SetupError;

/// How a repository is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MirrorType {
    /// The artifact URL is used as-is.
    #[default]
    #[serde(alias = "none")]
    Direct,
    /// Hosts come from a `_http._tcp.<host>` service-record lookup.
    #[serde(rename = "srv")]
    ServiceRecord,
    /// Declared for HTTP mirror lists; currently fetched like `Direct`.
    #[serde(rename = "http")]
    HttpList,
}

impl fmt::Display for MirrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Direct => "none",
            Self::ServiceRecord => "srv",
            Self::HttpList => "http",
        })
    }
}

/// One mirror endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Host {
    pub host: String,
    pub port: u16,
}

impl Host {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for Host {
    type Err = String;

    /// Parse `host:port`. The port is mandatory.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| format!("expected host:port, got '{s}'"))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(format!("empty host in '{s}'"));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| format!("invalid port in '{s}'"))?;
        Ok(Self::new(host, port))
    }
}

/// Strip the optional `pkg+` scheme prefix (case-insensitive).
pub fn strip_pkg_scheme(url: &str) -> &str {
    match url.get(..4) {
        Some(prefix) if prefix.eq_ignore_ascii_case("pkg+") => &url[4..],
        _ => url,
    }
}

/// Parse a repository or artifact URL, accepting the `pkg+` prefix.
pub fn parse_url(raw: &str) -> Result<Url, SetupError> {
    Url::parse(strip_pkg_scheme(raw)).map_err(|source| SetupError::InvalidUrl {
        url: raw.to_string(),
        source,
    })
}

/// Service name looked up for a repository host.
pub fn service_name(host: &str) -> String {
    format!("_http._tcp.{host}")
}

/// Operation-local rotation state.
///
/// Created once per top-level fetch. The first `next_candidate` returns index
/// 0, each later call advances by one with wraparound. Direct fetches always
/// return the artifact URL.
#[derive(Debug)]
pub struct MirrorCursor<'a> {
    target: Target<'a>,
    index: Option<usize>,
}

#[derive(Debug)]
enum Target<'a> {
    Direct(Url),
    Srv { url: Url, candidates: &'a [Host] },
}

impl<'a> MirrorCursor<'a> {
    /// Build the cursor for one fetch.
    ///
    /// In service-record mode the artifact path is copied onto `template`
    /// once here; rotation only touches host and port afterwards.
    pub fn new(
        mirror_type: MirrorType,
        candidates: Option<&'a [Host]>,
        template: Option<&Url>,
        artifact_url: &str,
    ) -> Result<Self, SetupError> {
        let artifact = parse_url(artifact_url)?;

        let target = match (mirror_type, candidates, template) {
            (MirrorType::ServiceRecord, Some(candidates), Some(template))
                if !candidates.is_empty() =>
            {
                let mut url = template.clone();
                url.set_path(artifact.path());
                Target::Srv { url, candidates }
            }
            _ => Target::Direct(artifact),
        };

        Ok(Self {
            target,
            index: None,
        })
    }

    /// Advance to the next candidate and return the URL to request.
    ///
    /// Fails only when a resolved host cannot be applied to the URL; the
    /// caller treats that like any transient failure.
    pub fn next_candidate(&mut self) -> Result<Url, String> {
        match &mut self.target {
            Target::Direct(url) => {
                self.index = Some(0);
                Ok(url.clone())
            }
            Target::Srv { url, candidates } => {
                let candidates: &[Host] = candidates;
                let next = match self.index {
                    None => 0,
                    Some(i) => (i + 1) % candidates.len(),
                };
                self.index = Some(next);

                let host = &candidates[next];
                let name = if host.host.contains(':') {
                    format!("[{}]", host.host)
                } else {
                    host.host.clone()
                };
                url.set_host(Some(&name))
                    .map_err(|e| format!("bad mirror host '{}': {}", host.host, e))?;
                url.set_port(Some(host.port))
                    .map_err(|_| format!("cannot set port on '{}'", url))?;
                Ok(url.clone())
            }
        }
    }
}
