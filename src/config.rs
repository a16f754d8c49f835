//! Configuration loading.
//!
//! Files are read in order and merged, later files overriding earlier ones:
//! `$XDG_CONFIG_DIRS/pkg-fetch/fetch.toml`, `$XDG_CONFIG_HOME/pkg-fetch/fetch.toml`,
//! then an explicit path if given. Missing files are skipped. The environment
//! variables `FETCH_RETRY`, `FETCH_TIMEOUT` and `DEBUG_LEVEL` override files.
//!
//! ```toml
//! fetch_retry = 3
//! fetch_timeout = 30
//! debug_level = 0
//!
//! [repos.FreeBSD]
//! url = "pkg+http://pkg.FreeBSD.org/FreeBSD:14:amd64/latest"
//! mirror_type = "srv"
//! timeout = 60
//!
//! [srv]
//! "_http._tcp.pkg.FreeBSD.org" = ["pkg0.nyi.FreeBSD.org:80", "pkg0.bme.FreeBSD.org:80"]
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::fetch::{ConfigError, Host, MirrorType, Repository, StaticResolver};

const DEFAULT_FETCH_RETRY: u32 = 3;
const CONFIG_DIR: &str = "pkg-fetch";
const CONFIG_FILE: &str = "fetch.toml";

/// Values the fetch operation consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// Total attempts per fetch call (at least one is always made).
    pub fetch_retry: u32,
    /// Default whole-request timeout for repositories without their own.
    pub fetch_timeout: Option<Duration>,
    pub debug_level: u8,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            fetch_retry: DEFAULT_FETCH_RETRY,
            fetch_timeout: None,
            debug_level: 0,
        }
    }
}

/// One configured repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoConfig {
    pub url: String,
    pub mirror_type: MirrorType,
    pub timeout: Option<Duration>,
    pub srv: Option<Vec<Host>>,
}

impl RepoConfig {
    pub fn to_repository(&self, name: &str) -> Repository {
        let mut repo = Repository::new(name, self.url.clone()).with_mirror_type(self.mirror_type);
        repo.timeout = self.timeout;
        repo.srv = self.srv.clone();
        repo
    }
}

/// Fully resolved configuration.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub fetch: FetchConfig,
    pub repos: BTreeMap<String, RepoConfig>,
    pub resolver: StaticResolver,
}

impl Settings {
    /// Build a [`Repository`] for `name`, inheriting the global timeout.
    pub fn repository(&self, name: &str) -> Result<Repository, ConfigError> {
        let cfg = self
            .repos
            .get(name)
            .ok_or_else(|| ConfigError::UnknownRepository(name.to_string()))?;
        let mut repo = cfg.to_repository(name);
        if repo.timeout.is_none() {
            repo.timeout = self.fetch.fetch_timeout;
        }
        Ok(repo)
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
struct FetchToml {
    fetch_retry: Option<u32>,
    fetch_timeout: Option<u64>,
    debug_level: Option<u8>,
    repos: Option<BTreeMap<String, RepoToml>>,
    srv: Option<BTreeMap<String, Vec<String>>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct RepoToml {
    url: Option<String>,
    mirror_type: Option<MirrorType>,
    timeout: Option<u64>,
    srv: Option<Vec<String>>,
    enabled: Option<bool>,
}

impl FetchToml {
    fn merge(&mut self, other: FetchToml) {
        if other.fetch_retry.is_some() {
            self.fetch_retry = other.fetch_retry;
        }
        if other.fetch_timeout.is_some() {
            self.fetch_timeout = other.fetch_timeout;
        }
        if other.debug_level.is_some() {
            self.debug_level = other.debug_level;
        }
        match (self.repos.as_mut(), other.repos) {
            (Some(dst), Some(src)) => {
                for (name, repo) in src {
                    match dst.get_mut(&name) {
                        Some(existing) => existing.merge(repo),
                        None => {
                            dst.insert(name, repo);
                        }
                    }
                }
            }
            (None, Some(src)) => self.repos = Some(src),
            _ => {}
        }
        match (self.srv.as_mut(), other.srv) {
            (Some(dst), Some(src)) => dst.extend(src),
            (None, Some(src)) => self.srv = Some(src),
            _ => {}
        }
    }
}

impl RepoToml {
    fn merge(&mut self, other: RepoToml) {
        if other.url.is_some() {
            self.url = other.url;
        }
        if other.mirror_type.is_some() {
            self.mirror_type = other.mirror_type;
        }
        if other.timeout.is_some() {
            self.timeout = other.timeout;
        }
        if other.srv.is_some() {
            self.srv = other.srv;
        }
        if other.enabled.is_some() {
            self.enabled = other.enabled;
        }
    }
}

fn split_xdg_config_dirs() -> Vec<PathBuf> {
    let raw = std::env::var("XDG_CONFIG_DIRS").unwrap_or_else(|_| "/etc/xdg".to_owned());
    raw.split(':')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}

fn xdg_config_home() -> PathBuf {
    if let Ok(raw) = std::env::var("XDG_CONFIG_HOME") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    dirs::config_dir().unwrap_or_else(|| PathBuf::from(".").join(".config"))
}

/// Candidate config files in merge order.
pub fn default_config_files() -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = split_xdg_config_dirs()
        .into_iter()
        .map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
        .collect();
    paths.push(xdg_config_home().join(CONFIG_DIR).join(CONFIG_FILE));
    paths
}

/// Load from the default locations plus `explicit`, then apply the environment.
///
/// An explicit file must exist; default locations may be absent.
pub fn load(explicit: Option<&Path>) -> Result<Settings, ConfigError> {
    let mut merged = FetchToml::default();
    for path in default_config_files() {
        if path.exists() {
            merged.merge(read_toml(&path)?);
        }
    }
    if let Some(path) = explicit {
        merged.merge(read_toml(path)?);
    }

    let mut settings = resolve(merged)?;
    apply_env(&mut settings.fetch, |key| std::env::var(key).ok())?;
    Ok(settings)
}

/// Parse a single TOML document. No environment overrides.
pub fn from_str(text: &str) -> Result<Settings, ConfigError> {
    let parsed = toml::from_str::<FetchToml>(text).map_err(|source| ConfigError::Parse {
        path: PathBuf::from("<inline>"),
        source,
    })?;
    resolve(parsed)
}

fn read_toml(path: &Path) -> Result<FetchToml, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str::<FetchToml>(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn timeout_from_secs(secs: Option<u64>) -> Option<Duration> {
    secs.filter(|s| *s > 0).map(Duration::from_secs)
}

fn parse_hosts(key: &str, raw: &[String]) -> Result<Vec<Host>, ConfigError> {
    raw.iter()
        .map(|s| {
            s.parse::<Host>().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: s.clone(),
            })
        })
        .collect()
}

fn resolve(cfg: FetchToml) -> Result<Settings, ConfigError> {
    let fetch = FetchConfig {
        fetch_retry: cfg.fetch_retry.unwrap_or(DEFAULT_FETCH_RETRY),
        fetch_timeout: timeout_from_secs(cfg.fetch_timeout),
        debug_level: cfg.debug_level.unwrap_or(0),
    };

    let mut repos = BTreeMap::new();
    for (name, repo) in cfg.repos.unwrap_or_default() {
        if repo.enabled == Some(false) {
            continue;
        }
        let url = repo.url.ok_or_else(|| ConfigError::InvalidValue {
            key: format!("repos.{name}.url"),
            value: String::new(),
        })?;
        let srv = match &repo.srv {
            Some(raw) => Some(parse_hosts(&format!("repos.{name}.srv"), raw)?),
            None => None,
        };
        repos.insert(
            name,
            RepoConfig {
                url,
                mirror_type: repo.mirror_type.unwrap_or_default(),
                timeout: timeout_from_secs(repo.timeout),
                srv,
            },
        );
    }

    let mut resolver = StaticResolver::new();
    for (service, raw) in cfg.srv.unwrap_or_default() {
        let hosts = parse_hosts(&format!("srv.{service}"), &raw)?;
        resolver.insert(service, hosts);
    }

    Ok(Settings {
        fetch,
        repos,
        resolver,
    })
}

fn apply_env(
    cfg: &mut FetchConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    fn parse<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
        raw.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
        })
    }

    if let Some(raw) = lookup("FETCH_RETRY") {
        cfg.fetch_retry = parse("FETCH_RETRY", &raw)?;
    }
    if let Some(raw) = lookup("FETCH_TIMEOUT") {
        cfg.fetch_timeout = timeout_from_secs(Some(parse("FETCH_TIMEOUT", &raw)?));
    }
    if let Some(raw) = lookup("DEBUG_LEVEL") {
        cfg.debug_level = parse("DEBUG_LEVEL", &raw)?;
    }
    Ok(())
}
