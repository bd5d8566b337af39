//! Core data types for domain verification.
//!
//! This module defines the main data structures used throughout the library:
//! the per-domain record, the four outcome categories, the frozen run result,
//! and the configuration handed to the coordinator.

use crate::concurrent::default_pool_size;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Outcome category of a verified domain.
///
/// Every domain ends a run in exactly one of these.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// DNS resolves straight to this server's IP
    Direct,

    /// DNS points elsewhere but live validation proved this server still serves it
    Healthy,

    /// DNS points elsewhere and live validation could not confirm this server
    Mismatched,

    /// The name could not be resolved at all
    NoPing,
}

impl Category {
    /// All categories in report order.
    pub const ALL: [Category; 4] = [
        Category::Direct,
        Category::Healthy,
        Category::Mismatched,
        Category::NoPing,
    ];

    /// Base name used for exported list files (`<slug>_domains.txt`).
    pub fn slug(&self) -> &'static str {
        match self {
            Category::Direct => "direct",
            Category::Healthy => "healthy",
            Category::Mismatched => "mismatched",
            Category::NoPing => "no_ping",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Direct => write!(f, "Direct"),
            Category::Healthy => write!(f, "Healthy"),
            Category::Mismatched => write!(f, "Mismatched"),
            Category::NoPing => write!(f, "No Ping"),
        }
    }
}

/// Outcome of the HTTP status probe.
///
/// `status` is the numeric response code when one was received; `reason`
/// carries the literal failure (timeout, refused, TLS) or a note about the
/// response such as `"index of"` for directory listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HttpStatus {
    pub status: Option<u16>,
    pub reason: Option<String>,
}

impl HttpStatus {
    /// A plain response code.
    pub fn code(status: u16) -> Self {
        Self {
            status: Some(status),
            reason: None,
        }
    }

    /// The domain could not be reached; keeps the literal reason.
    pub fn unreachable<R: Into<String>>(reason: R) -> Self {
        Self {
            status: None,
            reason: Some(reason.into()),
        }
    }

    /// Whether any HTTP response came back.
    pub fn is_reachable(&self) -> bool {
        self.status.is_some()
    }
}

impl std::fmt::Display for HttpStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.status, &self.reason) {
            (Some(code), Some(reason)) => write!(f, "{} ({})", code, reason),
            (Some(code), None) => write!(f, "{}", code),
            (None, Some(reason)) => write!(f, "unreachable ({})", reason),
            (None, None) => write!(f, "unreachable"),
        }
    }
}

/// A domain as handed over by a domain source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedDomain {
    /// Fully qualified domain name
    pub name: String,

    /// Directory on this server that the domain serves over HTTP, if known.
    /// Live validation writes its marker here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_root: Option<PathBuf>,
}

impl HostedDomain {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            document_root: None,
        }
    }

    pub fn with_document_root<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.document_root = Some(path.into());
        self
    }
}

impl From<&str> for HostedDomain {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for HostedDomain {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// Verification record for a single domain.
///
/// Built by the task that owns the domain and never modified after its
/// category is decided.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DomainRecord {
    /// The domain name that was verified
    pub name: String,

    /// Address the name resolved to, unset when resolution failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_ip: Option<IpAddr>,

    /// This server's canonical IP
    pub server_ip: IpAddr,

    /// Whether `resolved_ip` equals `server_ip`
    pub ip_matches: bool,

    /// Live validation outcome; only present when the IPs differ
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_validation_passed: Option<bool>,

    /// Status probe outcome; absent for unresolved domains
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<HttpStatus>,

    /// Final classification
    pub category: Category,

    /// Diagnostic for whichever stage failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,

    /// How long the whole pipeline took for this domain
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_duration: Option<Duration>,
}

/// Frozen outcome of a verification run.
///
/// Category lists are in the order membership was decided, which is task
/// completion order rather than input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Server IP every domain was compared against
    pub server_ip: IpAddr,

    pub direct: Vec<String>,
    pub healthy: Vec<String>,
    pub mismatched: Vec<String>,
    pub no_ping: Vec<String>,

    /// Status probe outcome (or error reason) per domain
    pub statuses: BTreeMap<String, HttpStatus>,

    /// Every record in completion order
    pub records: Vec<DomainRecord>,

    /// Number of distinct domains the run was asked to verify
    pub requested: usize,

    /// True when the run was cancelled before every domain was dispatched
    pub interrupted: bool,

    /// Wall-clock duration of the run
    pub duration: Duration,
}

impl RunResult {
    /// Names in one category.
    pub fn category(&self, category: Category) -> &[String] {
        match category {
            Category::Direct => &self.direct,
            Category::Healthy => &self.healthy,
            Category::Mismatched => &self.mismatched,
            Category::NoPing => &self.no_ping,
        }
    }

    /// Number of classified domains.
    pub fn total(&self) -> usize {
        self.direct.len() + self.healthy.len() + self.mismatched.len() + self.no_ping.len()
    }

    /// Domains that are still served from this server (Direct then Healthy).
    pub fn combined(&self) -> Vec<String> {
        self.direct
            .iter()
            .chain(self.healthy.iter())
            .cloned()
            .collect()
    }

    /// Category a domain ended up in, if it was classified.
    pub fn category_of(&self, name: &str) -> Option<Category> {
        self.records
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.category)
    }
}

/// Configuration options for a verification run.
///
/// Passed to the coordinator at construction; nothing in the library reads
/// process-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyConfig {
    /// Maximum number of domains verified at once.
    /// Default: max(2, CPU cores), Range: 1-256
    pub concurrency: usize,

    /// Timeout for the DNS lookup of one domain
    /// Default: 5 seconds
    #[serde(skip)]
    pub resolve_timeout: Duration,

    /// Timeout for the live-validation round trip
    /// Default: 10 seconds
    #[serde(skip)]
    pub validation_timeout: Duration,

    /// Timeout for the status probe
    /// Default: 15 seconds
    #[serde(skip)]
    pub probe_timeout: Duration,

    /// This server's canonical IP. Detected when None.
    pub server_ip: Option<IpAddr>,

    /// Nameserver to query instead of the system resolver
    pub nameserver: Option<String>,

    /// Path requested by the status probe
    pub probe_path: String,

    /// User-Agent sent by the status probe and live validation
    pub user_agent: String,

    /// File name prefix for live-validation markers. Keep it visible:
    /// web servers commonly refuse to serve dot-files.
    pub marker_prefix: String,

    /// Port used for plain-HTTP requests to domains
    pub http_port: u16,
}

/// Browser-like agent; some hosts reject unknown clients outright.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            concurrency: default_pool_size(),
            resolve_timeout: Duration::from_secs(5),
            validation_timeout: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(15),
            server_ip: None,
            nameserver: None,
            probe_path: "/".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            marker_prefix: "domain-audit-".to_string(),
            http_port: 80,
        }
    }
}

impl VerifyConfig {
    /// Set the worker pool size. Clamped to 1-256.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, 256);
        self
    }

    pub fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = timeout;
        self
    }

    pub fn with_validation_timeout(mut self, timeout: Duration) -> Self {
        self.validation_timeout = timeout;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Pin the server IP instead of detecting it.
    pub fn with_server_ip(mut self, ip: IpAddr) -> Self {
        self.server_ip = Some(ip);
        self
    }

    pub fn with_nameserver<S: Into<String>>(mut self, nameserver: S) -> Self {
        self.nameserver = Some(nameserver.into());
        self
    }

    pub fn with_http_port(mut self, port: u16) -> Self {
        self.http_port = port;
        self
    }
}
