//! HTTP status probe stage.
//!
//! Issues one GET against the domain and records what came back. The result is
//! purely diagnostic: it never changes a domain's category.

use crate::error::DomainAuditError;
use crate::types::HttpStatus;
use async_trait::async_trait;
use regex::Regex;
use reqwest::StatusCode;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tracing::{debug, instrument};

lazy_static::lazy_static! {
    static ref AUTOINDEX_STYLESHEET: Regex =
        Regex::new(r#"(?i)<link[^>]+href\s*=\s*["'][^"']*autoindex\.css"#)
            .expect("valid autoindex regex");
    static ref INDEX_OF_TITLE: Regex =
        Regex::new(r"(?i)<title>\s*index of\s*/").expect("valid index-of regex");
}

/// Reason recorded next to a 200 when the page is a bare directory listing.
pub const DIRECTORY_LISTING: &str = "index of";

/// Probes a domain over HTTP and reports the status code.
#[async_trait]
pub trait StatusProber: Send + Sync {
    /// Request `domain` from `addr`, the address the Resolver stage produced.
    ///
    /// Returns the status for any HTTP response (including 4xx/5xx) and a
    /// `ProbeFailure` when no response was received at all.
    async fn probe(&self, domain: &str, addr: IpAddr) -> Result<HttpStatus, DomainAuditError>;
}

/// Client settings shared by the status probe and live validation.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub user_agent: String,
    pub timeout: Duration,
    pub port: u16,
}

impl HttpSettings {
    pub fn new(user_agent: &str, timeout: Duration, port: u16) -> Self {
        Self {
            user_agent: user_agent.to_string(),
            timeout,
            port,
        }
    }

    /// Build a client whose requests for `domain` connect to `addr`.
    ///
    /// The host is never looked up again, so HTTP traffic goes to the same
    /// address the domain was classified by, whichever nameserver produced it.
    /// Redirects to other hosts still use the system resolver. Certificates
    /// are not verified: plenty of hosted domains redirect to HTTPS with a
    /// self-signed or expired certificate, and only reachability matters here.
    pub fn pinned_client(
        &self,
        domain: &str,
        addr: IpAddr,
    ) -> Result<reqwest::Client, DomainAuditError> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .danger_accept_invalid_certs(true)
            .redirect(reqwest::redirect::Policy::limited(5))
            .no_proxy()
            .resolve(domain, SocketAddr::new(addr, self.port))
            .build()
            .map_err(|e| {
                DomainAuditError::network_with_source("Failed to create HTTP client", e.to_string())
            })
    }

    /// `http://domain[:port]` for a plain-HTTP request.
    pub(crate) fn base_url(&self, domain: &str) -> String {
        if self.port == 80 {
            format!("http://{}", domain)
        } else {
            format!("http://{}:{}", domain, self.port)
        }
    }
}

/// One-line description of a failed request.
///
/// reqwest already folds the underlying cause into its message.
pub(crate) fn describe_request_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "timeout".to_string()
    } else {
        err.to_string()
    }
}

/// Detect an auto-generated directory listing page.
pub fn is_directory_listing(body: &str) -> bool {
    AUTOINDEX_STYLESHEET.is_match(body) || INDEX_OF_TITLE.is_match(body)
}

/// Status probe over plain HTTP.
#[derive(Debug, Clone)]
pub struct HttpStatusProbe {
    settings: HttpSettings,
    path: String,
}

impl HttpStatusProbe {
    pub fn new(settings: HttpSettings, path: &str) -> Self {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        Self { settings, path }
    }
}

#[async_trait]
impl StatusProber for HttpStatusProbe {
    #[instrument(skip(self), fields(domain = %domain, %addr))]
    async fn probe(&self, domain: &str, addr: IpAddr) -> Result<HttpStatus, DomainAuditError> {
        let client = self
            .settings
            .pinned_client(domain, addr)
            .map_err(|e| DomainAuditError::probe(domain, e.to_string()))?;
        let url = format!("{}{}", self.settings.base_url(domain), self.path);

        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| DomainAuditError::probe(domain, describe_request_error(&e)))?;

        let status = response.status();
        debug!(status = status.as_u16(), "Probe response");

        if status != StatusCode::OK {
            return Ok(HttpStatus::code(status.as_u16()));
        }

        // A body that cannot be read still leaves us with a valid status.
        let listing = match response.text().await {
            Ok(body) => is_directory_listing(&body),
            Err(_) => false,
        };

        Ok(HttpStatus {
            status: Some(status.as_u16()),
            reason: listing.then(|| DIRECTORY_LISTING.to_string()),
        })
    }
}
