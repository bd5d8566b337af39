//! Live validation: prove a domain is still served by this server.
//!
//! Used only when a domain resolves to a foreign IP (CDN, proxy, secondary
//! address). A marker file with a unique name is written into the domain's
//! document root, fetched back through the domain over HTTP, and compared.
//! The marker is always removed afterwards.

use crate::error::DomainAuditError;
use crate::protocols::http::{describe_request_error, HttpSettings};
use crate::types::HostedDomain;
use async_trait::async_trait;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Confirms that a domain's HTTP traffic reaches this server.
#[async_trait]
pub trait LiveValidator: Send + Sync {
    /// Fetch the marker for `domain` from `addr`, the address the Resolver
    /// stage produced.
    ///
    /// `Ok(())` when the marker round-trips unchanged, a `ValidationFailure`
    /// (or timeout) otherwise.
    async fn validate(&self, domain: &HostedDomain, addr: IpAddr) -> Result<(), DomainAuditError>;
}

/// A marker file that exists for as long as this value does.
///
/// Dropping it deletes the file, so early returns, timeouts and cancelled
/// futures all clean up.
#[derive(Debug)]
pub struct MarkerFile {
    path: PathBuf,
    file_name: String,
    content: String,
}

impl MarkerFile {
    /// Write a new uniquely named marker into `dir`.
    pub async fn create(dir: &Path, prefix: &str, domain: &str) -> Result<Self, DomainAuditError> {
        let token = Uuid::new_v4();
        let file_name = format!("{}{}.txt", prefix, token);
        let path = dir.join(&file_name);
        let content = format!("domain-audit marker for {} {}\n", domain, token);

        if let Err(e) = tokio::fs::write(&path, &content).await {
            // The file may have been created before the write failed.
            let _ = std::fs::remove_file(&path);
            return Err(DomainAuditError::validation(
                domain,
                format!("Cannot write marker {}: {}", path.display(), e),
            ));
        }

        Ok(Self {
            path,
            file_name,
            content,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

impl Drop for MarkerFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "Failed to remove marker file");
            }
        }
    }
}

/// Live validator that writes into the document root and reads back over HTTP.
#[derive(Debug, Clone)]
pub struct MarkerValidator {
    settings: HttpSettings,
    marker_prefix: String,
}

impl MarkerValidator {
    pub fn new(settings: HttpSettings, marker_prefix: &str) -> Self {
        Self {
            settings,
            marker_prefix: marker_prefix.to_string(),
        }
    }

    async fn fetch_marker(
        &self,
        client: &reqwest::Client,
        domain: &str,
        marker: &MarkerFile,
    ) -> Result<String, DomainAuditError> {
        let url = format!("{}/{}", self.settings.base_url(domain), marker.file_name());

        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| DomainAuditError::validation(domain, describe_request_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DomainAuditError::validation(
                domain,
                format!("Marker request returned HTTP {}", status.as_u16()),
            ));
        }

        response
            .text()
            .await
            .map_err(|e| DomainAuditError::validation(domain, describe_request_error(&e)))
    }
}

#[async_trait]
impl LiveValidator for MarkerValidator {
    #[instrument(skip(self, domain), fields(domain = %domain.name, %addr))]
    async fn validate(&self, domain: &HostedDomain, addr: IpAddr) -> Result<(), DomainAuditError> {
        let root = domain.document_root.as_deref().ok_or_else(|| {
            DomainAuditError::validation(&domain.name, "Document root unknown")
        })?;

        if !root.is_dir() {
            return Err(DomainAuditError::validation(
                &domain.name,
                format!("Document root {} does not exist", root.display()),
            ));
        }

        let client = self
            .settings
            .pinned_client(&domain.name, addr)
            .map_err(|e| DomainAuditError::validation(&domain.name, e.to_string()))?;

        let marker = MarkerFile::create(root, &self.marker_prefix, &domain.name).await?;
        debug!(marker = %marker.path().display(), "Marker written");

        let timeout = self.settings.timeout;
        let body = tokio::time::timeout(timeout, self.fetch_marker(&client, &domain.name, &marker))
            .await
            .map_err(|_| DomainAuditError::timeout("live validation", timeout))??;

        if body.trim() == marker.content().trim() {
            Ok(())
        } else {
            Err(DomainAuditError::validation(
                &domain.name,
                "Marker content did not round-trip",
            ))
        }
    }
}
