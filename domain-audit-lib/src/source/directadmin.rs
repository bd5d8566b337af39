//! DirectAdmin domain discovery from the `/home/<user>/domains/<domain>` tree.

use super::DomainSource;
use crate::error::DomainAuditError;
use crate::types::HostedDomain;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Entries under `domains/` that are not hosted domains.
const SKIPPED_ENTRIES: [&str; 3] = ["sharedip", "suspended", "default"];

#[derive(Debug, Clone)]
pub struct DirectAdminSource {
    home_root: PathBuf,
}

impl DirectAdminSource {
    pub fn new() -> Self {
        Self::with_home_root("/home")
    }

    pub fn with_home_root<P: Into<PathBuf>>(home_root: P) -> Self {
        Self {
            home_root: home_root.into(),
        }
    }
}

impl Default for DirectAdminSource {
    fn default() -> Self {
        Self::new()
    }
}

async fn subdirectories(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut dirs = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

#[async_trait]
impl DomainSource for DirectAdminSource {
    fn name(&self) -> &str {
        "directadmin"
    }

    async fn list_domains(&self) -> Result<Vec<HostedDomain>, DomainAuditError> {
        let users = subdirectories(&self.home_root).await.map_err(|e| {
            DomainAuditError::discovery(
                "directadmin",
                format!("Cannot list {}: {}", self.home_root.display(), e),
            )
        })?;

        let mut domains = Vec::new();
        for user in users {
            let domain_root = user.join("domains");
            if !domain_root.is_dir() {
                continue;
            }

            // One unreadable account should not hide everyone else's domains.
            let entries = match subdirectories(&domain_root).await {
                Ok(entries) => entries,
                Err(e) => {
                    debug!(path = %domain_root.display(), error = %e, "Skipping unreadable domains directory");
                    continue;
                }
            };

            for entry in entries {
                let Some(name) = entry.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                if SKIPPED_ENTRIES.contains(&name) {
                    continue;
                }
                domains.push(HostedDomain::new(name).with_document_root(entry.join("public_html")));
            }
        }

        debug!(domains = domains.len(), "DirectAdmin discovery");
        Ok(domains)
    }
}
