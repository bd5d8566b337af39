//! cPanel/WHM domain discovery.
//!
//! Domain names come from `whmapi1 get_domain_info`; document roots come
//! from `/etc/userdatadomains`, whose lines look like
//!
//! ```text
//! example.com: user==owner==main==example.com==/home/user/public_html==203.0.113.10:80==...
//! ```

use super::DomainSource;
use crate::error::DomainAuditError;
use crate::types::HostedDomain;
use crate::utils::normalize_domain_name;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, warn};

const WHMAPI_BIN: &str = "whmapi1";
const USERDATA_DOMAINS_FILE: &str = "/etc/userdatadomains";

#[derive(Debug, Deserialize)]
struct WhmApiResponse {
    data: WhmApiData,
}

#[derive(Debug, Deserialize)]
struct WhmApiData {
    #[serde(default)]
    domains: Vec<WhmApiDomain>,
}

#[derive(Debug, Deserialize)]
struct WhmApiDomain {
    domain: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CpanelSource {
    whmapi_bin: PathBuf,
    userdata_domains: PathBuf,
}

impl CpanelSource {
    pub fn new() -> Self {
        Self {
            whmapi_bin: PathBuf::from(WHMAPI_BIN),
            userdata_domains: PathBuf::from(USERDATA_DOMAINS_FILE),
        }
    }

    /// Use a different `whmapi1` binary and `userdatadomains` file.
    pub fn with_paths<B: Into<PathBuf>, U: Into<PathBuf>>(whmapi_bin: B, userdata_domains: U) -> Self {
        Self {
            whmapi_bin: whmapi_bin.into(),
            userdata_domains: userdata_domains.into(),
        }
    }

    async fn run_whmapi(&self) -> Result<String, DomainAuditError> {
        let output = Command::new(&self.whmapi_bin)
            .args(["--output=jsonpretty", "get_domain_info"])
            .output()
            .await
            .map_err(|e| {
                DomainAuditError::discovery(
                    "cpanel",
                    format!("Cannot run {}: {}", self.whmapi_bin.display(), e),
                )
            })?;

        if !output.status.success() {
            return Err(DomainAuditError::discovery(
                "cpanel",
                format!(
                    "{} exited with {}: {}",
                    self.whmapi_bin.display(),
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn document_roots(&self) -> HashMap<String, PathBuf> {
        match tokio::fs::read_to_string(&self.userdata_domains).await {
            Ok(content) => parse_userdata_domains(&content),
            Err(e) => {
                warn!(
                    path = %self.userdata_domains.display(),
                    error = %e,
                    "Cannot read document roots; live validation will fail for every domain"
                );
                HashMap::new()
            }
        }
    }
}

impl Default for CpanelSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DomainSource for CpanelSource {
    fn name(&self) -> &str {
        "cpanel"
    }

    async fn list_domains(&self) -> Result<Vec<HostedDomain>, DomainAuditError> {
        let json = self.run_whmapi().await?;
        let names = parse_whmapi_domains(&json)?;
        let roots = self.document_roots().await;
        debug!(domains = names.len(), document_roots = roots.len(), "cPanel discovery");

        Ok(attach_document_roots(names, &roots))
    }
}

/// Pair each whmapi1 name with its document root, matching names the way
/// `parse_userdata_domains` keys them.
fn attach_document_roots(
    names: Vec<String>,
    roots: &HashMap<String, PathBuf>,
) -> Vec<HostedDomain> {
    names
        .into_iter()
        .map(|name| {
            let document_root = roots.get(&normalize_domain_name(&name)).cloned();
            HostedDomain {
                name,
                document_root,
            }
        })
        .collect()
}

/// Extract `data.domains[].domain` from `whmapi1 get_domain_info` output.
pub fn parse_whmapi_domains(json: &str) -> Result<Vec<String>, DomainAuditError> {
    let response: WhmApiResponse = serde_json::from_str(json).map_err(|e| {
        DomainAuditError::discovery("cpanel", format!("Unexpected whmapi1 output: {}", e))
    })?;

    Ok(response
        .data
        .domains
        .into_iter()
        .filter_map(|entry| entry.domain)
        .collect())
}

/// Map each domain in `/etc/userdatadomains` to its document root.
///
/// The document root is the fifth `==`-separated field of the line.
pub fn parse_userdata_domains(content: &str) -> HashMap<String, PathBuf> {
    let mut roots = HashMap::new();

    for line in content.lines() {
        let Some((domain, _)) = line.split_once(':') else {
            continue;
        };
        let fields: Vec<&str> = line.split("==").collect();
        if let Some(root) = fields.get(4).map(|f| f.trim()).filter(|f| !f.is_empty()) {
            roots
                .entry(normalize_domain_name(domain))
                .or_insert_with(|| PathBuf::from(root));
        }
    }

    roots
}
