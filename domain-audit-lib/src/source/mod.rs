//! Where the list of hosted domains comes from.
//!
//! A source is picked once at startup: the control panel installed on this
//! server, or an explicit list from the command line or a file.

use crate::error::DomainAuditError;
use crate::types::HostedDomain;
use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub mod cpanel;
pub mod directadmin;
pub mod static_list;

pub use cpanel::CpanelSource;
pub use directadmin::DirectAdminSource;
pub use static_list::StaticSource;

/// Produces the domains hosted on this server.
#[async_trait]
pub trait DomainSource: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    /// List every hosted domain, with its document root when known.
    async fn list_domains(&self) -> Result<Vec<HostedDomain>, DomainAuditError>;
}

/// Hosting control panel installed on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelKind {
    CPanel,
    DirectAdmin,
    Unknown,
}

impl PanelKind {
    /// Detect the panel from its install directory under `/`.
    pub fn detect() -> Self {
        Self::detect_at(Path::new("/"))
    }

    /// Detect the panel with `root` standing in for the filesystem root.
    pub fn detect_at(root: &Path) -> Self {
        if root.join("usr/local/cpanel").exists() {
            PanelKind::CPanel
        } else if root.join("usr/local/directadmin").exists() {
            PanelKind::DirectAdmin
        } else {
            PanelKind::Unknown
        }
    }
}

impl fmt::Display for PanelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PanelKind::CPanel => write!(f, "cpanel"),
            PanelKind::DirectAdmin => write!(f, "directadmin"),
            PanelKind::Unknown => write!(f, "unknown"),
        }
    }
}

impl FromStr for PanelKind {
    type Err = DomainAuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cpanel" | "whm" => Ok(PanelKind::CPanel),
            "directadmin" | "da" => Ok(PanelKind::DirectAdmin),
            other => Err(DomainAuditError::config(format!(
                "Unknown control panel '{}'. Use: cpanel, directadmin",
                other
            ))),
        }
    }
}

/// Build the discovery source for a detected or configured panel.
///
/// # Errors
///
/// A `Discovery` error for `PanelKind::Unknown`.
pub fn panel_source(kind: PanelKind) -> Result<Box<dyn DomainSource>, DomainAuditError> {
    match kind {
        PanelKind::CPanel => Ok(Box::new(CpanelSource::new())),
        PanelKind::DirectAdmin => Ok(Box::new(DirectAdminSource::new())),
        PanelKind::Unknown => Err(DomainAuditError::discovery(
            "auto",
            "No supported control panel found; pass domains or --file",
        )),
    }
}
