//! # Domain Audit Library
//!
//! Verifies that the domains hosted on a web server still point at it.
//!
//! Every domain is resolved, its address is compared with the server's own IP,
//! and when the two differ a marker file is written into the domain's document
//! root and fetched back over HTTP to prove the traffic still lands here.
//! Each domain ends up in exactly one category:
//!
//! - **Direct**: DNS points straight at this server
//! - **Healthy**: DNS points elsewhere (CDN, proxy) but the content is served from here
//! - **Mismatched**: DNS points elsewhere and the server could not be confirmed
//! - **NoPing**: the name does not resolve
//!
//! An HTTP status probe runs for every resolved domain; it is reported but
//! never changes the category.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use domain_audit_lib::{DomainVerifier, HostedDomain, VerifyConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = VerifyConfig::default()
//!         .with_server_ip("203.0.113.10".parse()?)
//!         .with_concurrency(8);
//!     let verifier = DomainVerifier::with_config(config)?;
//!
//!     let domains = vec![
//!         HostedDomain::new("example.com").with_document_root("/home/alice/public_html"),
//!     ];
//!     let result = verifier.verify_domains(&domains).await?;
//!
//!     println!("healthy: {:?}", result.healthy);
//!     Ok(())
//! }
//! ```

// Re-export main public API types and functions
// This makes them available as domain_audit_lib::TypeName
pub use aggregate::ResultAggregator;
pub use classify::{classify, ip_matches};
pub use concurrent::{
    default_pool_size, NoopObserver, ProgressCounter, VerificationObserver, MAX_POOL_SIZE,
};
pub use config::{
    load_env_config, load_env_config_from, parse_duration_string, ConfigManager, DefaultsConfig,
    EnvConfig, FileConfig, OutputConfig, ProbeConfig, ValidationConfig, OUTPUT_FORMATS,
    PANEL_CHOICES,
};
pub use error::DomainAuditError;
pub use protocols::{
    is_directory_listing, DnsResolver, DomainResolver, HttpSettings, HttpStatusProbe,
    LiveValidator, MarkerFile, MarkerValidator, StatusProber,
};
pub use server::resolve_server_ip;
pub use source::{
    panel_source, CpanelSource, DirectAdminSource, DomainSource, PanelKind, StaticSource,
};
pub use types::{
    Category, DomainRecord, HostedDomain, HttpStatus, RunResult, VerifyConfig,
    DEFAULT_USER_AGENT,
};
pub use utils::{dedupe_domains, normalize_domain_name, parse_domain_lines, validate_domain};
pub use verifier::DomainVerifier;

// Public modules
pub mod protocols;
pub mod source;

// Internal modules - these are not part of the public API
mod aggregate;
mod classify;
mod concurrent;
mod config;
mod error;
mod server;
mod types;
mod utils;
mod verifier;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, DomainAuditError>;

// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
