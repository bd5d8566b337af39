//! Network stages of the verification pipeline.
//!
//! Each stage is a trait so the coordinator can be driven by mocks in tests,
//! with one production implementation per trait.

/// DNS resolution
pub mod dns;

/// HTTP status probe and the per-domain HTTP client
pub mod http;

/// Marker-file live validation
pub mod marker;

pub use dns::{DnsResolver, DomainResolver};
pub use http::{is_directory_listing, HttpSettings, HttpStatusProbe, StatusProber};
pub use marker::{LiveValidator, MarkerFile, MarkerValidator};
