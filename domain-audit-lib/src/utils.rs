//! Utility functions for domain list processing and validation.
//!
//! This module contains helper functions for domain name validation,
//! normalization, de-duplication and parsing domain list files.

use crate::error::DomainAuditError;
use crate::types::HostedDomain;
use std::collections::HashSet;
use tracing::warn;

/// Validate a domain name format.
///
/// Checks basic RFC 1035 shape: 4-253 characters, at least two labels, each
/// label 1-63 alphanumeric or hyphen characters not starting or ending with a
/// hyphen.
pub fn validate_domain(domain: &str) -> Result<(), DomainAuditError> {
    if domain.is_empty() {
        return Err(DomainAuditError::invalid_domain(
            domain,
            "Domain name cannot be empty",
        ));
    }

    if !is_valid_fqdn(domain) {
        return Err(DomainAuditError::invalid_domain(
            domain,
            "Not a fully qualified domain name",
        ));
    }

    Ok(())
}

/// Normalize a single domain name: trim, lower-case, drop a trailing root dot.
pub fn normalize_domain_name(domain: &str) -> String {
    let trimmed = domain.trim().to_lowercase();
    trimmed
        .strip_suffix('.')
        .map(str::to_string)
        .unwrap_or(trimmed)
}

/// Normalize names and drop duplicates, keeping the first occurrence.
///
/// Empty names are skipped. Invalid names are kept so that they still get a
/// category (NoPing) instead of silently disappearing from the report.
pub fn dedupe_domains(domains: &[HostedDomain]) -> Vec<HostedDomain> {
    let mut seen = HashSet::new();
    let mut results = Vec::with_capacity(domains.len());

    for domain in domains {
        let name = normalize_domain_name(&domain.name);
        if name.is_empty() {
            continue;
        }
        if !seen.insert(name.clone()) {
            warn!(domain = %name, "Dropping duplicate domain");
            continue;
        }
        results.push(HostedDomain {
            name,
            document_root: domain.document_root.clone(),
        });
    }

    results
}

/// Parse a domain list: one name per line, `#` starts a comment.
pub fn parse_domain_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .filter_map(|line| {
            let domain_part = line.split('#').next().unwrap_or("").trim();
            if domain_part.is_empty() {
                None
            } else {
                Some(domain_part.to_string())
            }
        })
        .collect()
}

/// Validate that an FQDN has basic valid structure.
fn is_valid_fqdn(domain: &str) -> bool {
    // Basic checks
    if domain.len() < 4 || domain.len() > 253 {
        return false;
    }

    // Must contain at least one dot
    if !domain.contains('.') {
        return false;
    }

    // Each part must be valid
    for part in domain.split('.') {
        if part.is_empty() || part.len() > 63 {
            return false;
        }

        // Cannot start or end with hyphen
        if part.starts_with('-') || part.ends_with('-') {
            return false;
        }

        // Only alphanumeric and hyphens
        if !part.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return false;
        }
    }

    true
}
