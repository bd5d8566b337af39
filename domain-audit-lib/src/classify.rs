//! IP comparison and the category decision table.
//!
//! Both functions are pure: they only look at stage outcomes that the
//! coordinator has already collected for one domain.

use crate::types::Category;
use std::net::IpAddr;

/// Compare a resolved address against the server's canonical IP.
///
/// Exact equality only. A neighbouring address in the same subnet, or an
/// address inside a CDN range, is still a mismatch.
pub fn ip_matches(resolved: IpAddr, server: IpAddr) -> bool {
    resolved == server
}

/// Decide the category of a domain from its stage outcomes.
///
/// | resolution | ip match | live validation | category   |
/// |------------|----------|-----------------|------------|
/// | fails      | -        | -               | NoPing     |
/// | succeeds   | true     | -               | Direct     |
/// | succeeds   | false    | true            | Healthy    |
/// | succeeds   | false    | false / not run | Mismatched |
///
/// Resolution failure wins over every other signal, so a stale
/// `ip_matches` or validation result is ignored when `resolved` is None.
pub fn classify(
    resolved: Option<IpAddr>,
    ip_matches: bool,
    live_validation_passed: Option<bool>,
) -> Category {
    if resolved.is_none() {
        return Category::NoPing;
    }
    if ip_matches {
        return Category::Direct;
    }
    match live_validation_passed {
        Some(true) => Category::Healthy,
        Some(false) | None => Category::Mismatched,
    }
}
