//! Explicit domain lists from the command line or a file.
//!
//! File format: one domain per line, `#` starts a comment. An optional second
//! whitespace-separated column gives the document root:
//!
//! ```text
//! # hosted here
//! example.com      /var/www/example.com
//! shop.example.com
//! ```

use super::DomainSource;
use crate::error::DomainAuditError;
use crate::types::HostedDomain;
use crate::utils::parse_domain_lines;
use async_trait::async_trait;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    domains: Vec<HostedDomain>,
}

impl StaticSource {
    pub fn new(domains: Vec<HostedDomain>) -> Self {
        Self { domains }
    }

    /// Build a source from plain names, none of which has a document root.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names.into_iter().map(HostedDomain::new).collect())
    }

    /// Parse list file content.
    pub fn parse(content: &str) -> Self {
        let domains = parse_domain_lines(content)
            .into_iter()
            .filter_map(|line| {
                let mut fields = line.split_whitespace();
                let name = fields.next()?;
                let domain = HostedDomain::new(name);
                Some(match fields.next() {
                    Some(root) => domain.with_document_root(root),
                    None => domain,
                })
            })
            .collect();
        Self { domains }
    }

    /// Read a list file.
    ///
    /// # Errors
    ///
    /// A `FileError` when the file cannot be read.
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, DomainAuditError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| DomainAuditError::file_error(path.display().to_string(), e.to_string()))?;
        Ok(Self::parse(&content))
    }

    /// Append the domains of another source.
    pub fn extend(&mut self, other: StaticSource) {
        self.domains.extend(other.domains);
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

#[async_trait]
impl DomainSource for StaticSource {
    fn name(&self) -> &str {
        "list"
    }

    async fn list_domains(&self) -> Result<Vec<HostedDomain>, DomainAuditError> {
        Ok(self.domains.clone())
    }
}
