//! Main domain verifier implementation.
//!
//! This module provides the `DomainVerifier` struct that runs the
//! resolve → compare → validate → probe pipeline for every domain under a
//! bounded worker pool and folds the outcomes into a `RunResult`.

use crate::aggregate::ResultAggregator;
use crate::classify::{classify, ip_matches};
use crate::concurrent::{NoopObserver, ProgressCounter, VerificationObserver, MAX_POOL_SIZE};
use crate::error::DomainAuditError;
use crate::protocols::{
    DnsResolver, DomainResolver, HttpSettings, HttpStatusProbe, LiveValidator, MarkerValidator,
    StatusProber,
};
use crate::server::resolve_server_ip;
use crate::types::{DomainRecord, HostedDomain, HttpStatus, RunResult, VerifyConfig};
use crate::utils::{dedupe_domains, validate_domain};
use futures::stream::{self, StreamExt};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Coordinates verification of many domains at once.
///
/// The `DomainVerifier` handles:
/// - Running one isolated task per domain, at most `concurrency` at a time
/// - Per-stage timeouts
/// - Progress reporting through a shared counter and an observer
/// - Stopping dispatch when a run is cancelled
///
/// Stage implementations sit behind traits, so the verifier can be built
/// from the real network clients (`with_config`) or from any other
/// implementation (`from_parts`).
///
/// # Example
///
/// ```rust,no_run
/// use domain_audit_lib::{DomainVerifier, HostedDomain, VerifyConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = VerifyConfig::default().with_server_ip("203.0.113.10".parse()?);
///     let verifier = DomainVerifier::with_config(config)?;
///
///     let domains = vec![HostedDomain::new("example.com")];
///     let result = verifier.verify_domains(&domains).await?;
///     println!("direct: {:?}", result.direct);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct DomainVerifier {
    config: Arc<VerifyConfig>,
    resolver: Arc<dyn DomainResolver>,
    validator: Arc<dyn LiveValidator>,
    prober: Arc<dyn StatusProber>,
    progress: ProgressCounter,
}

/// What the stages of one pipeline produced, before classification.
#[derive(Debug, Default)]
struct StageOutcome {
    resolved_ip: Option<IpAddr>,
    ip_matches: bool,
    live_validation_passed: Option<bool>,
    http_status: Option<HttpStatus>,
    error_reason: Option<String>,
}

impl DomainVerifier {
    /// Create a verifier backed by DNS and HTTP clients built from `config`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the nameserver override is invalid.
    pub fn with_config(config: VerifyConfig) -> Result<Self, DomainAuditError> {
        let resolver = DnsResolver::new(config.resolve_timeout, config.nameserver.as_deref())?;

        let prober = HttpStatusProbe::new(
            HttpSettings::new(&config.user_agent, config.probe_timeout, config.http_port),
            &config.probe_path,
        );
        let validator = MarkerValidator::new(
            HttpSettings::new(&config.user_agent, config.validation_timeout, config.http_port),
            &config.marker_prefix,
        );

        Ok(Self::from_parts(
            config,
            Arc::new(resolver),
            Arc::new(validator),
            Arc::new(prober),
        ))
    }

    /// Create a verifier from explicit stage implementations.
    pub fn from_parts(
        config: VerifyConfig,
        resolver: Arc<dyn DomainResolver>,
        validator: Arc<dyn LiveValidator>,
        prober: Arc<dyn StatusProber>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            resolver,
            validator,
            prober,
            progress: ProgressCounter::new(),
        }
    }

    /// Get the configuration for this verifier.
    pub fn config(&self) -> &VerifyConfig {
        &self.config
    }

    /// Handle on the completed/total counts of the current run.
    pub fn progress(&self) -> ProgressCounter {
        self.progress.clone()
    }

    /// Verify a single domain against `server_ip`.
    ///
    /// Never fails: every stage error ends up in the record's
    /// `error_reason`, and the category follows the decision table.
    #[instrument(skip(self, domain), fields(domain = %domain.name))]
    pub async fn verify_domain(&self, domain: &HostedDomain, server_ip: IpAddr) -> DomainRecord {
        let started = Instant::now();
        let outcome = self.run_stages(domain, server_ip).await;
        let category = classify(
            outcome.resolved_ip,
            outcome.ip_matches,
            outcome.live_validation_passed,
        );
        debug!(%category, "Classified");

        DomainRecord {
            name: domain.name.clone(),
            resolved_ip: outcome.resolved_ip,
            server_ip,
            ip_matches: outcome.ip_matches,
            live_validation_passed: outcome.live_validation_passed,
            http_status: outcome.http_status,
            category,
            error_reason: outcome.error_reason,
            check_duration: Some(started.elapsed()),
        }
    }

    async fn run_stages(&self, domain: &HostedDomain, server_ip: IpAddr) -> StageOutcome {
        let mut outcome = StageOutcome::default();

        if let Err(e) = validate_domain(&domain.name) {
            warn!(error = %e, "Skipping invalid domain");
            outcome.error_reason = Some(e.to_string());
            return outcome;
        }

        let resolved = match self.resolve(&domain.name).await {
            Ok(ip) => ip,
            Err(e) => {
                warn!(error = %e, "Resolution failed");
                outcome.error_reason = Some(e.to_string());
                return outcome;
            }
        };
        outcome.resolved_ip = Some(resolved);
        outcome.ip_matches = ip_matches(resolved, server_ip);
        debug!(%resolved, ip_matches = outcome.ip_matches, "Resolved");

        if !outcome.ip_matches {
            match self.live_validate(domain, resolved).await {
                Ok(()) => outcome.live_validation_passed = Some(true),
                Err(e) => {
                    warn!(error = %e, "Live validation failed");
                    outcome.live_validation_passed = Some(false);
                    outcome.error_reason = Some(e.to_string());
                }
            }
        }

        outcome.http_status = Some(match self.probe(&domain.name, resolved).await {
            Ok(status) => status,
            Err(e) => {
                debug!(error = %e, "Status probe failed");
                HttpStatus::unreachable(failure_reason(&e))
            }
        });

        outcome
    }

    async fn resolve(&self, domain: &str) -> Result<IpAddr, DomainAuditError> {
        let timeout = self.config.resolve_timeout;
        tokio::time::timeout(timeout, self.resolver.resolve(domain))
            .await
            .map_err(|_| {
                DomainAuditError::resolution(domain, format!("DNS lookup timed out after {:?}", timeout))
            })?
    }

    async fn live_validate(&self, domain: &HostedDomain, addr: IpAddr) -> Result<(), DomainAuditError> {
        let timeout = self.config.validation_timeout;
        tokio::time::timeout(timeout, self.validator.validate(domain, addr))
            .await
            .map_err(|_| DomainAuditError::timeout("live validation", timeout))?
    }

    async fn probe(&self, domain: &str, addr: IpAddr) -> Result<HttpStatus, DomainAuditError> {
        let timeout = self.config.probe_timeout;
        tokio::time::timeout(timeout, self.prober.probe(domain, addr))
            .await
            .map_err(|_| DomainAuditError::timeout("status probe", timeout))?
    }

    /// Verify every domain, detecting the server IP if it is not configured.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no domains are supplied or the
    /// server IP cannot be determined. Per-domain failures never surface here.
    pub async fn verify_domains(&self, domains: &[HostedDomain]) -> Result<RunResult, DomainAuditError> {
        let server_ip = resolve_server_ip(&self.config).await?;
        self.verify_domains_with(domains, server_ip, &NoopObserver, CancellationToken::new())
            .await
    }

    /// Verify every domain against `server_ip`, reporting to `observer`.
    ///
    /// Input names are normalized and de-duplicated first. Cancelling
    /// `cancel` stops dispatching new domains; domains already in flight are
    /// finished and the result is marked interrupted.
    pub async fn verify_domains_with(
        &self,
        domains: &[HostedDomain],
        server_ip: IpAddr,
        observer: &dyn VerificationObserver,
        cancel: CancellationToken,
    ) -> Result<RunResult, DomainAuditError> {
        let domains = dedupe_domains(domains);
        if domains.is_empty() {
            return Err(DomainAuditError::config("No domains to verify"));
        }

        let total = domains.len();
        let concurrency = self.config.concurrency.clamp(1, MAX_POOL_SIZE);
        info!(total, concurrency, %server_ip, "Starting verification run");

        self.progress.reset(total);
        let started = Instant::now();
        let mut aggregator = ResultAggregator::new(server_ip, total);

        let completions = stream::iter(domains)
            .take_until(cancel.cancelled())
            .map(|domain| {
                let verifier = self.clone();
                async move {
                    let name = domain.name.clone();
                    let task =
                        tokio::spawn(async move { verifier.verify_domain(&domain, server_ip).await });
                    match task.await {
                        Ok(record) => record,
                        Err(e) => {
                            warn!(domain = %name, error = %e, "Verification task aborted");
                            aborted_record(name, server_ip, &e)
                        }
                    }
                }
            })
            .buffer_unordered(concurrency);
        tokio::pin!(completions);

        while let Some(record) = completions.next().await {
            let completed = self.progress.increment();
            observer.on_record(&record);
            observer.on_progress(completed, total);
            aggregator.record(record);
        }

        let interrupted = aggregator.len() < total;
        if interrupted {
            warn!(
                classified = aggregator.len(),
                total, "Run cancelled before every domain was dispatched"
            );
        }

        let result = aggregator.freeze(interrupted, started.elapsed());
        info!(
            direct = result.direct.len(),
            healthy = result.healthy.len(),
            mismatched = result.mismatched.len(),
            no_ping = result.no_ping.len(),
            duration = ?result.duration,
            "Verification run finished"
        );
        Ok(result)
    }
}

/// Record for a domain whose task panicked or was cancelled by the runtime.
fn aborted_record(name: String, server_ip: IpAddr, err: &tokio::task::JoinError) -> DomainRecord {
    DomainRecord {
        name,
        resolved_ip: None,
        server_ip,
        ip_matches: false,
        live_validation_passed: None,
        http_status: None,
        category: classify(None, false, None),
        error_reason: Some(format!("Verification task aborted: {}", err)),
        check_duration: None,
    }
}

/// Literal reason for a failed probe, as shown next to "unreachable".
fn failure_reason(err: &DomainAuditError) -> String {
    match err {
        DomainAuditError::ProbeFailure { message, .. } => message.clone(),
        DomainAuditError::Timeout { .. } => "timeout".to_string(),
        other => other.to_string(),
    }
}
