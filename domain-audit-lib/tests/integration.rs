// domain-audit-lib/tests/integration.rs

//! Integration tests for the verification pipeline, driven by mock stages
//! and an in-process HTTP server.

use async_trait::async_trait;
use domain_audit_lib::{
    Category, DomainAuditError, DomainRecord, DomainResolver, DomainVerifier, HostedDomain,
    HttpSettings, HttpStatus, HttpStatusProbe, LiveValidator, MarkerValidator, StatusProber,
    VerificationObserver, VerifyConfig,
};
use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

const SERVER_IP: &str = "10.0.0.1";

fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

// ---------------------------------------------------------------------------
// Mock stages
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MockResolver {
    answers: HashMap<String, IpAddr>,
    hang: HashSet<String>,
    panic_on: HashSet<String>,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockResolver {
    fn answer(mut self, domain: &str, addr: &str) -> Self {
        self.answers.insert(domain.to_string(), ip(addr));
        self
    }

    fn hang(mut self, domain: &str) -> Self {
        self.hang.insert(domain.to_string());
        self
    }

    fn panic_on(mut self, domain: &str) -> Self {
        self.panic_on.insert(domain.to_string());
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl DomainResolver for MockResolver {
    async fn resolve(&self, domain: &str) -> Result<IpAddr, DomainAuditError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if self.panic_on.contains(domain) {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            panic!("resolver blew up on {}", domain);
        }
        if self.hang.contains(domain) {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.answers
            .get(domain)
            .copied()
            .ok_or_else(|| DomainAuditError::resolution(domain, "NXDOMAIN"))
    }
}

#[derive(Default)]
struct MockValidator {
    passes: HashSet<String>,
    delay: Duration,
    calls: AtomicUsize,
}

impl MockValidator {
    fn passing(domains: &[&str]) -> Self {
        Self {
            passes: domains.iter().map(|d| d.to_string()).collect(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl LiveValidator for MockValidator {
    async fn validate(&self, domain: &HostedDomain, _addr: IpAddr) -> Result<(), DomainAuditError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.passes.contains(&domain.name) {
            Ok(())
        } else {
            Err(DomainAuditError::validation(&domain.name, "marker not found"))
        }
    }
}

struct MockProber {
    status: Result<u16, String>,
    calls: AtomicUsize,
}

impl MockProber {
    fn status(code: u16) -> Self {
        Self {
            status: Ok(code),
            calls: AtomicUsize::new(0),
        }
    }

    fn unreachable(reason: &str) -> Self {
        Self {
            status: Err(reason.to_string()),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl StatusProber for MockProber {
    async fn probe(&self, domain: &str, _addr: IpAddr) -> Result<HttpStatus, DomainAuditError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.status {
            Ok(code) => Ok(HttpStatus::code(*code)),
            Err(reason) => Err(DomainAuditError::probe(domain, reason.clone())),
        }
    }
}

#[derive(Default)]
struct RecordingObserver {
    progress: Mutex<Vec<(usize, usize)>>,
    records: Mutex<Vec<String>>,
}

impl VerificationObserver for RecordingObserver {
    fn on_progress(&self, completed: usize, total: usize) {
        self.progress.lock().unwrap().push((completed, total));
    }

    fn on_record(&self, record: &DomainRecord) {
        self.records.lock().unwrap().push(record.name.clone());
    }
}

struct Harness {
    verifier: DomainVerifier,
    resolver: Arc<MockResolver>,
    validator: Arc<MockValidator>,
    prober: Arc<MockProber>,
}

fn harness(
    config: VerifyConfig,
    resolver: MockResolver,
    validator: MockValidator,
    prober: MockProber,
) -> Harness {
    let resolver = Arc::new(resolver);
    let validator = Arc::new(validator);
    let prober = Arc::new(prober);
    let verifier = DomainVerifier::from_parts(
        config.with_server_ip(ip(SERVER_IP)),
        resolver.clone(),
        validator.clone(),
        prober.clone(),
    );
    Harness {
        verifier,
        resolver,
        validator,
        prober,
    }
}

fn domains(names: &[&str]) -> Vec<HostedDomain> {
    names.iter().map(|n| HostedDomain::new(*n)).collect()
}

// ---------------------------------------------------------------------------
// Classification scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_direct_when_ip_matches() {
    let h = harness(
        VerifyConfig::default(),
        MockResolver::default().answer("a.example.com", "10.0.0.1"),
        MockValidator::default(),
        MockProber::status(200),
    );

    let record = h
        .verifier
        .verify_domain(&HostedDomain::new("a.example.com"), ip(SERVER_IP))
        .await;

    assert_eq!(record.category, Category::Direct);
    assert!(record.ip_matches);
    assert_eq!(record.live_validation_passed, None);
    assert_eq!(record.http_status, Some(HttpStatus::code(200)));
    assert_eq!(h.validator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_direct_regardless_of_probe_outcome() {
    let h = harness(
        VerifyConfig::default(),
        MockResolver::default().answer("a.example.com", "10.0.0.1"),
        MockValidator::default(),
        MockProber::unreachable("connection refused"),
    );

    let record = h
        .verifier
        .verify_domain(&HostedDomain::new("a.example.com"), ip(SERVER_IP))
        .await;

    assert_eq!(record.category, Category::Direct);
    assert_eq!(
        record.http_status,
        Some(HttpStatus::unreachable("connection refused"))
    );
}

#[tokio::test]
async fn test_healthy_when_live_validation_passes() {
    let h = harness(
        VerifyConfig::default(),
        MockResolver::default().answer("b.example.com", "10.0.0.2"),
        MockValidator::passing(&["b.example.com"]),
        MockProber::status(200),
    );

    let record = h
        .verifier
        .verify_domain(&HostedDomain::new("b.example.com"), ip(SERVER_IP))
        .await;

    assert_eq!(record.category, Category::Healthy);
    assert!(!record.ip_matches);
    assert_eq!(record.live_validation_passed, Some(true));
    assert_eq!(record.resolved_ip, Some(ip("10.0.0.2")));
}

#[tokio::test]
async fn test_mismatched_when_live_validation_fails() {
    let h = harness(
        VerifyConfig::default(),
        MockResolver::default().answer("b.example.com", "10.0.0.2"),
        MockValidator::default(),
        MockProber::status(403),
    );

    let record = h
        .verifier
        .verify_domain(&HostedDomain::new("b.example.com"), ip(SERVER_IP))
        .await;

    assert_eq!(record.category, Category::Mismatched);
    assert_eq!(record.live_validation_passed, Some(false));
    assert!(record.error_reason.unwrap().contains("marker not found"));
    assert_eq!(record.http_status, Some(HttpStatus::code(403)));
}

#[tokio::test]
async fn test_no_ping_on_resolution_timeout_skips_other_stages() {
    let h = harness(
        VerifyConfig::default().with_resolve_timeout(Duration::from_millis(50)),
        MockResolver::default().hang("c.example.com"),
        MockValidator::default(),
        MockProber::status(200),
    );

    let started = Instant::now();
    let record = h
        .verifier
        .verify_domain(&HostedDomain::new("c.example.com"), ip(SERVER_IP))
        .await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(record.category, Category::NoPing);
    assert_eq!(record.resolved_ip, None);
    assert_eq!(record.live_validation_passed, None);
    assert_eq!(record.http_status, None);
    assert!(record.error_reason.unwrap().contains("timed out"));
    assert_eq!(h.validator.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.prober.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_live_validation_timeout_is_mismatched() {
    let validator = MockValidator {
        passes: ["slow.example.com".to_string()].into_iter().collect(),
        delay: Duration::from_secs(30),
        calls: AtomicUsize::new(0),
    };
    let h = harness(
        VerifyConfig::default().with_validation_timeout(Duration::from_millis(50)),
        MockResolver::default().answer("slow.example.com", "10.0.0.9"),
        validator,
        MockProber::status(200),
    );

    let record = h
        .verifier
        .verify_domain(&HostedDomain::new("slow.example.com"), ip(SERVER_IP))
        .await;

    assert_eq!(record.category, Category::Mismatched);
    assert_eq!(record.live_validation_passed, Some(false));
    assert!(record.error_reason.unwrap().contains("live validation"));
}

#[tokio::test]
async fn test_invalid_name_is_no_ping_without_lookup() {
    let h = harness(
        VerifyConfig::default(),
        MockResolver::default(),
        MockValidator::default(),
        MockProber::status(200),
    );

    let record = h
        .verifier
        .verify_domain(&HostedDomain::new("not a domain"), ip(SERVER_IP))
        .await;

    assert_eq!(record.category, Category::NoPing);
    assert!(record
        .error_reason
        .unwrap()
        .to_lowercase()
        .contains("invalid domain"));
    assert_eq!(h.resolver.calls.load(Ordering::SeqCst), 0);
}

// ---------------------------------------------------------------------------
// Whole runs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_run_is_total_and_disjoint() {
    let h = harness(
        VerifyConfig::default().with_concurrency(3),
        MockResolver::default()
            .answer("a.example.com", "10.0.0.1")
            .answer("b.example.com", "10.0.0.2")
            .answer("b2.example.com", "10.0.0.3")
            .answer("e.example.com", "10.0.0.1"),
        MockValidator::passing(&["b.example.com"]),
        MockProber::status(200),
    );

    let input = domains(&[
        "a.example.com",
        "b.example.com",
        "b2.example.com",
        "c.example.com",
        "E.Example.com",
        "a.example.com",
        "bad domain",
    ]);
    let observer = RecordingObserver::default();
    let result = assert_ok!(
        h.verifier
            .verify_domains_with(&input, ip(SERVER_IP), &observer, CancellationToken::new())
            .await
    );

    assert_eq!(result.requested, 6);
    assert_eq!(result.total(), 6);
    assert!(!result.interrupted);

    let mut seen = HashSet::new();
    for category in Category::ALL {
        for name in result.category(category) {
            assert!(seen.insert(name.clone()), "{} listed twice", name);
        }
    }
    assert_eq!(seen.len(), 6);

    assert_eq!(result.category_of("a.example.com"), Some(Category::Direct));
    assert_eq!(result.category_of("e.example.com"), Some(Category::Direct));
    assert_eq!(result.category_of("b.example.com"), Some(Category::Healthy));
    assert_eq!(result.category_of("b2.example.com"), Some(Category::Mismatched));
    assert_eq!(result.category_of("c.example.com"), Some(Category::NoPing));
    assert_eq!(result.category_of("bad domain"), Some(Category::NoPing));

    assert_eq!(result.statuses.len(), 6);
    assert_eq!(result.statuses["a.example.com"], HttpStatus::code(200));
    assert!(result.statuses["c.example.com"].status.is_none());

    let progress = observer.progress.lock().unwrap().clone();
    assert_eq!(progress.len(), 6);
    assert_eq!(progress.last(), Some(&(6, 6)));
    assert!(progress.windows(2).all(|w| w[0].0 < w[1].0));
    assert_eq!(observer.records.lock().unwrap().len(), 6);
    assert_eq!(h.verifier.progress().snapshot(), (6, 6));
}

#[tokio::test]
async fn test_run_is_idempotent_with_frozen_stages() {
    let h = harness(
        VerifyConfig::default(),
        MockResolver::default()
            .answer("a.example.com", "10.0.0.1")
            .answer("b.example.com", "10.0.0.2"),
        MockValidator::passing(&["b.example.com"]),
        MockProber::status(200),
    );
    let input = domains(&["a.example.com", "b.example.com", "c.example.com"]);

    let first = h.verifier.verify_domains(&input).await.unwrap();
    let second = h.verifier.verify_domains(&input).await.unwrap();

    for category in Category::ALL {
        let mut a = first.category(category).to_vec();
        let mut b = second.category(category).to_vec();
        a.sort();
        b.sort();
        assert_eq!(a, b);
    }
    assert_eq!(first.statuses, second.statuses);
}

#[tokio::test]
async fn test_empty_input_is_config_error() {
    let h = harness(
        VerifyConfig::default(),
        MockResolver::default(),
        MockValidator::default(),
        MockProber::status(200),
    );

    let err = assert_err!(h.verifier.verify_domains(&[]).await);
    assert!(err.is_fatal());

    let blank = domains(&["   ", ""]);
    assert!(h.verifier.verify_domains(&blank).await.is_err());
}

#[tokio::test]
async fn test_panicking_task_is_isolated() {
    let h = harness(
        VerifyConfig::default().with_concurrency(2),
        MockResolver::default()
            .answer("a.example.com", "10.0.0.1")
            .answer("b.example.com", "10.0.0.1")
            .panic_on("boom.example.com"),
        MockValidator::default(),
        MockProber::status(200),
    );

    let input = domains(&["a.example.com", "boom.example.com", "b.example.com"]);
    let result = h.verifier.verify_domains(&input).await.unwrap();

    assert_eq!(result.total(), 3);
    assert_eq!(result.direct.len(), 2);
    assert_eq!(result.no_ping, vec!["boom.example.com"]);
    let record = result
        .records
        .iter()
        .find(|r| r.name == "boom.example.com")
        .unwrap();
    assert!(record.error_reason.as_deref().unwrap().contains("aborted"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_in_flight_never_exceeds_pool_size() {
    let names: Vec<String> = (0..40).map(|i| format!("d{}.example.com", i)).collect();
    let mut resolver = MockResolver::default().with_delay(Duration::from_millis(20));
    for name in &names {
        resolver = resolver.answer(name, "10.0.0.1");
    }

    let h = harness(
        VerifyConfig::default().with_concurrency(4),
        resolver,
        MockValidator::default(),
        MockProber::status(200),
    );

    let input: Vec<HostedDomain> = names.iter().map(|n| HostedDomain::new(n.as_str())).collect();
    let result = h.verifier.verify_domains(&input).await.unwrap();

    assert_eq!(result.direct.len(), 40);
    let max = h.resolver.max_in_flight.load(Ordering::SeqCst);
    assert!(max <= 4, "saw {} concurrent lookups", max);
    assert!(max >= 2, "pool never ran in parallel");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_hundred_domains_complete_in_pool_time() {
    let names: Vec<String> = (0..100).map(|i| format!("site{}.example.com", i)).collect();
    let mut resolver = MockResolver::default().with_delay(Duration::from_millis(50));
    for name in &names {
        resolver = resolver.answer(name, "10.0.0.1");
    }

    let h = harness(
        VerifyConfig::default().with_concurrency(4),
        resolver,
        MockValidator::default(),
        MockProber::status(200),
    );

    let input: Vec<HostedDomain> = names.iter().map(|n| HostedDomain::new(n.as_str())).collect();
    let started = Instant::now();
    let result = h.verifier.verify_domains(&input).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(result.total(), 100);
    // 25 waves of 50ms each
    assert!(elapsed >= Duration::from_millis(1200), "too fast: {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(3000), "too slow: {:?}", elapsed);
}

#[tokio::test]
async fn test_cancel_before_start_dispatches_nothing() {
    let h = harness(
        VerifyConfig::default(),
        MockResolver::default().answer("a.example.com", "10.0.0.1"),
        MockValidator::default(),
        MockProber::status(200),
    );

    let cancel = CancellationToken::new();
    cancel.cancel();

    let input = domains(&["a.example.com", "b.example.com"]);
    let result = h
        .verifier
        .verify_domains_with(&input, ip(SERVER_IP), &domain_audit_lib::NoopObserver, cancel)
        .await
        .unwrap();

    assert!(result.interrupted);
    assert_eq!(result.total(), 0);
    assert_eq!(result.requested, 2);
    assert_eq!(h.resolver.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancel_mid_run_keeps_classified_records() {
    let names: Vec<String> = (0..30).map(|i| format!("c{}.example.com", i)).collect();
    let mut resolver = MockResolver::default().with_delay(Duration::from_millis(40));
    for name in &names {
        resolver = resolver.answer(name, "10.0.0.1");
    }

    let h = harness(
        VerifyConfig::default().with_concurrency(2),
        resolver,
        MockValidator::default(),
        MockProber::status(200),
    );

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        trigger.cancel();
    });

    let input: Vec<HostedDomain> = names.iter().map(|n| HostedDomain::new(n.as_str())).collect();
    let result = h
        .verifier
        .verify_domains_with(&input, ip(SERVER_IP), &domain_audit_lib::NoopObserver, cancel)
        .await
        .unwrap();

    assert!(result.interrupted);
    assert!(result.total() >= 2);
    assert!(result.total() < 30);
    assert_eq!(result.records.len(), result.total());
    assert_eq!(
        h.resolver.calls.load(Ordering::SeqCst),
        result.total(),
        "every dispatched domain is classified"
    );
}

// ---------------------------------------------------------------------------
// HTTP stages against a local server
// ---------------------------------------------------------------------------

/// What the local HTTP server answers with.
#[derive(Clone)]
enum Fixture {
    /// Serve files from this directory; `/` returns `index`
    Files { root: PathBuf, index: &'static str },
    /// Answer every request with the same body
    Fixed { code: u16, body: &'static str },
}

async fn spawn_http_fixture(fixture: Fixture) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            let fixture = fixture.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 8192];
                let mut read = 0;
                while read < buf.len() {
                    match stream.read(&mut buf[read..]).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => read += n,
                    }
                    if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }

                let request = String::from_utf8_lossy(&buf[..read]);
                let path = request
                    .lines()
                    .next()
                    .and_then(|line| line.split_whitespace().nth(1))
                    .unwrap_or("/")
                    .to_string();

                let (code, body) = match &fixture {
                    Fixture::Fixed { code, body } => (*code, body.to_string()),
                    Fixture::Files { index, .. } if path == "/" => (200, index.to_string()),
                    Fixture::Files { root, .. } => {
                        match std::fs::read_to_string(root.join(path.trim_start_matches('/'))) {
                            Ok(content) => (200, content),
                            Err(_) => (404, "not found".to_string()),
                        }
                    }
                };

                let response = format!(
                    "HTTP/1.1 {} X\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    code,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    port
}

fn dir_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

/// Stage settings for requests to the local server on `port`.
fn http_settings(port: u16) -> HttpSettings {
    HttpSettings::new(domain_audit_lib::DEFAULT_USER_AGENT, Duration::from_secs(5), port)
}

fn loopback() -> IpAddr {
    ip("127.0.0.1")
}

/// Local server that accepts connections and never answers.
async fn spawn_silent_listener() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    port
}

#[tokio::test]
async fn test_marker_round_trip_succeeds_and_cleans_up() {
    let docroot = TempDir::new().unwrap();
    let port = spawn_http_fixture(Fixture::Files {
        root: docroot.path().to_path_buf(),
        index: "home",
    })
    .await;

    let validator = MarkerValidator::new(http_settings(port), "domain-audit-");
    // The name is never looked up: requests go to the address passed in.
    let domain = HostedDomain::new("site.does-not-exist.invalid").with_document_root(docroot.path());

    assert_ok!(validator.validate(&domain, loopback()).await);
    assert_eq!(dir_entries(docroot.path()), 0);
}

#[tokio::test]
async fn test_marker_not_served_fails_and_cleans_up() {
    let docroot = TempDir::new().unwrap();
    let port = spawn_http_fixture(Fixture::Fixed {
        code: 404,
        body: "not here",
    })
    .await;

    let validator = MarkerValidator::new(http_settings(port), "domain-audit-");
    let domain = HostedDomain::new("site.example.com").with_document_root(docroot.path());

    let err = assert_err!(validator.validate(&domain, loopback()).await);
    assert!(err.to_string().contains("404"));
    assert_eq!(dir_entries(docroot.path()), 0);
}

#[tokio::test]
async fn test_marker_with_wrong_content_fails() {
    let docroot = TempDir::new().unwrap();
    let port = spawn_http_fixture(Fixture::Fixed {
        code: 200,
        body: "some other server",
    })
    .await;

    let validator = MarkerValidator::new(http_settings(port), "domain-audit-");
    let domain = HostedDomain::new("site.example.com").with_document_root(docroot.path());

    assert_err!(validator.validate(&domain, loopback()).await);
    assert_eq!(dir_entries(docroot.path()), 0);
}

#[tokio::test]
async fn test_marker_removed_when_validation_times_out() {
    let docroot = TempDir::new().unwrap();
    let port = spawn_silent_listener().await;

    let resolver = MockResolver::default().answer("slow.example.com", "127.0.0.1");
    let verifier = DomainVerifier::from_parts(
        VerifyConfig::default()
            .with_server_ip(ip(SERVER_IP))
            .with_validation_timeout(Duration::from_millis(300)),
        Arc::new(resolver),
        Arc::new(MarkerValidator::new(http_settings(port), "domain-audit-")),
        Arc::new(MockProber::status(200)),
    );

    let domain = HostedDomain::new("slow.example.com").with_document_root(docroot.path());
    let record = verifier.verify_domain(&domain, ip(SERVER_IP)).await;

    assert_eq!(record.category, Category::Mismatched);
    assert_eq!(record.live_validation_passed, Some(false));
    assert!(record
        .error_reason
        .as_deref()
        .unwrap()
        .contains("live validation"));
    assert_eq!(dir_entries(docroot.path()), 0);
}

#[tokio::test]
async fn test_http_stages_use_resolved_address() {
    let docroot = TempDir::new().unwrap();
    let port = spawn_http_fixture(Fixture::Files {
        root: docroot.path().to_path_buf(),
        index: "<html><title>Shop</title></html>",
    })
    .await;

    // Only the mock resolver knows this name; the system resolver cannot.
    let name = "shop.does-not-exist.invalid";
    let verifier = DomainVerifier::from_parts(
        VerifyConfig::default().with_server_ip(ip(SERVER_IP)),
        Arc::new(MockResolver::default().answer(name, "127.0.0.1")),
        Arc::new(MarkerValidator::new(http_settings(port), "domain-audit-")),
        Arc::new(HttpStatusProbe::new(http_settings(port), "/")),
    );

    let domain = HostedDomain::new(name).with_document_root(docroot.path());
    let record = verifier.verify_domain(&domain, ip(SERVER_IP)).await;

    assert_eq!(record.category, Category::Healthy);
    assert_eq!(record.resolved_ip, Some(loopback()));
    assert_eq!(record.http_status, Some(HttpStatus::code(200)));
    assert_eq!(dir_entries(docroot.path()), 0);
}

#[tokio::test]
async fn test_status_probe_reports_codes_and_listings() {
    let listing = spawn_http_fixture(Fixture::Fixed {
        code: 200,
        body: "<html><head><title>Index of /</title></head><body></body></html>",
    })
    .await;
    let probe = HttpStatusProbe::new(http_settings(listing), "/");
    let status = assert_ok!(probe.probe("files.example.com", loopback()).await);
    assert_eq!(status.status, Some(200));
    assert_eq!(status.reason.as_deref(), Some("index of"));

    let plain = spawn_http_fixture(Fixture::Fixed {
        code: 200,
        body: "<html><title>Welcome</title></html>",
    })
    .await;
    let probe = HttpStatusProbe::new(http_settings(plain), "/");
    assert_eq!(
        assert_ok!(probe.probe("www.example.com", loopback()).await),
        HttpStatus::code(200)
    );

    let missing = spawn_http_fixture(Fixture::Fixed {
        code: 503,
        body: "down",
    })
    .await;
    let probe = HttpStatusProbe::new(http_settings(missing), "/");
    assert_eq!(
        assert_ok!(probe.probe("127.0.0.1", loopback()).await),
        HttpStatus::code(503)
    );
}

#[tokio::test]
async fn test_status_probe_connection_refused() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let probe = HttpStatusProbe::new(http_settings(port), "/");
    let err = assert_err!(probe.probe("closed.example.com", loopback()).await);
    let message = match err {
        DomainAuditError::ProbeFailure { message, .. } => message,
        other => panic!("expected a probe failure, got {:?}", other),
    };

    // Each cause appears once in the recorded reason.
    let segments: Vec<&str> = message.split(": ").collect();
    let unique: HashSet<&str> = segments.iter().copied().collect();
    assert_eq!(segments.len(), unique.len(), "repeated causes in {:?}", message);
}

// ---------------------------------------------------------------------------
// Build settings
// ---------------------------------------------------------------------------

#[test]
fn test_release_profile_keeps_panics_recoverable() {
    // A panicking verification task is recorded as NoPing only if panics unwind.
    let manifest = concat!(env!("CARGO_MANIFEST_DIR"), "/../Cargo.toml");
    let workspace: toml::Value = toml::from_str(&std::fs::read_to_string(manifest).unwrap()).unwrap();

    let strategy = workspace
        .get("profile")
        .and_then(|p| p.get("release"))
        .and_then(|r| r.get("panic"))
        .and_then(|p| p.as_str())
        .unwrap_or("unwind");
    assert_eq!(strategy, "unwind");
}
