//! Console display logic for domain-audit.
//!
//! This module handles all text output: colored result lines with progress
//! counters, grouped `--pretty` sections, the spinner, the header and the
//! summary bar. Uses only the `console` crate.

use console::{pad_str, style, Alignment, StyledObject, Term};
use domain_audit_lib::{Category, DomainRecord, RunResult, VerificationObserver};
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const DOMAIN_WIDTH: usize = 36;

// ── Spinner ──────────────────────────────────────────────────────────────────

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// An async braille-dot spinner that writes to stderr so stdout stays clean.
pub struct Spinner {
    running: Arc<AtomicBool>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl Spinner {
    /// Start a new spinner with the given message (e.g. "Verifying 8 domains...").
    pub fn start(message: String) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();

        let handle = tokio::spawn(async move {
            let term = Term::stderr();
            let mut idx = 0usize;
            while running_clone.load(Ordering::Relaxed) {
                let frame = SPINNER_FRAMES[idx % SPINNER_FRAMES.len()];
                let _ = term.clear_line();
                let _ = term.write_str(&format!("{} {}", style(frame).cyan(), message));
                idx += 1;
                tokio::time::sleep(Duration::from_millis(80)).await;
            }
            let _ = term.clear_line();
        });

        Self {
            running,
            handle: Some(handle),
        }
    }

    /// Stop the spinner and clear the line.
    pub async fn stop(mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(h) = self.handle.take() {
            let _ = h.await;
        }
    }
}

// ── Header ───────────────────────────────────────────────────────────────────

/// Print a styled header at the start of a text run.
pub fn print_header(domain_count: usize, concurrency: usize, server_ip: IpAddr, source: &str) {
    println!(
        "{} {} {}",
        style("domain-audit").bold(),
        style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim(),
        style(format!(
            "- Verifying {} domain{}",
            domain_count,
            if domain_count == 1 { "" } else { "s" }
        ))
        .dim(),
    );
    println!(
        "{}",
        style(format!(
            "Server IP: {} | Source: {} | Concurrency: {}",
            server_ip, source, concurrency
        ))
        .dim()
    );
    println!();
}

// ── Result lines ─────────────────────────────────────────────────────────────

fn category_label(category: Category) -> StyledObject<String> {
    let label = category.to_string().to_uppercase();
    match category {
        Category::Direct => style(label).green().bold(),
        Category::Healthy => style(label).cyan().bold(),
        Category::Mismatched => style(label).yellow().bold(),
        Category::NoPing => style(label).red().bold(),
    }
}

/// Short detail shown after a record: resolved address and HTTP status, or
/// the failure for unresolved domains.
pub fn record_detail(record: &DomainRecord) -> String {
    match record.resolved_ip {
        Some(ip) => {
            let status = record
                .http_status
                .as_ref()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string());
            format!("{}  HTTP {}", ip, status)
        }
        None => brief_error(record).to_string(),
    }
}

/// Format and print a single record with colors and alignment.
///
/// If `counter` is Some((current, total)), a progress prefix like `[3/8]` is shown.
pub fn print_record(record: &DomainRecord, debug: bool, counter: Option<(usize, usize)>) {
    let padded_domain = pad_str(&record.name, DOMAIN_WIDTH, Alignment::Left, Some(".."));

    let prefix = match counter {
        Some((cur, total)) => format!("{} ", style(format!("[{}/{}]", cur, total)).dim()),
        None => String::new(),
    };

    println!(
        "  {}{}  {:<12}  {}",
        prefix,
        style(&padded_domain).white(),
        category_label(record.category),
        style(record_detail(record)).dim(),
    );

    if debug {
        print_debug_line(record, "    ");
    }
}

fn print_debug_line(record: &DomainRecord, indent: &str) {
    if let Some(reason) = &record.error_reason {
        println!("{}{} {}", indent, style("└─").dim(), style(reason).dim());
    }
    if let Some(duration) = record.check_duration {
        println!(
            "{}{} Verified in {}ms",
            indent,
            style("└─").dim(),
            duration.as_millis()
        );
    }
}

/// Prints each record as soon as it completes.
pub struct LivePrinter {
    total: usize,
    printed: AtomicUsize,
    debug: bool,
}

impl LivePrinter {
    pub fn new(total: usize, debug: bool) -> Self {
        Self {
            total,
            printed: AtomicUsize::new(0),
            debug,
        }
    }
}

impl VerificationObserver for LivePrinter {
    fn on_record(&self, record: &DomainRecord) {
        let current = self.printed.fetch_add(1, Ordering::SeqCst) + 1;
        print_record(record, self.debug, Some((current, self.total)));
    }
}

// ── Grouped output ───────────────────────────────────────────────────────────

/// Print results grouped by category. Empty sections are omitted entirely.
pub fn print_grouped_results(result: &RunResult, debug: bool) {
    for category in Category::ALL {
        let records: Vec<&DomainRecord> = result
            .records
            .iter()
            .filter(|r| r.category == category)
            .collect();
        if records.is_empty() {
            continue;
        }

        let title = format!("── {} ({}) ", category, records.len());
        let rule = "─".repeat(52usize.saturating_sub(title.chars().count()));
        let (title, rule) = match category {
            Category::Direct => (style(title).green().bold(), style(rule).green().dim()),
            Category::Healthy => (style(title).cyan().bold(), style(rule).cyan().dim()),
            Category::Mismatched => (style(title).yellow().bold(), style(rule).yellow().dim()),
            Category::NoPing => (style(title).red().bold(), style(rule).red().dim()),
        };
        println!("  {}{}", title, rule);

        for record in records {
            let padded = pad_str(&record.name, DOMAIN_WIDTH, Alignment::Left, Some(".."));
            println!(
                "    {}  {}",
                style(&padded).white(),
                style(record_detail(record)).dim()
            );
            if debug {
                print_debug_line(record, "      ");
            }
        }
        println!();
    }
}

// ── Summary ──────────────────────────────────────────────────────────────────

/// Print the final summary bar with colored counts.
pub fn print_summary(result: &RunResult) {
    let total = result.total();
    println!(
        "  {}",
        style("────────────────────────────────────────────────────").dim()
    );
    println!(
        "  {} domain{} in {:.1}s  {}  {}  {}  {}  {}  {}  {}  {}",
        style(total).bold(),
        if total == 1 { "" } else { "s" },
        result.duration.as_secs_f64(),
        style("|").dim(),
        style(format!("{} direct", result.direct.len())).green(),
        style("|").dim(),
        style(format!("{} healthy", result.healthy.len())).cyan(),
        style("|").dim(),
        style(format!("{} mismatched", result.mismatched.len())).yellow(),
        style("|").dim(),
        style(format!("{} no ping", result.no_ping.len())).red(),
    );

    if result.interrupted {
        println!(
            "  {}",
            style(format!(
                "Interrupted: {} of {} domains were not verified",
                result.requested.saturating_sub(total),
                result.requested
            ))
            .yellow()
        );
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Extract a brief reason for an unresolved record.
fn brief_error(record: &DomainRecord) -> &'static str {
    match &record.error_reason {
        Some(msg) => {
            let m = msg.to_lowercase();
            if m.contains("invalid domain") {
                "(invalid name)"
            } else if m.contains("timeout") || m.contains("timed out") {
                "(timeout)"
            } else if m.contains("nxdomain") || m.contains("no record") || m.contains("no address") {
                "(no records)"
            } else if m.contains("aborted") {
                "(aborted)"
            } else {
                "(resolution failed)"
            }
        }
        None => "(unresolved)",
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
