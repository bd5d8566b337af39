//! Report rendering and result files.
//!
//! `--json` and `--csv` render the whole run to stdout. `--output-dir` writes
//! one plain list per category plus a combined list and a JSON report, so the
//! lists can be fed straight into migration tooling.

use domain_audit_lib::{Category, DomainRecord, RunResult};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Domains still served from this server (Direct then Healthy).
pub const COMBINED_FILE: &str = "combined_domains.txt";

/// Full run result as JSON.
pub const REPORT_FILE: &str = "domain_report.json";

/// `<slug>_domains.txt` for a category.
pub fn category_file_name(category: Category) -> String {
    format!("{}_domains.txt", category.slug())
}

fn write_list(path: &Path, names: &[String]) -> io::Result<()> {
    let mut content = names.join("\n");
    if !content.is_empty() {
        content.push('\n');
    }
    fs::write(path, content)
}

/// Write the category lists, the combined list and the JSON report into
/// `dir`, creating it if needed. Returns the files written.
pub fn write_result_files(result: &RunResult, dir: &Path) -> io::Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    for category in Category::ALL {
        let path = dir.join(category_file_name(category));
        write_list(&path, result.category(category))?;
        written.push(path);
    }

    let combined = dir.join(COMBINED_FILE);
    write_list(&combined, &result.combined())?;
    written.push(combined);

    let report = dir.join(REPORT_FILE);
    let json = render_json(result).map_err(io::Error::other)?;
    fs::write(&report, json)?;
    written.push(report);

    Ok(written)
}

/// Whole run as pretty-printed JSON.
pub fn render_json(result: &RunResult) -> serde_json::Result<String> {
    serde_json::to_string_pretty(result)
}

/// One CSV row per record, in completion order.
pub fn render_csv(result: &RunResult) -> String {
    let mut out = String::from(
        "domain,category,resolved_ip,server_ip,ip_matches,live_validation,http_status,reason\n",
    );
    for record in &result.records {
        out.push_str(&csv_row(record));
        out.push('\n');
    }
    out
}

fn csv_row(record: &DomainRecord) -> String {
    let resolved = record
        .resolved_ip
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "-".to_string());
    let live = match record.live_validation_passed {
        Some(true) => "passed",
        Some(false) => "failed",
        None => "-",
    };
    let status = record
        .http_status
        .as_ref()
        .and_then(|s| s.status)
        .map(|code| code.to_string())
        .unwrap_or_else(|| "-".to_string());
    let reason = record
        .error_reason
        .as_deref()
        .or_else(|| record.http_status.as_ref().and_then(|s| s.reason.as_deref()))
        .unwrap_or("-");

    [
        csv_field(&record.name),
        record.category.slug().to_string(),
        resolved,
        record.server_ip.to_string(),
        record.ip_matches.to_string(),
        live.to_string(),
        status,
        csv_field(reason),
    ]
    .join(",")
}

/// Quote a field when it contains a separator, quote or newline.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
