//! Domain Audit CLI Application
//!
//! A command-line interface that checks whether the domains hosted on this
//! server still point at it. Domains come from the installed control panel
//! (cPanel or DirectAdmin), from the command line, or from a file.

mod export;
mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use console::style;
use domain_audit_lib::{
    dedupe_domains, load_env_config, panel_source, parse_duration_string, resolve_server_ip,
    ConfigManager, DomainSource, DomainVerifier, EnvConfig, FileConfig, HostedDomain, NoopObserver,
    PanelKind, StaticSource, VerifyConfig, MAX_POOL_SIZE, PANEL_CHOICES,
};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::process;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// Exit code for a run stopped with Ctrl-C.
const EXIT_INTERRUPTED: i32 = 130;

/// CLI arguments for domain-audit
#[derive(Parser, Debug)]
#[command(name = "domain-audit")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Check whether the domains hosted on this server still point at it")]
#[command(
    long_about = "Resolve every hosted domain and compare it with this server's IP.\n\nDomains that point elsewhere are checked by writing a marker file into their document root and reading it back over HTTP. Each domain is reported as Direct, Healthy, Mismatched or No Ping."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Domain names to verify (default: discover from the control panel)
    #[arg(value_name = "DOMAINS", help_heading = "Domain Selection")]
    pub domains: Vec<String>,

    /// Input file with domains (one per line, optional document root column)
    #[arg(
        short = 'f',
        long = "file",
        value_name = "FILE",
        help_heading = "Domain Selection"
    )]
    pub file: Option<String>,

    /// Control panel to discover domains from: auto, cpanel, directadmin, none
    #[arg(long = "panel", value_name = "PANEL", help_heading = "Domain Selection")]
    pub panel: Option<String>,

    /// Print the domains that would be verified and exit
    #[arg(long = "dry-run", help_heading = "Domain Selection")]
    pub dry_run: bool,

    /// This server's IP (default: detect the primary outbound address)
    #[arg(long = "server-ip", value_name = "IP", help_heading = "Verification")]
    pub server_ip: Option<IpAddr>,

    /// Nameserver to query instead of the system resolver
    #[arg(long = "nameserver", value_name = "IP", help_heading = "Verification")]
    pub nameserver: Option<String>,

    /// Path requested by the status probe
    #[arg(long = "probe-path", value_name = "PATH", help_heading = "Verification")]
    pub probe_path: Option<String>,

    /// Output results in JSON format
    #[arg(short = 'j', long = "json", help_heading = "Output Format")]
    pub json: bool,

    /// Output results in CSV format
    #[arg(long = "csv", help_heading = "Output Format")]
    pub csv: bool,

    /// Group results by category instead of listing them as they complete
    #[arg(short = 'p', long = "pretty", help_heading = "Output Format")]
    pub pretty: bool,

    /// Write category lists and a JSON report into this directory
    #[arg(
        short = 'o',
        long = "output-dir",
        value_name = "DIR",
        help_heading = "Output Format"
    )]
    pub output_dir: Option<String>,

    /// Max domains verified at once (default: CPU cores, min 2)
    #[arg(short = 'c', long = "concurrency", help_heading = "Performance")]
    pub concurrency: Option<usize>,

    /// DNS timeout per domain (e.g. 5s, 500ms)
    #[arg(long = "resolve-timeout", value_name = "DURATION", help_heading = "Performance")]
    pub resolve_timeout: Option<String>,

    /// Live validation timeout per domain
    #[arg(
        long = "validation-timeout",
        value_name = "DURATION",
        help_heading = "Performance"
    )]
    pub validation_timeout: Option<String>,

    /// Status probe timeout per domain
    #[arg(long = "probe-timeout", value_name = "DURATION", help_heading = "Performance")]
    pub probe_timeout: Option<String>,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Also write logs to this file
    #[arg(long = "log-file", value_name = "FILE", help_heading = "Configuration")]
    pub log_file: Option<String>,

    /// Show detailed debug information and error messages
    #[arg(short = 'd', long = "debug", help_heading = "Configuration")]
    pub debug: bool,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

/// Console rendering of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

impl OutputFormat {
    fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "text" => Some(OutputFormat::Text),
            "json" => Some(OutputFormat::Json),
            "csv" => Some(OutputFormat::Csv),
            _ => None,
        }
    }
}

/// Everything a run needs after all configuration layers are merged.
#[derive(Debug, Clone)]
pub struct Settings {
    pub verify: VerifyConfig,
    pub panel: String,
    pub output_dir: Option<PathBuf>,
    pub format: OutputFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            verify: VerifyConfig::default(),
            panel: "auto".to_string(),
            output_dir: None,
            format: OutputFormat::Text,
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Validate arguments
    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    let guard = match init_logging(&args) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let code = match run_audit(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    };

    // Flush the log file before exiting.
    drop(guard);
    process::exit(code);
}

/// Validate command line arguments
fn validate_args(args: &Args) -> Result<(), String> {
    if args.json && args.csv {
        return Err("Cannot specify multiple output formats (--json, --csv)".to_string());
    }

    if args.pretty && (args.json || args.csv) {
        return Err("Cannot use --pretty with --json or --csv".to_string());
    }

    if let Some(concurrency) = args.concurrency {
        if concurrency == 0 || concurrency > MAX_POOL_SIZE {
            return Err(format!("Concurrency must be between 1 and {}", MAX_POOL_SIZE));
        }
    }

    for (flag, value) in [
        ("--resolve-timeout", &args.resolve_timeout),
        ("--validation-timeout", &args.validation_timeout),
        ("--probe-timeout", &args.probe_timeout),
    ] {
        if let Some(value) = value {
            if parse_duration_string(value).map_or(true, |d| d.is_zero()) {
                return Err(format!(
                    "Invalid {} '{}'. Use format like '500ms', '5s', '2m'",
                    flag, value
                ));
            }
        }
    }

    if let Some(nameserver) = &args.nameserver {
        if nameserver.parse::<IpAddr>().is_err() {
            return Err(format!("Invalid --nameserver '{}': not an IP address", nameserver));
        }
    }

    if let Some(panel) = &args.panel {
        if !PANEL_CHOICES.contains(&panel.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid --panel '{}'. Use one of: {}",
                panel,
                PANEL_CHOICES.join(", ")
            ));
        }
    }

    Ok(())
}

/// Install the tracing subscriber: stderr always, plus a plain-text file
/// when `--log-file` is given. The returned guard must outlive the run.
fn init_logging(args: &Args) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
    let level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,domain_audit={0},domain_audit_lib={0}",
            level
        ))
    });

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let (file_layer, guard) = match &args.log_file {
        Some(log_file) => {
            let path = Path::new(log_file);
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            let file_name = path
                .file_name()
                .ok_or_else(|| format!("Invalid --log-file '{}'", log_file))?;

            std::fs::create_dir_all(dir)?;
            let file_appender = tracing_appender::rolling::never(dir, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}

/// Main verification logic. Returns the process exit code.
async fn run_audit(args: Args) -> Result<i32, Box<dyn std::error::Error>> {
    let settings = build_settings(&args)?;
    info!(?settings, "Effective configuration");

    let (source_name, domains) = get_domains_to_verify(&args, &settings).await?;
    let domains = dedupe_domains(&domains);
    if domains.is_empty() {
        return Err(format!("No domains found via {}", source_name).into());
    }

    if args.dry_run {
        print_dry_run(&domains, &source_name);
        return Ok(0);
    }

    let server_ip = resolve_server_ip(&settings.verify).await?;
    let verifier = DomainVerifier::with_config(settings.verify.clone())?;
    let cancel = spawn_interrupt_handler();

    let text = settings.format == OutputFormat::Text;
    if text {
        ui::print_header(
            domains.len(),
            settings.verify.concurrency,
            server_ip,
            &source_name,
        );
    }

    let result = if text && !args.pretty {
        let printer = ui::LivePrinter::new(domains.len(), args.debug);
        verifier
            .verify_domains_with(&domains, server_ip, &printer, cancel)
            .await?
    } else if text {
        let spinner = ui::Spinner::start(format!("Verifying {} domains...", domains.len()));
        let result = verifier
            .verify_domains_with(&domains, server_ip, &NoopObserver, cancel)
            .await;
        spinner.stop().await;
        result?
    } else {
        verifier
            .verify_domains_with(&domains, server_ip, &NoopObserver, cancel)
            .await?
    };

    match settings.format {
        OutputFormat::Json => println!("{}", export::render_json(&result)?),
        OutputFormat::Csv => print!("{}", export::render_csv(&result)),
        OutputFormat::Text => {
            if args.pretty {
                ui::print_grouped_results(&result, args.debug);
            } else {
                println!();
            }
            ui::print_summary(&result);
        }
    }

    if let Some(dir) = &settings.output_dir {
        let written = export::write_result_files(&result, dir)
            .map_err(|e| format!("Failed to write results to '{}': {}", dir.display(), e))?;
        info!(files = written.len(), dir = %dir.display(), "Result files written");
        if text {
            println!();
            println!(
                "  {} {}",
                style("Files saved in").dim(),
                style(dir.display()).bold()
            );
        }
    }

    Ok(if result.interrupted { EXIT_INTERRUPTED } else { 0 })
}

/// First Ctrl-C stops dispatching and lets in-flight domains finish; a
/// second one exits immediately.
fn spawn_interrupt_handler() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("Interrupted, finishing domains already in flight (Ctrl-C again to abort)");
        token.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            process::exit(EXIT_INTERRUPTED);
        }
    });

    cancel
}

fn print_dry_run(domains: &[HostedDomain], source_name: &str) {
    println!(
        "{} {}",
        style(format!("{} domain{}", domains.len(), if domains.len() == 1 { "" } else { "s" }))
            .bold(),
        style(format!("from {}", source_name)).dim()
    );
    for domain in domains {
        match &domain.document_root {
            Some(root) => println!("  {}  {}", domain.name, style(root.display()).dim()),
            None => println!("  {}", domain.name),
        }
    }
}

/// Build the effective settings with proper precedence.
///
/// Precedence (highest first):
/// 1. CLI arguments
/// 2. Environment variables (DA_*)
/// 3. Explicit config file (--config or DA_CONFIG)
/// 4. Discovered config files (./domain-audit.toml, ~/.domain-audit.toml, XDG)
/// 5. Built-in defaults
fn build_settings(args: &Args) -> Result<Settings, Box<dyn std::error::Error>> {
    let env_config = load_env_config();
    let config_manager = ConfigManager::new(args.verbose);

    let explicit_path = args.config.clone().or_else(|| env_config.config.clone());
    let file_config = match explicit_path {
        Some(path) => {
            info!(path = %path, "Using explicit config file");
            config_manager
                .load_file(&path)
                .map_err(|e| format!("Failed to load config file '{}': {}", path, e))?
        }
        None => config_manager.discover_and_load(),
    };

    let settings = apply_file_config(Settings::default(), file_config);
    let settings = apply_environment_config(settings, &env_config);
    Ok(apply_cli_args(settings, args))
}

/// Merge FileConfig into Settings. Values were validated when the file was loaded.
fn apply_file_config(mut settings: Settings, file_config: FileConfig) -> Settings {
    if let Some(defaults) = file_config.defaults {
        if let Some(concurrency) = defaults.concurrency {
            settings.verify = settings.verify.with_concurrency(concurrency);
        }
        if let Some(timeout) = defaults.resolve_timeout.as_deref().and_then(parse_duration_string) {
            settings.verify.resolve_timeout = timeout;
        }
        if let Some(timeout) = defaults
            .validation_timeout
            .as_deref()
            .and_then(parse_duration_string)
        {
            settings.verify.validation_timeout = timeout;
        }
        if let Some(timeout) = defaults.probe_timeout.as_deref().and_then(parse_duration_string) {
            settings.verify.probe_timeout = timeout;
        }
        if let Some(ip) = defaults.server_ip.as_deref().and_then(|s| s.parse().ok()) {
            settings.verify.server_ip = Some(ip);
        }
        if let Some(nameserver) = defaults.nameserver {
            settings.verify.nameserver = Some(nameserver);
        }
        if let Some(panel) = defaults.panel {
            settings.panel = panel.to_lowercase();
        }
    }

    if let Some(probe) = file_config.probe {
        if let Some(path) = probe.path {
            settings.verify.probe_path = path;
        }
        if let Some(user_agent) = probe.user_agent {
            settings.verify.user_agent = user_agent;
        }
    }

    if let Some(prefix) = file_config.validation.and_then(|v| v.marker_prefix) {
        settings.verify.marker_prefix = prefix;
    }

    if let Some(output) = file_config.output {
        if let Some(directory) = output.directory {
            settings.output_dir = Some(PathBuf::from(directory));
        }
        if let Some(format) = output.default_format.as_deref().and_then(OutputFormat::from_name) {
            settings.format = format;
        }
    }

    settings
}

/// Apply DA_* environment variables to settings.
fn apply_environment_config(mut settings: Settings, env_config: &EnvConfig) -> Settings {
    if let Some(concurrency) = env_config.concurrency {
        settings.verify = settings.verify.with_concurrency(concurrency);
    }
    if let Some(timeout) = env_config.resolve_timeout {
        settings.verify.resolve_timeout = timeout;
    }
    if let Some(timeout) = env_config.validation_timeout {
        settings.verify.validation_timeout = timeout;
    }
    if let Some(timeout) = env_config.probe_timeout {
        settings.verify.probe_timeout = timeout;
    }
    if let Some(ip) = env_config.server_ip {
        settings.verify.server_ip = Some(ip);
    }
    if let Some(nameserver) = &env_config.nameserver {
        settings.verify.nameserver = Some(nameserver.clone());
    }
    if let Some(panel) = &env_config.panel {
        settings.panel = panel.clone();
    }
    if let Some(dir) = &env_config.output_dir {
        settings.output_dir = Some(PathBuf::from(dir));
    }

    if env_config.has_output_format_conflict() {
        warn!("Both DA_JSON and DA_CSV are set to true, using JSON");
    }
    if env_config.json == Some(true) {
        settings.format = OutputFormat::Json;
    } else if env_config.csv == Some(true) {
        settings.format = OutputFormat::Csv;
    } else if env_config.json == Some(false) && settings.format == OutputFormat::Json
        || env_config.csv == Some(false) && settings.format == OutputFormat::Csv
    {
        settings.format = OutputFormat::Text;
    }

    settings
}

/// Apply CLI arguments to settings (highest precedence).
fn apply_cli_args(mut settings: Settings, args: &Args) -> Settings {
    if let Some(concurrency) = args.concurrency {
        settings.verify = settings.verify.with_concurrency(concurrency);
    }
    if let Some(timeout) = args.resolve_timeout.as_deref().and_then(parse_duration_string) {
        settings.verify.resolve_timeout = timeout;
    }
    if let Some(timeout) = args
        .validation_timeout
        .as_deref()
        .and_then(parse_duration_string)
    {
        settings.verify.validation_timeout = timeout;
    }
    if let Some(timeout) = args.probe_timeout.as_deref().and_then(parse_duration_string) {
        settings.verify.probe_timeout = timeout;
    }
    if let Some(ip) = args.server_ip {
        settings.verify.server_ip = Some(ip);
    }
    if let Some(nameserver) = &args.nameserver {
        settings.verify.nameserver = Some(nameserver.clone());
    }
    if let Some(path) = &args.probe_path {
        settings.verify.probe_path = path.clone();
    }
    if let Some(panel) = &args.panel {
        settings.panel = panel.to_lowercase();
    }
    if let Some(dir) = &args.output_dir {
        settings.output_dir = Some(PathBuf::from(dir));
    }

    // Only explicit flags override; the default (false) keeps env/config values.
    if args.json {
        settings.format = OutputFormat::Json;
    } else if args.csv {
        settings.format = OutputFormat::Csv;
    } else if args.pretty {
        settings.format = OutputFormat::Text;
    }

    settings
}

/// Get the domains to verify from CLI args and file, or from the control panel.
///
/// Returns the name of the source alongside the domains.
async fn get_domains_to_verify(
    args: &Args,
    settings: &Settings,
) -> Result<(String, Vec<HostedDomain>), Box<dyn std::error::Error>> {
    let source: Box<dyn DomainSource> = if !args.domains.is_empty() || args.file.is_some() {
        let mut list = StaticSource::from_names(args.domains.iter().cloned());
        if let Some(file) = &args.file {
            list.extend(StaticSource::from_file(file).await?);
        }
        Box::new(list)
    } else {
        let kind = match settings.panel.as_str() {
            "none" => {
                return Err(
                    "No domains given. Pass domain names, --file, or --panel cpanel|directadmin"
                        .into(),
                )
            }
            "auto" => PanelKind::detect(),
            other => other.parse::<PanelKind>()?,
        };
        info!(panel = %kind, "Discovering domains from control panel");
        panel_source(kind)?
    };

    let domains = source.list_domains().await?;
    Ok((source.name().to_string(), domains))
}
