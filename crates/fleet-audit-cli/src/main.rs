//! fleet-audit - ecosystem compliance auditing CLI
//!
//! ## Commands
//!
//! - `audit`: evaluate every registered service and write the report
//! - `remediate`: turn a prior report into tracking issues
//!
//! Exit codes: 0 success, 1 compliance below `--threshold`, 3 fatal
//! configuration error, 4 any other failure.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fleet_audit_core::{
    init_tracing, render, AuditConfig, AuditError, AuditFilter, AuditOrchestrator, AuditReport,
    CheckDefinitions, ConfigError, IssueAction, Registry, RemediationEngine, RemediationMode,
};
use fleet_audit_probes::{GitHubClient, HttpRuntimeProbe, IssueTracker};
use tracing::{info, Level};

const EXIT_BELOW_THRESHOLD: u8 = 1;
const EXIT_CONFIG: u8 = 3;
const EXIT_RUNTIME: u8 = 4;

#[derive(Parser)]
#[command(name = "fleet-audit")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Ecosystem compliance audit for a fleet of services", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit registered services and write the compliance report
    Audit(AuditArgs),

    /// File tracking issues for failing services from a prior report
    Remediate(RemediateArgs),
}

#[derive(clap::Args)]
struct AuditArgs {
    /// Service registry (YAML)
    #[arg(long)]
    registry: PathBuf,

    /// Check definitions (YAML); built-in definitions when omitted
    #[arg(long)]
    checks: Option<PathBuf>,

    /// Audit configuration (YAML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Organization to audit, or `all`
    #[arg(long, default_value = "all")]
    org: String,

    /// Single service to audit
    #[arg(long)]
    service: Option<String>,

    /// Write the JSON report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write a Markdown report
    #[arg(long)]
    markdown: Option<PathBuf>,

    /// Skip live HTTP checks (health, routing, registry lookups)
    #[arg(long)]
    skip_runtime: bool,

    /// Exit with code 1 when the compliance rate is below this percentage
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=100))]
    threshold: Option<u32>,

    /// Services audited concurrently
    #[arg(long)]
    concurrency: Option<usize>,

    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// Service registry API base URL
    #[arg(long, env = "FLEET_REGISTRY_URL")]
    registry_url: Option<String>,
}

#[derive(clap::Args)]
struct RemediateArgs {
    /// Report produced by `fleet-audit audit`
    report: PathBuf,

    /// `dry-run` prints the issues; `issues` files them
    #[arg(long, default_value = "dry-run")]
    mode: RemediationMode,

    /// Check definitions (YAML) used for finding names
    #[arg(long)]
    checks: Option<PathBuf>,

    /// Audit configuration (YAML), for API settings and default labels
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// Issue label (repeatable); defaults to the configured labels
    #[arg(long = "label")]
    labels: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json_logs, level);

    let outcome = match cli.command {
        Commands::Audit(args) => cmd_audit(args).await,
        Commands::Remediate(args) => cmd_remediate(args).await,
    };
    match outcome {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(exit_code_for(&err))
        }
    }
}

/// Configuration failures get their own exit code.
fn exit_code_for(err: &anyhow::Error) -> u8 {
    let fatal_config = err.chain().any(|cause| {
        cause.downcast_ref::<ConfigError>().is_some()
            || cause
                .downcast_ref::<AuditError>()
                .is_some_and(AuditError::is_fatal_config)
    });
    if fatal_config {
        EXIT_CONFIG
    } else {
        EXIT_RUNTIME
    }
}

fn load_config(path: Option<&Path>) -> Result<AuditConfig> {
    match path {
        Some(path) => Ok(AuditConfig::load(path)?),
        None => Ok(AuditConfig::default()),
    }
}

fn load_definitions(path: Option<&Path>) -> Result<CheckDefinitions> {
    match path {
        Some(path) => Ok(CheckDefinitions::load(path)?),
        None => Ok(CheckDefinitions::builtin()),
    }
}

async fn cmd_audit(args: AuditArgs) -> Result<ExitCode> {
    let mut config = load_config(args.config.as_deref())?;
    if args.skip_runtime {
        config = config.with_skip_runtime(true);
    }
    if let Some(concurrency) = args.concurrency {
        config = config.with_concurrency(concurrency);
    }
    if let Some(token) = args.github_token.as_deref() {
        config.probe = config.probe.with_token(token);
    }
    if let Some(url) = args.registry_url.as_deref() {
        config.probe = config.probe.with_registry_url(url);
    }

    let registry = Registry::load(&args.registry)?;
    let definitions = load_definitions(args.checks.as_deref())?;

    let source = Arc::new(
        GitHubClient::new(config.probe.clone()).context("failed to build GitHub client")?,
    );
    let runtime = Arc::new(
        HttpRuntimeProbe::new(config.probe.clone()).context("failed to build runtime probe")?,
    );
    let orchestrator = AuditOrchestrator::new(registry, source, runtime, config)?;

    let filter = AuditFilter::from_cli(Some(&args.org), args.service.as_deref());
    let report = orchestrator.run(&filter).await?;
    let rendered = render(&report, &definitions)?;

    match &args.output {
        Some(path) => {
            rendered
                .write_json(path)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "JSON report written");
        }
        None => println!("{}", rendered.json),
    }
    if let Some(path) = &args.markdown {
        rendered
            .write_markdown(path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "Markdown report written");
    }

    print_summary(&report);

    if let Some(threshold) = args.threshold {
        if report.summary.compliance_rate < threshold {
            eprintln!(
                "compliance rate {}% is below threshold {}%",
                report.summary.compliance_rate, threshold
            );
            return Ok(ExitCode::from(EXIT_BELOW_THRESHOLD));
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_summary(report: &AuditReport) {
    let s = &report.summary;
    eprintln!("Fleet compliance audit ({})", report.run_id);
    eprintln!(
        "  {} services in {} organizations: {} full pass, {} partial, {} fail, {} skipped",
        s.total, s.org_count, s.full_pass, s.partial, s.fail, s.skipped
    );
    eprintln!("  compliance rate: {}%", s.compliance_rate);
    for (org, name, service) in report.services() {
        if service.classification.needs_remediation() {
            eprintln!("  {:<8} {org}/{name}", service.classification.as_str());
        }
    }
}

async fn cmd_remediate(args: RemediateArgs) -> Result<ExitCode> {
    let config = load_config(args.config.as_deref())?;
    let definitions = load_definitions(args.checks.as_deref())?;
    let report = AuditReport::load(&args.report)
        .with_context(|| format!("failed to read report {}", args.report.display()))?;

    let tracker: Option<Arc<dyn IssueTracker>> = match args.mode {
        RemediationMode::DryRun => None,
        RemediationMode::Issues => {
            let token = args.github_token.as_deref().ok_or_else(|| {
                ConfigError::InvalidConfig("issues mode requires --github-token".to_string())
            })?;
            let client = GitHubClient::new(config.probe.clone().with_token(token))
                .context("failed to build GitHub client")?;
            Some(Arc::new(client) as Arc<dyn IssueTracker>)
        }
    };
    let labels = if args.labels.is_empty() {
        config.issue_labels.clone()
    } else {
        args.labels
    };

    let summary = RemediationEngine::new(tracker, labels)
        .with_definitions(definitions)
        .run(&report, args.mode)
        .await?;

    for outcome in &summary.outcomes {
        match &outcome.action {
            IssueAction::Planned => {
                println!("=== {} ===", outcome.draft.repo);
                println!("{}\n", outcome.draft.title);
                println!("{}", outcome.draft.body);
            }
            IssueAction::Created { issue }
            | IssueAction::Updated { issue }
            | IssueAction::Unchanged { issue } => {
                eprintln!(
                    "{:<9} {} #{} {}",
                    outcome.action.as_str(),
                    outcome.draft.repo,
                    issue.number,
                    issue.url
                );
            }
            IssueAction::Failed { error } => {
                eprintln!("failed    {}: {error}", outcome.draft.repo);
            }
        }
    }
    eprintln!(
        "{} issue(s) {}",
        summary.outcomes.len(),
        match args.mode {
            RemediationMode::DryRun => "planned",
            RemediationMode::Issues => "processed",
        }
    );

    if summary.failures().next().is_some() {
        return Ok(ExitCode::from(EXIT_RUNTIME));
    }
    Ok(ExitCode::SUCCESS)
}
