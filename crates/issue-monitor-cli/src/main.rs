// crates/issue-monitor-cli/src/main.rs
// ============================================================================
// Module: Issue Monitor CLI Entry Point
// Description: Command dispatcher for monitoring passes and maintenance.
// Purpose: Run the monitor from schedulers and inspect its state by hand.
// Dependencies: clap, issue-monitor-cli, issue-monitor-config, tokio
// ============================================================================

//! ## Overview
//! `issue-monitor run` performs one monitoring pass and prints its run record
//! as canonical JSON; the exit code is zero only for a completed pass so
//! schedulers can alert on failures. The remaining commands inspect or
//! repair local state and validate configuration.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use issue_monitor_cli::MonitorApp;
use issue_monitor_cli::run_pass;
use issue_monitor_config::IssueMonitorConfig;
use issue_monitor_config::config_toml_example;
use issue_monitor_core::ReconcileMode;
use issue_monitor_core::RunStatus;
use issue_monitor_core::SeenRecord;
use issue_monitor_core::SourceId;
use issue_monitor_core::hashing::canonical_json_bytes;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "issue-monitor", version, disable_help_subcommand = true)]
struct Cli {
    /// Config file path (defaults to `ISSUE_MONITOR_CONFIG` or issue-monitor.toml).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one monitoring pass and print the run record.
    Run,
    /// Check seen records against the discovery log and repair gaps.
    Reconcile(ReconcileCommand),
    /// Seen record utilities.
    Seen {
        /// Selected seen subcommand.
        #[command(subcommand)]
        command: SeenCommand,
    },
    /// Discovery log utilities.
    Log {
        /// Selected log subcommand.
        #[command(subcommand)]
        command: LogCommand,
    },
    /// Run history utilities.
    History {
        /// Selected history subcommand.
        #[command(subcommand)]
        command: HistoryCommand,
    },
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments for the `reconcile` command.
#[derive(Args, Debug)]
struct ReconcileCommand {
    /// Check every seen record and log entry instead of pending records only.
    #[arg(long)]
    full: bool,
}

/// Seen record subcommands.
#[derive(Subcommand, Debug)]
enum SeenCommand {
    /// List seen records ordered by first-seen date.
    List(SeenListCommand),
}

/// Arguments for `seen list`.
#[derive(Args, Debug)]
struct SeenListCommand {
    /// Only list records from this source.
    #[arg(long, value_name = "ID")]
    source: Option<String>,
    /// Only list records whose log entry is not yet confirmed.
    #[arg(long, conflicts_with = "source")]
    pending: bool,
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

/// Discovery log subcommands.
#[derive(Subcommand, Debug)]
enum LogCommand {
    /// Print the discovery log.
    Show,
}

/// Run history subcommands.
#[derive(Subcommand, Debug)]
enum HistoryCommand {
    /// Print the most recent run record.
    Latest,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate an issue monitor configuration file.
    Validate,
    /// Print a canonical example configuration.
    Example,
}

/// Output formats for listings.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// One tab-separated line per record.
    Text,
    /// Canonical JSON array.
    Json,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let config = cli.config.as_deref();
    match cli.command {
        Commands::Run => command_run(config).await,
        Commands::Reconcile(command) => command_reconcile(config, &command),
        Commands::Seen {
            command: SeenCommand::List(command),
        } => command_seen_list(config, &command),
        Commands::Log {
            command: LogCommand::Show,
        } => command_log_show(config),
        Commands::History {
            command: HistoryCommand::Latest,
        } => command_history_latest(config),
        Commands::Config {
            command,
        } => command_config(config, &command),
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Executes `run`.
async fn command_run(config: Option<&Path>) -> CliResult<ExitCode> {
    let record =
        run_pass(load_config(config)?).await.map_err(|err| CliError::new(err.to_string()))?;
    write_canonical_json(&record)?;
    Ok(match record.status {
        RunStatus::Completed => ExitCode::SUCCESS,
        RunStatus::Failed | RunStatus::Aborted => ExitCode::FAILURE,
    })
}

/// Executes `reconcile`.
fn command_reconcile(config: Option<&Path>, command: &ReconcileCommand) -> CliResult<ExitCode> {
    let app = open_app(config)?;
    let mode = if command.full { ReconcileMode::Full } else { ReconcileMode::Pending };
    let report = app.reconcile(mode).map_err(|err| CliError::new(err.to_string()))?;
    write_canonical_json(&report)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `seen list`.
fn command_seen_list(config: Option<&Path>, command: &SeenListCommand) -> CliResult<ExitCode> {
    let app = open_app(config)?;
    let records = if command.pending {
        app.pending()
    } else {
        let source = command.source.as_deref().map(SourceId::new);
        app.seen(source.as_ref())
    }
    .map_err(|err| CliError::new(err.to_string()))?;
    match command.format {
        OutputFormat::Json => write_canonical_json(&records)?,
        OutputFormat::Text => {
            let mut output = String::new();
            for record in &records {
                output.push_str(&render_seen_line(record));
                output.push('\n');
            }
            write_stdout_bytes(output.as_bytes())?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes `log show`.
fn command_log_show(config: Option<&Path>) -> CliResult<ExitCode> {
    let app = open_app(config)?;
    let text = app.log_text().map_err(|err| CliError::new(err.to_string()))?;
    write_stdout_bytes(text.as_bytes())?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `history latest`.
fn command_history_latest(config: Option<&Path>) -> CliResult<ExitCode> {
    let app = open_app(config)?;
    match app.latest_run().map_err(|err| CliError::new(err.to_string()))? {
        Some(record) => write_canonical_json(&record)?,
        None => write_stdout_line("no runs recorded")?,
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes `config` subcommands.
fn command_config(config: Option<&Path>, command: &ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate => {
            let loaded = load_config(config)?;
            write_stdout_line(&format!("config ok: {} source(s)", loaded.sources.len()))?;
        }
        ConfigCommand::Example => write_stdout_bytes(config_toml_example().as_bytes())?,
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads and validates configuration.
fn load_config(path: Option<&Path>) -> CliResult<IssueMonitorConfig> {
    IssueMonitorConfig::load(path).map_err(|err| CliError::new(err.to_string()))
}

/// Loads configuration and opens the backends.
fn open_app(path: Option<&Path>) -> CliResult<MonitorApp> {
    MonitorApp::open(load_config(path)?).map_err(|err| CliError::new(err.to_string()))
}

/// Renders one seen record as a tab-separated line.
fn render_seen_line(record: &SeenRecord) -> String {
    let state = if record.logged { "logged" } else { "pending" };
    format!(
        "{}\t{}\t{}\t{}\t{}",
        record.first_seen_date, record.notification_token, state, record.reference, record.title
    )
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes canonical JSON followed by a newline to stdout.
fn write_canonical_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let mut bytes = canonical_json_bytes(value)
        .map_err(|err| CliError::new(format!("failed to serialize output: {err}")))?;
    bytes.push(b'\n');
    write_stdout_bytes(&bytes)
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}").map_err(|err| CliError::new(output_error(&err)))
}

/// Writes raw bytes to stdout without adding a newline.
fn write_stdout_bytes(bytes: &[u8]) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(bytes).map_err(|err| CliError::new(output_error(&err)))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(error: &std::io::Error) -> String {
    format!("failed to write to stdout: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
