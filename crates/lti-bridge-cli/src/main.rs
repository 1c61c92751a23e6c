// crates/lti-bridge-cli/src/main.rs
// ============================================================================
// Module: LTI Bridge CLI Entry Point
// Description: Command dispatcher for serving and exercising the LTI bridge.
// Purpose: Run the HTTP service and produce launch forms and signed callbacks offline.
// Dependencies: clap, lti-bridge-config, lti-bridge-core, lti-bridge-server, serde_json, tokio.
// ============================================================================

//! ## Overview
//! The LTI bridge CLI starts the HTTP service, validates configuration, and
//! gives operators two offline helpers: `launch` renders the signed launch
//! form of a placement and `sign-outcome` produces the Authorization header a
//! tool must send to a grade endpoint.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use lti_bridge_config::LtiBridgeConfig;
use lti_bridge_config::MAX_BODY_BYTES_LIMIT;
use lti_bridge_core::AnonymousUserId;
use lti_bridge_core::InMemoryGradeLedger;
use lti_bridge_core::InMemoryGradeStateStore;
use lti_bridge_core::LtiService;
use lti_bridge_core::OAuthStamp;
use lti_bridge_core::PlatformRole;
use lti_bridge_core::SignedRequest;
use lti_bridge_core::ToolComponent;
use lti_bridge_server::HttpLaunchEnvironment;
use lti_bridge_server::LtiServer;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "lti-bridge", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the LTI bridge HTTP server.
    Serve(ServeCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Render the signed launch form of a placement.
    Launch(LaunchCommand),
    /// Sign a grade callback the way a tool provider would.
    SignOutcome(SignOutcomeCommand),
}

/// Arguments for `serve`.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Optional config file path (defaults to lti-bridge.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a configuration file.
    Validate(ConfigValidateCommand),
}

/// Arguments for config validation.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to lti-bridge.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Placement selection shared by offline commands.
#[derive(Args, Debug)]
struct PlacementArgs {
    /// Optional config file path (defaults to lti-bridge.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Course identifier.
    #[arg(long, value_name = "COURSE")]
    course: String,
    /// Tool placement usage identifier.
    #[arg(long, value_name = "USAGE")]
    usage: String,
    /// Explicit OAuth nonce (generated when omitted).
    #[arg(long, value_name = "NONCE", requires = "timestamp")]
    nonce: Option<String>,
    /// Explicit OAuth timestamp in seconds (generated when omitted).
    #[arg(long, value_name = "SECONDS", requires = "nonce")]
    timestamp: Option<String>,
}

/// Arguments for `launch`.
#[derive(Args, Debug)]
struct LaunchCommand {
    /// Placement to launch.
    #[command(flatten)]
    placement: PlacementArgs,
    /// Anonymous id of the launching user.
    #[arg(long, value_name = "ANON_ID")]
    user: String,
    /// Platform role of the launching user (student, staff, instructor).
    #[arg(long, value_name = "ROLE", default_value = "student")]
    role: String,
}

/// Arguments for `sign-outcome`.
#[derive(Args, Debug)]
struct SignOutcomeCommand {
    /// Placement whose passport signs the request.
    #[command(flatten)]
    placement: PlacementArgs,
    /// HTTP method of the callback.
    #[arg(long, value_name = "METHOD", default_value = "POST")]
    method: String,
    /// Absolute URL of the grade endpoint.
    #[arg(long, value_name = "URL")]
    url: String,
    /// Request body file (empty body when omitted).
    #[arg(long, value_name = "PATH")]
    body_file: Option<PathBuf>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing error messages.
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

/// Errors returned by bounded file reads.
#[derive(Debug, Error)]
enum ReadLimitError {
    /// File I/O failure.
    #[error("{0}")]
    Io(std::io::Error),
    /// File size exceeds the configured limit.
    #[error("file is {size} bytes, limit is {limit}")]
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

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

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&format!("lti-bridge {version}"))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Serve(command) => command_serve(command).await,
        Commands::Config {
            command,
        } => command_config(command),
        Commands::Launch(command) => command_launch(&command),
        Commands::SignOutcome(command) => command_sign_outcome(&command),
    }
}

/// Prints top-level help.
fn show_help() -> CliResult<()> {
    let help = Cli::command().render_help().to_string();
    write_stdout_line(&help).map_err(|err| CliError::new(output_error("stdout", &err)))
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    let bind = config.server.bind.clone();
    let server = LtiServer::from_config(config)
        .map_err(|err| CliError::new(format!("server init failed: {err}")))?;
    write_stderr_line(&format!("lti-bridge listening on {bind}"))
        .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    server.serve().await.map_err(|err| CliError::new(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => command_config_validate(&command),
    }
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    write_stdout_line(&format!(
        "config ok: {} course(s), {} tool placement(s), {} user(s)",
        config.courses.len(),
        config.tools.len(),
        config.users.len()
    ))
    .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Offline Commands
// ============================================================================

/// Executes the `launch` command.
fn command_launch(command: &LaunchCommand) -> CliResult<ExitCode> {
    let config = load_config(command.placement.config.as_deref())?;
    let component = resolve_component(&config, &command.placement)?;
    let service = offline_service(&config);
    let env = HttpLaunchEnvironment {
        hostname: config.server.effective_hostname(),
        role: PlatformRole::from_label(&command.role),
        anonymous_id: AnonymousUserId::new(command.user.trim()),
        base_url: config.server.base_url().to_string(),
    };
    let view = service
        .launch(&component, &env, &resolve_stamp(&command.placement))
        .map_err(|err| CliError::new(format!("launch failed: {err}")))?;
    let value = serde_json::to_value(&view)
        .map_err(|err| CliError::new(format!("launch serialization failed: {err}")))?;
    write_json_value(&value)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `sign-outcome` command.
fn command_sign_outcome(command: &SignOutcomeCommand) -> CliResult<ExitCode> {
    let config = load_config(command.placement.config.as_deref())?;
    let component = resolve_component(&config, &command.placement)?;
    let body = match &command.body_file {
        Some(path) => read_bytes_with_limit(path, config.server.max_body_bytes.min(MAX_BODY_BYTES_LIMIT))
            .map_err(|err| CliError::new(format!("body read failed for {}: {err}", path.display())))?,
        None => Vec::new(),
    };
    let method = command.method.trim().to_ascii_uppercase();
    let request = SignedRequest {
        method: &method,
        url: command.url.trim(),
        authorization: None,
        content_type: None,
        body: &body,
    };
    let hint = offline_service(&config)
        .authorization_hint(&component, &request, &resolve_stamp(&command.placement))
        .map_err(|err| CliError::new(format!("signing failed: {err}")))?;
    write_json_value(&json!({
        "oauth_body_hash": hint.body_hash,
        "authorization": hint.authorization,
    }))?;
    Ok(ExitCode::SUCCESS)
}

/// Builds a service over the configured passports and users.
fn offline_service(config: &LtiBridgeConfig) -> LtiService {
    LtiService::new(
        Arc::new(config.credential_source()),
        Arc::new(config.user_directory()),
        Arc::new(InMemoryGradeLedger::new()),
        Arc::new(InMemoryGradeStateStore::new()),
    )
}

/// Looks up the selected placement.
fn resolve_component(config: &LtiBridgeConfig, placement: &PlacementArgs) -> CliResult<ToolComponent> {
    config.tool_component(&placement.course, &placement.usage).ok_or_else(|| {
        CliError::new(format!(
            "unknown tool placement: course '{}', usage '{}'",
            placement.course, placement.usage
        ))
    })
}

/// Uses the explicit stamp when both parts are given.
fn resolve_stamp(placement: &PlacementArgs) -> OAuthStamp {
    match (&placement.nonce, &placement.timestamp) {
        (Some(nonce), Some(timestamp)) => OAuthStamp::new(nonce.clone(), timestamp.clone()),
        _ => OAuthStamp::generate(),
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads and validates configuration.
fn load_config(path: Option<&Path>) -> CliResult<LtiBridgeConfig> {
    LtiBridgeConfig::load(path).map_err(|err| CliError::new(format!("config load failed: {err}")))
}

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let size = file.metadata().map_err(ReadLimitError::Io)?.len();
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }

    let mut bytes = Vec::new();
    file.take(limit.saturating_add(1)).read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        return Err(ReadLimitError::TooLarge {
            size: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

/// Writes pretty JSON to stdout.
fn write_json_value(value: &Value) -> CliResult<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::new(format!("json rendering failed: {err}")))?;
    write_stdout_line(&rendered).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
