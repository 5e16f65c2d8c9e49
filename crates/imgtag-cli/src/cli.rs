//! Argument parsing and command dispatch.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use imgtag_api_models::{ApiKeyId, TaggingMode};
use imgtag_config::{
    DEFAULT_API_BASE_URL, DEFAULT_TIMEOUT_SECS, ENV_API_BASE_URL, ENV_HTTP_TIMEOUT_SECS,
    ENV_STATE_PATH, parse_base_url,
};
use imgtag_telemetry::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging};
use url::Url;
use uuid::Uuid;

use crate::client::{AppContext, CliResult};
use crate::commands::auth::{
    handle_auth_status, handle_login, handle_logout, handle_register, handle_use_key,
    handle_whoami,
};
use crate::commands::keys::{handle_keys_create, handle_keys_list, handle_keys_revoke};
use crate::commands::tag::handle_tag;
use crate::commands::usage::handle_usage;

/// Environment variable consulted when `--password` is omitted.
pub(crate) const ENV_PASSWORD: &str = "IMGTAG_PASSWORD";

/// Parses CLI arguments, executes the requested command, and reports the
/// outcome. Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();

    let logging = LoggingConfig {
        level: &cli.log_level,
        format: LogFormat::from_env(),
        build_sha: option_env!("IMGTAG_BUILD_SHA").unwrap_or("dev"),
    };
    if let Err(err) = init_logging(&logging) {
        eprintln!("warning: logging disabled: {err:#}");
    }

    let trace_id = Uuid::new_v4().to_string();
    tracing::debug!(
        command = command_label(&cli.command),
        trace_id = %trace_id,
        build_sha = build_sha(),
        "starting command"
    );

    let result = match AppContext::from_cli(&cli, &trace_id) {
        Ok(ctx) => dispatch(cli.command, &ctx, cli.output).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

pub(crate) async fn dispatch(
    command: Command,
    ctx: &AppContext,
    format: OutputFormat,
) -> CliResult<()> {
    match command {
        Command::Register(args) => handle_register(ctx, args, format).await,
        Command::Login(args) => handle_login(ctx, args, format).await,
        Command::Logout => handle_logout(ctx).await,
        Command::Whoami => handle_whoami(ctx, format).await,
        Command::Keys(keys) => match keys {
            KeysCommand::Ls => handle_keys_list(ctx, format).await,
            KeysCommand::Create(args) => handle_keys_create(ctx, args, format).await,
            KeysCommand::Revoke(args) => handle_keys_revoke(ctx, args).await,
        },
        Command::Auth(auth) => match auth {
            AuthCommand::UseKey(args) => handle_use_key(ctx, args).await,
            AuthCommand::Status => handle_auth_status(ctx, format),
        },
        Command::Tag(args) => handle_tag(ctx, args, format).await,
        Command::Usage => handle_usage(ctx, format).await,
    }
}

#[derive(Parser)]
#[command(
    name = "imgtag",
    version,
    about = "Command-line client for the image tagging API"
)]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        env = ENV_API_BASE_URL,
        value_parser = parse_base_url,
        default_value = DEFAULT_API_BASE_URL
    )]
    pub(crate) api_url: Url,
    #[arg(
        long,
        global = true,
        env = ENV_HTTP_TIMEOUT_SECS,
        default_value_t = DEFAULT_TIMEOUT_SECS,
        help = "Request timeout in seconds"
    )]
    pub(crate) timeout: u64,
    #[arg(
        long,
        global = true,
        env = ENV_STATE_PATH,
        help = "File holding the stored API key and session"
    )]
    pub(crate) state_path: Option<PathBuf>,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    pub(crate) output: OutputFormat,
    #[arg(
        long,
        global = true,
        default_value = DEFAULT_LOG_LEVEL,
        help = "Log level when RUST_LOG is unset"
    )]
    pub(crate) log_level: String,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Create an account and open a session.
    Register(CredentialsArgs),
    /// Open a session.
    Login(CredentialsArgs),
    /// Close the session and forget stored credentials.
    Logout,
    /// Show the account behind the current session.
    Whoami,
    /// Manage API keys.
    #[command(subcommand)]
    Keys(KeysCommand),
    /// Select or inspect the active API key.
    #[command(subcommand)]
    Auth(AuthCommand),
    /// Tag an image using the active API key.
    Tag(TagArgs),
    /// Show quota usage.
    Usage,
}

#[derive(Subcommand)]
pub(crate) enum KeysCommand {
    /// List keys.
    Ls,
    /// Issue a new key.
    Create(KeysCreateArgs),
    /// Revoke a key.
    Revoke(KeysRevokeArgs),
}

#[derive(Subcommand)]
pub(crate) enum AuthCommand {
    /// Validate a key and make it the active credential.
    UseKey(UseKeyArgs),
    /// Show the stored credential state.
    Status,
}

#[derive(Args)]
pub(crate) struct CredentialsArgs {
    #[arg(long)]
    pub(crate) email: String,
    #[arg(
        long,
        env = ENV_PASSWORD,
        hide_env_values = true,
        help = "Account password; prompted for when omitted"
    )]
    pub(crate) password: Option<String>,
}

#[derive(Args)]
pub(crate) struct KeysCreateArgs {
    #[arg(long = "use", help = "Adopt the new key as the active credential")]
    pub(crate) adopt: bool,
}

#[derive(Args)]
pub(crate) struct KeysRevokeArgs {
    pub(crate) id: ApiKeyId,
}

#[derive(Args)]
pub(crate) struct UseKeyArgs {
    pub(crate) key: String,
}

#[derive(Args)]
pub(crate) struct TagArgs {
    pub(crate) image_url: String,
    #[arg(long, value_parser = parse_mode)]
    pub(crate) mode: Option<TaggingMode>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Table,
    Json,
}

fn parse_mode(input: &str) -> Result<TaggingMode, String> {
    input.parse()
}

const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Register(_) => "register",
        Command::Login(_) => "login",
        Command::Logout => "logout",
        Command::Whoami => "whoami",
        Command::Keys(KeysCommand::Ls) => "keys_ls",
        Command::Keys(KeysCommand::Create(_)) => "keys_create",
        Command::Keys(KeysCommand::Revoke(_)) => "keys_revoke",
        Command::Auth(AuthCommand::UseKey(_)) => "auth_use_key",
        Command::Auth(AuthCommand::Status) => "auth_status",
        Command::Tag(_) => "tag",
        Command::Usage => "usage",
    }
}
