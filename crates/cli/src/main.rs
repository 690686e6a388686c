//! dimcli entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse configuration** — command-line flags with environment fallbacks
//!    (`DIM_SERVER_URL`, `DIM_USERNAME`, `DIM_COOKIE_FILE`, ...).
//! 2. **Wire observability** — configure `tracing-subscriber` on stderr, as
//!    plain text or JSON, filtered by `RUST_LOG` or `-v`.
//! 3. **Construct infrastructure** — build the [`DimClient`] with the cookie
//!    file and session policy.
//! 4. **Dispatch the subcommand** and print its result as pretty JSON.
//!
//! Failures print the error and exit with the DIM error code (1 for
//! client-side errors).

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context};
use clap::{ArgAction, Parser, Subcommand};
use dimclient::{
    default_cookie_file, ClientConfig, ClientError, DimClient, LoginOptions, TerminalCredentials,
};
use protocol::{CallArgs, MethodName, SessionPolicy};
use serde_json::{Map, Value};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "dimcli", version, about = "Command-line client for the DIM JSON-RPC API")]
struct Cli {
    /// Base URL of the DIM server.
    #[arg(long, env = "DIM_SERVER_URL")]
    server: String,

    /// Account to log in as; prompted for when needed and not given.
    #[arg(long, env = "DIM_USERNAME")]
    username: Option<String>,

    /// Password; prompted for (hidden) when needed and not given.
    #[arg(long, env = "DIM_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Where the session cookie is kept [default: ~/.ndcli.cookie].
    #[arg(long, env = "DIM_COOKIE_FILE")]
    cookie_file: Option<PathBuf>,

    /// Umask (octal) applied while writing the cookie file, e.g. 077.
    #[arg(long, value_parser = parse_octal)]
    cookie_umask: Option<u32>,

    /// Read the cookie file but never write it.
    #[arg(long)]
    no_save_cookie: bool,

    /// Also require the stored session to belong to --username.
    #[arg(long)]
    verify_username: bool,

    /// Increase log verbosity (-v: info, -vv: debug).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Emit logs as JSON.
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Log in, reusing the stored session when it is still valid.
    Login {
        /// Request a permanent session.
        #[arg(long)]
        permanent: bool,
        /// Submit credentials even if the stored session is valid.
        #[arg(long)]
        ignore_cookie: bool,
    },
    /// Log out and forget the stored session.
    Logout,
    /// Report whether the stored session is valid.
    Status,
    /// Call a remote method.
    Call {
        /// Remote method name, e.g. `ip_list`.
        method: String,
        /// Positional arguments; parsed as JSON, otherwise taken as strings.
        args: Vec<String>,
        /// Named option `key=value`, appended as one trailing mapping.
        #[arg(long = "opt", value_parser = parse_key_value)]
        options: Vec<(String, Value)>,
    },
    /// List addresses with `ip_list`, following the `after` cursor.
    IpListAll {
        /// Number of addresses to fetch.
        #[arg(long, default_value_t = protocol::DEFAULT_PAGE_LIMIT)]
        limit: u64,
        /// Named option `key=value` passed to every `ip_list` call.
        #[arg(long = "opt", value_parser = parse_key_value)]
        options: Vec<(String, Value)>,
    },
}

impl Command {
    /// Subcommand name as typed on the command line.
    fn name(&self) -> &'static str {
        match self {
            Self::Login { .. } => "login",
            Self::Logout => "logout",
            Self::Status => "status",
            Self::Call { .. } => "call",
            Self::IpListAll { .. } => "ip-list-all",
        }
    }
}

fn parse_octal(raw: &str) -> Result<u32, String> {
    u32::from_str_radix(raw.trim_start_matches("0o"), 8)
        .map_err(|e| format!("`{raw}` is not an octal mode: {e}"))
}

/// Arguments are JSON when they parse as JSON, plain strings otherwise.
fn parse_json_or_string(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn parse_key_value(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("`{raw}` is not of the form key=value"))?;
    Ok((key.to_string(), parse_json_or_string(value)))
}

fn init_tracing(verbose: u8, json: bool) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn client_config(cli: &Cli) -> ClientConfig {
    let mut config = ClientConfig::new(&cli.server).session_policy(SessionPolicy {
        verify_username: cli.verify_username,
        ..SessionPolicy::default()
    });
    if let Some(path) = cli.cookie_file.clone().or_else(default_cookie_file) {
        config = config.cookie_file(path);
    }
    if let Some(umask) = cli.cookie_umask {
        config = config.cookie_umask(umask);
    }
    if cli.no_save_cookie {
        config = config.read_only_cookies();
    }
    if let Some(username) = &cli.username {
        config = config.username(username);
    }
    config
}

async fn ensure_session(
    client: &mut DimClient,
    cli: &Cli,
    options: LoginOptions,
) -> anyhow::Result<()> {
    let options = LoginOptions {
        password: options.password.or_else(|| cli.password.clone()),
        ..options
    };
    if !client.login_prompt(options, &TerminalCredentials).await? {
        return Err(anyhow!("login to {} failed", client.server_url()));
    }
    Ok(())
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut client =
        DimClient::new(client_config(&cli)).context("invalid client configuration")?;
    info!(
        command = cli.command.name(),
        server = client.server_url(),
        "running subcommand"
    );

    match &cli.command {
        Command::Login {
            permanent,
            ignore_cookie,
        } => {
            let options = LoginOptions {
                permanent_session: Some(*permanent),
                ignore_cookie: *ignore_cookie,
                ..LoginOptions::default()
            };
            ensure_session(&mut client, &cli, options).await?;
            let username = client.username().map_or("<unknown>", |u| u.as_str());
            println!("Logged in as {username}");
        }
        Command::Logout => {
            client.logout().await?;
            println!("Logged out");
        }
        Command::Status => {
            if client.is_session_valid().await? {
                println!("Logged in to {}", client.server_url());
            } else {
                println!("Not logged in to {}", client.server_url());
            }
        }
        Command::Call {
            method,
            args,
            options,
        } => {
            let method = MethodName::new(method.as_str())
                .ok_or_else(|| anyhow!("method name must not be empty"))?;
            ensure_session(&mut client, &cli, LoginOptions::default()).await?;

            let mut call_args =
                CallArgs::positional(args.iter().map(|arg| parse_json_or_string(arg)));
            for (key, value) in options {
                call_args.insert(key.clone(), value.clone());
            }
            print_json(&client.call(method.as_str(), call_args).await?)?;
        }
        Command::IpListAll { limit, options } => {
            ensure_session(&mut client, &cli, LoginOptions::default()).await?;

            let mut query: Map<String, Value> = options.iter().cloned().collect();
            query.insert("limit".to_string(), Value::from(*limit));
            let items = client.ip_list_all(query).await?;
            print_json(&Value::Array(items))?;
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = e
                .downcast_ref::<ClientError>()
                .map_or(1, ClientError::code);
            error!(code, "{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(u8::try_from(code).ok().filter(|c| *c != 0).unwrap_or(1))
        }
    }
}
