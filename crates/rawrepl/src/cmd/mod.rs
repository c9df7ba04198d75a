use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand};
use rawrepl_fs::Files;
use rawrepl_session::{Session, SessionConfig};
use rawrepl_transport::{SerialConfig, StreamTransport};

use crate::exit::{transport_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod eval;
pub mod get;
pub mod ls;
pub mod mkdir;
pub mod put;
pub mod reset;
pub mod rm;
pub mod rmdir;
pub mod run;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List a directory on the device.
    Ls(LsArgs),
    /// Copy a file from the device.
    Get(GetArgs),
    /// Copy a local file to the device.
    Put(PutArgs),
    /// Create a directory on the device.
    Mkdir(MkdirArgs),
    /// Remove a file on the device.
    Rm(RmArgs),
    /// Remove a directory and its contents on the device.
    Rmdir(RmdirArgs),
    /// Run a local script on the device.
    Run(RunArgs),
    /// Evaluate a Python expression on the device and print the result.
    Eval(EvalArgs),
    /// Soft-reboot the device.
    Reset(ResetArgs),
    /// Show version information.
    Version(VersionArgs),
}

/// Everything a device command needs besides its own arguments.
#[derive(Debug)]
pub struct Context {
    pub target: TargetArgs,
    pub config: SessionConfig,
    pub format: OutputFormat,
}

pub async fn run(command: Command, ctx: &Context) -> CliResult<i32> {
    if let Command::Version(args) = command {
        return version::run(args);
    }

    let transport = Arc::new(ctx.target.open().await?);
    let session = Session::with_config(Arc::clone(&transport), ctx.config.clone());
    let result = run_on_device(command, session, ctx.format).await;
    // Flush the raw REPL exit sequence before the process goes away.
    transport.shutdown().await;
    result
}

async fn run_on_device(
    command: Command,
    session: Session<StreamTransport>,
    format: OutputFormat,
) -> CliResult<i32> {
    match command {
        Command::Ls(args) => ls::run(args, Files::new(session), format).await,
        Command::Get(args) => get::run(args, Files::new(session)).await,
        Command::Put(args) => put::run(args, Files::new(session)).await,
        Command::Mkdir(args) => mkdir::run(args, Files::new(session)).await,
        Command::Rm(args) => rm::run(args, Files::new(session)).await,
        Command::Rmdir(args) => rmdir::run(args, Files::new(session)).await,
        Command::Run(args) => run::run(args, Files::new(session), format).await,
        Command::Eval(args) => eval::run(args, session, format).await,
        Command::Reset(args) => reset::run(args, session).await,
        Command::Version(args) => version::run(args),
    }
}

/// Where the device is reachable. Exactly one must be given.
#[derive(Args, Debug, Default, Clone)]
pub struct TargetArgs {
    /// Serial device node (e.g. /dev/ttyACM0).
    #[arg(long, short = 'p', value_name = "PATH", env = "RAWREPL_PORT", global = true)]
    pub port: Option<PathBuf>,
    /// Line speed for --port. Default: keep the node's current settings.
    #[arg(long, value_name = "RATE", env = "RAWREPL_BAUD", global = true)]
    pub baud: Option<u32>,
    /// TCP serial bridge (e.g. ser2net) address.
    #[arg(long, value_name = "HOST:PORT", env = "RAWREPL_TCP", global = true)]
    pub tcp: Option<String>,
    /// Unix domain socket exposing the device stream.
    #[arg(long, value_name = "PATH", global = true)]
    pub unix: Option<PathBuf>,
}

impl TargetArgs {
    pub async fn open(&self) -> CliResult<StreamTransport> {
        let opened = match (&self.port, &self.tcp, &self.unix) {
            (Some(path), None, None) => {
                let config = SerialConfig {
                    baud_rate: self.baud,
                };
                StreamTransport::open_serial(path, &config).await
            }
            (None, Some(addr), None) => StreamTransport::connect_tcp(addr).await,
            #[cfg(unix)]
            (None, None, Some(path)) => StreamTransport::connect_unix(path).await,
            #[cfg(not(unix))]
            (None, None, Some(_)) => {
                return Err(CliError::new(USAGE, "--unix is not supported on this platform"))
            }
            (None, None, None) => {
                return Err(CliError::new(
                    USAGE,
                    "no device given: use --port, --tcp or --unix",
                ))
            }
            _ => {
                return Err(CliError::new(
                    USAGE,
                    "--port, --tcp and --unix are mutually exclusive",
                ))
            }
        };
        opened.map_err(|err| transport_error("connect failed", err))
    }
}

#[derive(Args, Debug)]
pub struct LsArgs {
    /// Directory to list.
    #[arg(default_value = "/")]
    pub dir: String,
    /// Include file sizes.
    #[arg(long, short = 'l')]
    pub long: bool,
    /// Walk subdirectories.
    #[arg(long, short = 'r')]
    pub recursive: bool,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Remote file to read.
    pub remote: String,
    /// Local destination. Default: write to stdout.
    pub local: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct PutArgs {
    /// Local file to upload.
    pub local: PathBuf,
    /// Remote destination. Default: the local file name.
    pub remote: Option<String>,
}

#[derive(Args, Debug)]
pub struct MkdirArgs {
    /// Directory to create.
    pub dir: String,
    /// Do not fail if the directory already exists.
    #[arg(long)]
    pub exists_okay: bool,
}

#[derive(Args, Debug)]
pub struct RmArgs {
    /// File to remove.
    pub path: String,
}

#[derive(Args, Debug)]
pub struct RmdirArgs {
    /// Directory to remove.
    pub dir: String,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Local script to run.
    pub file: PathBuf,
    /// Start the script and return without waiting for its output.
    #[arg(long, conflicts_with = "stream")]
    pub no_wait: bool,
    /// Print output while the script runs.
    #[arg(long, conflicts_with = "no_wait")]
    pub stream: bool,
}

#[derive(Args, Debug)]
pub struct EvalArgs {
    /// Expression to evaluate.
    pub expression: String,
}

#[derive(Args, Debug, Default)]
pub struct ResetArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `--start-delay` and `--timeout` values: `500ms`, `2s`, `5m`, or
/// bare seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    let split = input
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(input.len());
    let (number, unit) = input.split_at(split);

    let value: u64 = number.parse().map_err(|_| {
        CliError::new(
            USAGE,
            format!("invalid duration {input:?}: expected e.g. 500ms, 2s or 5m"),
        )
    })?;
    let duration = match unit.trim_start() {
        "ms" => Duration::from_millis(value),
        "" | "s" => Duration::from_secs(value),
        "m" => Duration::from_secs(value.saturating_mul(60)),
        other => {
            return Err(CliError::new(
                USAGE,
                format!("invalid duration {input:?}: unknown unit {other:?}"),
            ))
        }
    };

    if duration.is_zero() {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }
    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_delays_and_run_timeouts_parse() {
        // Typical board reset delay and a long-running script timeout.
        assert_eq!(parse_duration("1500ms").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration("2 s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("10").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
    }

    #[test]
    fn malformed_durations_are_usage_errors() {
        for input in ["0ms", "soon", "", "1.5s", "2h", "-1s"] {
            let err = parse_duration(input).unwrap_err();
            assert_eq!(err.code, USAGE, "input {input:?}");
        }
        assert!(parse_duration("2h").unwrap_err().message.contains("unknown unit \"h\""));
    }

    #[tokio::test]
    async fn missing_target_is_usage_error() {
        let err = TargetArgs::default().open().await.unwrap_err();
        assert_eq!(err.code, USAGE);
    }

    #[tokio::test]
    async fn conflicting_targets_are_usage_error() {
        let target = TargetArgs {
            port: Some(PathBuf::from("/dev/ttyACM0")),
            tcp: Some("127.0.0.1:2217".to_string()),
            ..TargetArgs::default()
        };
        let err = target.open().await.unwrap_err();
        assert_eq!(err.code, USAGE);
        assert!(err.message.contains("mutually exclusive"));
    }
}
