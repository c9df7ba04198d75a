mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;
use rawrepl_session::SessionConfig;

use crate::cmd::{parse_duration, Command, Context, TargetArgs};
use crate::exit::CliResult;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "rawrepl",
    version,
    about = "Run code and move files on MicroPython boards over the raw REPL"
)]
struct Cli {
    #[command(flatten)]
    target: TargetArgs,

    /// Wait this long before the first handshake (e.g. 2s, 500ms), for boards
    /// that reset when the port opens.
    #[arg(long, value_name = "DURATION", env = "RAWREPL_START_DELAY", global = true)]
    start_delay: Option<String>,

    /// How long executed code may run before its output is given up on.
    #[arg(long, value_name = "DURATION", default_value = "10s", global = true)]
    timeout: String,

    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn session_config(&self) -> CliResult<SessionConfig> {
        let start_delay = self
            .start_delay
            .as_deref()
            .map(parse_duration)
            .transpose()?;
        Ok(SessionConfig {
            start_delay,
            exec_timeout: parse_duration(&self.timeout)?,
            ..SessionConfig::default()
        })
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = match cli.session_config() {
        Ok(config) => {
            let ctx = Context {
                target: cli.target,
                config,
                format,
            };
            cmd::run(cli.command, &ctx).await
        }
        Err(err) => Err(err),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}
