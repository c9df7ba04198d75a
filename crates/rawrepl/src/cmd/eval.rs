use rawrepl_session::Session;
use rawrepl_transport::StreamTransport;

use crate::cmd::EvalArgs;
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::{print_exec_output, OutputFormat};

pub async fn run(
    args: EvalArgs,
    mut session: Session<StreamTransport>,
    format: OutputFormat,
) -> CliResult<i32> {
    let mut repl = session
        .raw_repl()
        .await
        .map_err(|err| session_error("eval failed", err))?;
    let out = repl
        .eval(&args.expression)
        .await
        .map_err(|err| session_error("eval failed", err))?;

    print_exec_output(&out, format);
    Ok(SUCCESS)
}
