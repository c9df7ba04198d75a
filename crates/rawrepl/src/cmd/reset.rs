use rawrepl_session::Session;
use rawrepl_transport::StreamTransport;

use crate::cmd::ResetArgs;
use crate::exit::{session_error, CliResult, SUCCESS};

pub async fn run(_args: ResetArgs, mut session: Session<StreamTransport>) -> CliResult<i32> {
    let banner = session
        .soft_reset()
        .await
        .map_err(|err| session_error("reset failed", err))?;
    tracing::info!(banner = %banner.trim_end(), "device reset");
    Ok(SUCCESS)
}
