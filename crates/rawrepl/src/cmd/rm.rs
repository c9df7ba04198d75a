use rawrepl_fs::Files;
use rawrepl_transport::StreamTransport;

use crate::cmd::RmArgs;
use crate::exit::{fs_error, CliResult, SUCCESS};

pub async fn run(args: RmArgs, mut files: Files<StreamTransport>) -> CliResult<i32> {
    files
        .rm(&args.path)
        .await
        .map_err(|err| fs_error("rm failed", err))?;
    Ok(SUCCESS)
}
