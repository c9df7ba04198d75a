use rawrepl_fs::Files;
use rawrepl_transport::StreamTransport;

use crate::cmd::RmdirArgs;
use crate::exit::{fs_error, CliResult, SUCCESS};

pub async fn run(args: RmdirArgs, mut files: Files<StreamTransport>) -> CliResult<i32> {
    files
        .rmdir(&args.dir)
        .await
        .map_err(|err| fs_error("rmdir failed", err))?;
    Ok(SUCCESS)
}
