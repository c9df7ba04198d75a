use rawrepl_fs::Files;
use rawrepl_transport::StreamTransport;

use crate::cmd::MkdirArgs;
use crate::exit::{fs_error, CliResult, SUCCESS};

pub async fn run(args: MkdirArgs, mut files: Files<StreamTransport>) -> CliResult<i32> {
    files
        .mkdir(&args.dir, args.exists_okay)
        .await
        .map_err(|err| fs_error("mkdir failed", err))?;
    Ok(SUCCESS)
}
