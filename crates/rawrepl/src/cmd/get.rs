use rawrepl_fs::Files;
use rawrepl_transport::StreamTransport;

use crate::cmd::GetArgs;
use crate::exit::{fs_error, io_error, CliResult, SUCCESS};
use crate::output::print_raw;

pub async fn run(args: GetArgs, mut files: Files<StreamTransport>) -> CliResult<i32> {
    let data = files
        .get(&args.remote)
        .await
        .map_err(|err| fs_error("get failed", err))?;

    match &args.local {
        Some(path) => {
            tokio::fs::write(path, &data).await.map_err(|err| {
                io_error(&format!("failed writing {}", path.display()), err)
            })?;
            tracing::info!(remote = %args.remote, local = %path.display(), size = data.len(), "file copied");
        }
        None => print_raw(&data),
    }
    Ok(SUCCESS)
}
