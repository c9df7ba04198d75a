use rawrepl_fs::{Files, ListOptions};
use rawrepl_transport::StreamTransport;

use crate::cmd::LsArgs;
use crate::exit::{fs_error, CliResult, SUCCESS};
use crate::output::{print_listing, OutputFormat};

pub async fn run(
    args: LsArgs,
    mut files: Files<StreamTransport>,
    format: OutputFormat,
) -> CliResult<i32> {
    let options = ListOptions {
        long: args.long,
        recursive: args.recursive,
    };
    let entries = files
        .ls(&args.dir, options)
        .await
        .map_err(|err| fs_error("ls failed", err))?;

    print_listing(&args.dir, &entries, format);
    Ok(SUCCESS)
}
