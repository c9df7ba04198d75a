use rawrepl_fs::Files;
use rawrepl_transport::StreamTransport;

use crate::cmd::PutArgs;
use crate::exit::{fs_error, io_error, CliError, CliResult, SUCCESS, USAGE};

pub async fn run(args: PutArgs, mut files: Files<StreamTransport>) -> CliResult<i32> {
    let remote = remote_name(&args)?;
    let data = tokio::fs::read(&args.local)
        .await
        .map_err(|err| io_error(&format!("failed reading {}", args.local.display()), err))?;

    let mut progress = Progress::new(data.len());
    let mut on_progress = |written: usize| {
        if let Some(percent) = progress.advance(written) {
            tracing::info!(remote = %remote, percent, "uploading");
        }
    };
    files
        .put(&remote, &data, Some(&mut on_progress))
        .await
        .map_err(|err| fs_error("put failed", err))?;

    tracing::info!(local = %args.local.display(), remote = %remote, size = data.len(), "file uploaded");
    Ok(SUCCESS)
}

fn remote_name(args: &PutArgs) -> CliResult<String> {
    if let Some(remote) = &args.remote {
        return Ok(remote.clone());
    }
    args.local
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            CliError::new(
                USAGE,
                format!("cannot derive a remote name from {}", args.local.display()),
            )
        })
}

/// Upload progress, reported in 10% steps.
struct Progress {
    total: usize,
    written: usize,
    reported: u64,
}

impl Progress {
    fn new(total: usize) -> Self {
        Self {
            total,
            written: 0,
            reported: 0,
        }
    }

    fn advance(&mut self, written: usize) -> Option<u64> {
        self.written += written;
        let percent = if self.total == 0 {
            100
        } else {
            (self.written as u64 * 100) / self.total as u64
        };
        if percent >= self.reported + 10 || (percent == 100 && self.reported < 100) {
            self.reported = percent;
            return Some(percent);
        }
        None
    }
}
