use std::sync::Arc;

use rawrepl_fs::{Files, RunMode};
use rawrepl_session::protocol::CTRL_D;
use rawrepl_transport::StreamTransport;

use crate::cmd::RunArgs;
use crate::exit::{fs_error, io_error, CliError, CliResult, INTERRUPTED, SUCCESS};
use crate::output::{print_exec_output, print_raw, OutputFormat};

pub async fn run(
    args: RunArgs,
    mut files: Files<StreamTransport>,
    format: OutputFormat,
) -> CliResult<i32> {
    let code = tokio::fs::read_to_string(&args.file)
        .await
        .map_err(|err| io_error(&format!("failed reading {}", args.file.display()), err))?;

    if args.no_wait {
        files
            .run(&code, RunMode::Detach)
            .await
            .map_err(|err| fs_error("run failed", err))?;
        tracing::info!(file = %args.file.display(), "script started");
        return Ok(SUCCESS);
    }

    if !args.stream {
        let out = files
            .run(&code, RunMode::Wait)
            .await
            .map_err(|err| fs_error("run failed", err))?;
        print_exec_output(out.as_deref().unwrap_or_default(), format);
        return Ok(SUCCESS);
    }

    // Ctrl-C tears the connection down; the device keeps running the script.
    let transport = Arc::clone(files.session().transport());
    let mut printer = StreamPrinter::default();
    let mut sink = |data: &[u8]| print_raw(printer.feed(data));

    tokio::select! {
        result = files.run(&code, RunMode::Stream(&mut sink)) => {
            result.map_err(|err| fs_error("run failed", err))?;
            Ok(SUCCESS)
        }
        _ = tokio::signal::ctrl_c() => {
            transport.close();
            Err(CliError::new(INTERRUPTED, "interrupted"))
        }
    }
}

/// Turns the growing stdout snapshots of a streaming run into increments.
#[derive(Debug, Default)]
struct StreamPrinter {
    printed: usize,
}

impl StreamPrinter {
    /// The part of `snapshot` not printed yet, up to the stdout sentinel.
    fn feed<'a>(&mut self, snapshot: &'a [u8]) -> &'a [u8] {
        let end = snapshot
            .iter()
            .position(|&b| b == CTRL_D)
            .unwrap_or(snapshot.len());
        if end <= self.printed {
            return &[];
        }
        let fresh = &snapshot[self.printed..end];
        self.printed = end;
        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn printer_emits_only_new_bytes() {
        let mut printer = StreamPrinter::default();
        assert_eq!(printer.feed(b""), b"");
        assert_eq!(printer.feed(b"tick 1\r\n"), b"tick 1\r\n");
        assert_eq!(printer.feed(b"tick 1\r\ntick 2\r\n"), b"tick 2\r\n");
        assert_eq!(printer.feed(b"tick 1\r\ntick 2\r\n"), b"");
    }

    #[test]
    fn printer_stops_at_sentinel() {
        let mut printer = StreamPrinter::default();
        assert_eq!(printer.feed(b"done\r\n\x04Traceback"), b"done\r\n");
        assert_eq!(printer.feed(b"done\r\n\x04Traceback\x04"), b"");
    }
}
