use rawrepl_session::protocol::FILE_CHUNK_SIZE;
use rawrepl_session::{DataSink, RemoteErrorKind, Session};
use rawrepl_transport::Transport;
use tracing::{debug, info};

use crate::error::{FsError, Result};
use crate::snippet;

/// Options for [`Files::ls`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOptions {
    /// Append `" - N bytes"` to every entry.
    pub long: bool,
    /// Walk subdirectories; leaves are files and empty directories.
    pub recursive: bool,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            long: true,
            recursive: false,
        }
    }
}

/// How [`Files::run`] treats the program's output.
pub enum RunMode<'a> {
    /// Transmit and start the program, then return without reading output.
    Detach,
    /// Wait for the program to finish and return its stdout.
    Wait,
    /// Like `Wait`, also feeding stdout to the sink as it arrives.
    Stream(&'a mut DataSink<'a>),
}

/// Filesystem operations on the device behind a session.
///
/// Each call enters raw REPL, runs one or more generated programs and leaves
/// raw REPL again, whatever the outcome.
#[derive(Debug)]
pub struct Files<T: Transport> {
    session: Session<T>,
}

impl<T: Transport> Files<T> {
    pub fn new(session: Session<T>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session<T> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<T> {
        &mut self.session
    }

    pub fn into_inner(self) -> Session<T> {
        self.session
    }

    /// Read a remote file.
    pub async fn get(&mut self, path: &str) -> Result<Vec<u8>> {
        let out = self
            .exec_scoped(&snippet::get(path))
            .await
            .map_err(|err| FsError::for_path(err, path, &[RemoteErrorKind::NotFound]))?;
        let data = hex::decode(out.trim()).map_err(|err| FsError::Decode(err.to_string()))?;
        debug!(path, len = data.len(), "file read");
        Ok(data)
    }

    /// List a remote directory. Paths are returned absolute and sorted.
    pub async fn ls(&mut self, dir: &str, options: ListOptions) -> Result<Vec<String>> {
        let dir = absolute_dir(dir);
        let code = snippet::ls(&dir, options.long, options.recursive);
        let out = self
            .exec_scoped(&code)
            .await
            .map_err(|err| FsError::for_path(err, &dir, &[RemoteErrorKind::NotFound]))?;
        parse_listing(&out)
    }

    /// Create a remote directory.
    ///
    /// With `exists_okay`, an existing directory is not an error.
    pub async fn mkdir(&mut self, dir: &str, exists_okay: bool) -> Result<()> {
        match self.exec_scoped(&snippet::mkdir(dir)).await {
            Ok(_) => Ok(()),
            Err(err) => match FsError::for_path(
                err,
                dir,
                &[RemoteErrorKind::AlreadyExists, RemoteErrorKind::NotFound],
            ) {
                FsError::AlreadyExists { .. } if exists_okay => {
                    debug!(dir, "directory already exists");
                    Ok(())
                }
                err => Err(err),
            },
        }
    }

    /// Write `data` to a remote file, replacing its content.
    ///
    /// The payload is sent in 32-byte chunks; `on_progress` receives each
    /// chunk's length once the device has written it. A failed chunk aborts
    /// the transfer and leaves a partial file behind.
    pub async fn put(
        &mut self,
        path: &str,
        data: &[u8],
        mut on_progress: Option<&mut (dyn FnMut(usize) + Send)>,
    ) -> Result<()> {
        let mut repl = self.session.raw_repl().await?;

        repl.exec(&snippet::open_for_write(path))
            .await
            .map_err(|err| FsError::for_path(err, path, &[RemoteErrorKind::NotFound]))?;

        for chunk in data.chunks(FILE_CHUNK_SIZE) {
            repl.exec(&snippet::write_chunk(chunk)).await?;
            if let Some(progress) = on_progress.as_deref_mut() {
                progress(chunk.len());
            }
        }

        repl.exec(snippet::CLOSE_FILE).await?;
        info!(path, len = data.len(), "file written");
        Ok(())
    }

    /// Remove a remote file.
    pub async fn rm(&mut self, path: &str) -> Result<()> {
        self.exec_scoped(&snippet::rm(path)).await.map_err(|err| {
            FsError::for_path(
                err,
                path,
                &[RemoteErrorKind::NotFound, RemoteErrorKind::NotEmpty],
            )
        })?;
        debug!(path, "file removed");
        Ok(())
    }

    /// Remove a remote directory and everything below it.
    pub async fn rmdir(&mut self, dir: &str) -> Result<()> {
        self.exec_scoped(&snippet::rmdir(dir))
            .await
            .map_err(|err| FsError::for_path(err, dir, &[RemoteErrorKind::NotFound]))?;
        debug!(dir, "directory removed");
        Ok(())
    }

    /// Run a program on the device.
    ///
    /// Returns its stdout, or `None` for [`RunMode::Detach`]. A program that
    /// raises fails with the classified remote error.
    pub async fn run(&mut self, code: &str, mode: RunMode<'_>) -> Result<Option<String>> {
        let mut repl = self.session.raw_repl().await?;
        let out = match mode {
            RunMode::Detach => {
                repl.exec_raw_no_follow(code).await?;
                None
            }
            RunMode::Wait => Some(repl.exec(code).await?),
            RunMode::Stream(sink) => Some(repl.exec_streaming(code, sink).await?),
        };
        Ok(out)
    }

    async fn exec_scoped(&mut self, code: &str) -> rawrepl_session::Result<String> {
        let mut repl = self.session.raw_repl().await?;
        repl.exec(code).await
    }
}

/// Parse the printed Python list produced by the listing program.
///
/// Empty output is an empty listing.
pub fn parse_listing(out: &str) -> Result<Vec<String>> {
    let text = out.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&text.replace('\'', "\""))?)
}

fn absolute_dir(dir: &str) -> String {
    let trimmed = dir.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}
