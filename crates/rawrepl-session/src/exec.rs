use std::path::Path;
use std::time::Duration;

use rawrepl_frame::DataSink;
use rawrepl_transport::Transport;
use tracing::{debug, trace};

use crate::error::{ProtocolError, Result};
use crate::protocol::{CTRL_D, EOF, EXEC_ACK, PROMPT};
use crate::remote::RemoteError;
use crate::session::Session;

/// Output of one raw REPL execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub stdout: String,
    /// Traceback text; non-empty means the code raised on the device.
    pub stderr: String,
}

impl ExecResult {
    pub fn is_error(&self) -> bool {
        !self.stderr.is_empty()
    }

    /// Stdout on success, a classified [`RemoteError`] otherwise.
    pub fn into_result(self) -> Result<String> {
        if self.is_error() {
            return Err(RemoteError::new(self.stdout, self.stderr).into());
        }
        Ok(self.stdout)
    }
}

impl<T: Transport> Session<T> {
    /// Send `code` for execution without waiting for its output.
    ///
    /// Waits for the `>` prompt, transmits the code in `chunk_size` pieces
    /// spaced by `chunk_delay`, triggers execution and waits for `OK`.
    pub async fn exec_raw_no_follow(&mut self, code: &str) -> Result<()> {
        let prompt = self
            .read_until(1, PROMPT, self.config.prompt_timeout, None)
            .await?;
        if !prompt.is_matched() {
            return Err(ProtocolError::PromptMissing.into());
        }

        let chunk_size = self.config.chunk_size.max(1);
        for chunk in code.as_bytes().chunks(chunk_size) {
            self.write(chunk)?;
            tokio::time::sleep(self.config.chunk_delay).await;
        }
        self.write(&[CTRL_D])?;

        let ack = self
            .read_until(EXEC_ACK.len(), EXEC_ACK, self.config.ack_timeout, None)
            .await?;
        if !ack.is_matched() {
            return Err(ProtocolError::ExecNotAcknowledged.into());
        }
        trace!(len = code.len(), "code accepted");
        Ok(())
    }

    /// Collect the stdout/stderr pair of the running code.
    ///
    /// Stdout is streamed through `on_data` as it arrives.
    pub async fn follow(
        &mut self,
        timeout: Duration,
        on_data: Option<&mut DataSink<'_>>,
    ) -> Result<ExecResult> {
        let stdout = self.read_until(1, EOF, timeout, on_data).await?;
        if !stdout.is_matched() {
            return Err(ProtocolError::FirstEofTimeout.into());
        }

        let stderr = self.read_until(1, EOF, timeout, None).await?;
        if !stderr.is_matched() {
            return Err(ProtocolError::SecondEofTimeout.into());
        }

        Ok(ExecResult {
            stdout: strip_sentinel(stdout.bytes()),
            stderr: strip_sentinel(stderr.bytes()),
        })
    }

    /// Execute `code` and return its stdout/stderr pair.
    pub async fn exec_raw(
        &mut self,
        code: &str,
        timeout: Duration,
        on_data: Option<&mut DataSink<'_>>,
    ) -> Result<ExecResult> {
        self.exec_raw_no_follow(code).await?;
        self.follow(timeout, on_data).await
    }

    /// Execute `code` and return its stdout; a traceback becomes an error.
    pub async fn exec(&mut self, code: &str) -> Result<String> {
        let timeout = self.config.exec_timeout;
        let result = self.exec_raw(code, timeout, None).await?;
        if result.is_error() {
            debug!(stderr = %result.stderr.trim_end(), "remote exception");
        }
        result.into_result()
    }

    /// Like [`Session::exec`], streaming stdout through `on_data`.
    pub async fn exec_streaming(
        &mut self,
        code: &str,
        on_data: &mut DataSink<'_>,
    ) -> Result<String> {
        let timeout = self.config.exec_timeout;
        self.exec_raw(code, timeout, Some(on_data))
            .await?
            .into_result()
    }

    /// Evaluate an expression on the device and return what it prints.
    pub async fn eval(&mut self, expression: &str) -> Result<String> {
        self.exec(&format!("print({expression})")).await
    }

    /// Execute a local script file on the device.
    pub async fn exec_file(&mut self, path: impl AsRef<Path>) -> Result<String> {
        let code = tokio::fs::read_to_string(path.as_ref()).await?;
        self.exec(&code).await
    }
}

fn strip_sentinel(data: &[u8]) -> String {
    let body = data.strip_suffix(EOF).unwrap_or(data);
    String::from_utf8_lossy(body).into_owned()
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::error::SessionError;
    use crate::protocol::CODE_CHUNK_SIZE;
    use crate::remote::RemoteErrorKind;
    use crate::sim::SimulatedBoard;

    #[tokio::test(start_paused = true)]
    async fn exec_returns_stdout() {
        let transport = SimulatedBoard::builder()
            .on_exec(|code| ExecResult {
                stdout: format!("ran {} bytes\r\n", code.len()),
                stderr: String::new(),
            })
            .build();
        let mut session = Session::new(transport);
        let mut repl = session.raw_repl().await.unwrap();

        let out = repl.exec("x = 1").await.unwrap();
        assert_eq!(out, "ran 5 bytes\r\n");
    }

    #[tokio::test(start_paused = true)]
    async fn eval_wraps_expression_in_print() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let transport = SimulatedBoard::builder()
            .on_exec(move |code| {
                log.lock().unwrap().push(code.to_string());
                ExecResult {
                    stdout: "3\r\n".to_string(),
                    stderr: String::new(),
                }
            })
            .build();
        let mut session = Session::new(transport);
        let mut repl = session.raw_repl().await.unwrap();

        assert_eq!(repl.eval("1 + 2").await.unwrap(), "3\r\n");
        assert_eq!(*seen.lock().unwrap(), vec!["print(1 + 2)".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn traceback_becomes_classified_remote_error() {
        let transport = SimulatedBoard::builder()
            .on_exec(|_| ExecResult {
                stdout: "partial".to_string(),
                stderr: "Traceback (most recent call last):\r\n  File \"<stdin>\", line 1, in <module>\r\nOSError: [Errno 2] ENOENT\r\n".to_string(),
            })
            .build();
        let mut session = Session::new(transport);
        let mut repl = session.raw_repl().await.unwrap();

        let err = repl.exec("open('missing')").await.unwrap_err();
        let remote = err.as_remote().expect("remote error");
        assert_eq!(remote.kind, RemoteErrorKind::NotFound);
        assert_eq!(remote.stdout, "partial");
        assert!(remote.stderr.contains("ENOENT"));
    }

    #[tokio::test(start_paused = true)]
    async fn exec_raw_keeps_stderr_without_raising() {
        let transport = SimulatedBoard::builder()
            .on_exec(|_| ExecResult {
                stdout: String::new(),
                stderr: "NameError: name 'pyb' isn't defined\r\n".to_string(),
            })
            .build();
        let mut session = Session::new(transport);
        let mut repl = session.raw_repl().await.unwrap();

        let result = repl
            .exec_raw("pyb.LED(1).on()", Duration::from_secs(1), None)
            .await
            .unwrap();
        assert!(result.is_error());
        assert!(result.stderr.starts_with("NameError"));
    }

    #[tokio::test(start_paused = true)]
    async fn code_is_sent_in_device_sized_chunks() {
        let transport = SimulatedBoard::builder()
            .on_exec(|code| ExecResult {
                stdout: code.len().to_string(),
                stderr: String::new(),
            })
            .build();
        let mut session = Session::new(Arc::clone(&transport));
        let mut repl = session.raw_repl().await.unwrap();

        let code = "a".repeat(CODE_CHUNK_SIZE * 2 + 10);
        assert_eq!(repl.exec(&code).await.unwrap(), code.len().to_string());
        drop(repl);

        let chunk_writes: Vec<usize> = transport
            .writes()
            .iter()
            .filter(|w| w.first() == Some(&b'a'))
            .map(Vec::len)
            .collect();
        assert_eq!(chunk_writes, vec![CODE_CHUNK_SIZE, CODE_CHUNK_SIZE, 10]);
    }

    #[tokio::test(start_paused = true)]
    async fn consecutive_execs_share_one_session() {
        let counter = Arc::new(Mutex::new(0u32));
        let count = Arc::clone(&counter);
        let transport = SimulatedBoard::builder()
            .on_exec(move |_| {
                let mut n = count.lock().unwrap();
                *n += 1;
                ExecResult {
                    stdout: n.to_string(),
                    stderr: String::new(),
                }
            })
            .build();
        let mut session = Session::new(transport);
        let mut repl = session.raw_repl().await.unwrap();

        assert_eq!(repl.exec("a").await.unwrap(), "1");
        assert_eq!(repl.exec("b").await.unwrap(), "2");
        assert_eq!(repl.exec("c").await.unwrap(), "3");
    }

    #[tokio::test(start_paused = true)]
    async fn missing_ack_is_fatal() {
        let transport = SimulatedBoard::builder().withhold_ack().build();
        let mut session = Session::new(transport);
        let mut repl = session.raw_repl().await.unwrap();

        let err = repl.exec("x = 1").await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Protocol(ProtocolError::ExecNotAcknowledged)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_sentinel_is_fatal() {
        let transport = SimulatedBoard::builder()
            .unterminated_output()
            .on_exec(|_| ExecResult {
                stdout: "running forever".to_string(),
                stderr: String::new(),
            })
            .build();
        let mut session = Session::new(transport);
        let mut repl = session.raw_repl().await.unwrap();

        let err = repl.exec("while True: pass").await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Protocol(ProtocolError::FirstEofTimeout)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn streaming_sink_sees_output() {
        let transport = SimulatedBoard::builder()
            .on_exec(|_| ExecResult {
                stdout: "line one\r\nline two\r\nline three\r\n".to_string(),
                stderr: String::new(),
            })
            .build();
        let mut session = Session::new(transport);
        let mut repl = session.raw_repl().await.unwrap();

        let mut snapshots: Vec<Vec<u8>> = Vec::new();
        let mut sink = |data: &[u8]| snapshots.push(data.to_vec());
        let out = repl.exec_streaming("main()", &mut sink).await.unwrap();

        assert_eq!(out, "line one\r\nline two\r\nline three\r\n");
        assert!(!snapshots.is_empty());
        assert!(snapshots[0].starts_with(b"line one\r\n"));
    }

    #[test]
    fn strip_sentinel_removes_only_trailing_eof() {
        assert_eq!(strip_sentinel(b"hello\x04"), "hello");
        assert_eq!(strip_sentinel(b"\x04"), "");
        assert_eq!(strip_sentinel(b"partial"), "partial");
    }
}
