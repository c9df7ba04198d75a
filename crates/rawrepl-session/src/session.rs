use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;

use rawrepl_frame::{DataSink, ReadOutcome, ReplReader};
use rawrepl_transport::Transport;
use tracing::{trace, warn};

use crate::config::SessionConfig;
use crate::error::Result;
use crate::handshake::ReplState;

/// A raw REPL session over one transport.
///
/// Owns the read-until engine and the protocol state. Every operation takes
/// `&mut self`, so operations on one session are strictly sequential.
pub struct Session<T: Transport> {
    pub(crate) transport: Arc<T>,
    pub(crate) reader: ReplReader<T>,
    pub(crate) config: SessionConfig,
    pub(crate) state: ReplState,
    pub(crate) settled: bool,
}

impl<T: Transport> Session<T> {
    /// Create a session with default configuration.
    pub fn new(transport: Arc<T>) -> Self {
        Self::with_config(transport, SessionConfig::default())
    }

    /// Create a session with explicit configuration.
    pub fn with_config(transport: Arc<T>, config: SessionConfig) -> Self {
        let reader = ReplReader::attach(Arc::clone(&transport));
        Self {
            transport,
            reader,
            config,
            state: ReplState::Idle,
            settled: false,
        }
    }

    /// Current protocol state.
    pub fn state(&self) -> ReplState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Update the configuration for subsequent operations.
    pub fn set_config(&mut self, config: SessionConfig) {
        self.config = config;
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Wait for `pattern` in the device output, or for `timeout`.
    ///
    /// See [`ReplReader::read_until`].
    pub async fn read_until(
        &mut self,
        min_bytes: usize,
        pattern: &[u8],
        timeout: Duration,
        on_data: Option<&mut DataSink<'_>>,
    ) -> Result<ReadOutcome> {
        Ok(self
            .reader
            .read_until(min_bytes, pattern, timeout, on_data)
            .await?)
    }

    /// Enter raw REPL and return a guard that exits it when dropped.
    ///
    /// If entering fails, the exit sequence is still sent before the error is
    /// returned, so the device is never left in a half-entered state.
    pub async fn raw_repl(&mut self) -> Result<RawRepl<'_, T>> {
        if let Err(err) = self.enter_raw_repl().await {
            if let Err(exit_err) = self.exit_raw_repl() {
                warn!(error = %exit_err, "exit raw repl after failed entry");
            }
            return Err(err);
        }
        Ok(RawRepl { session: self })
    }

    pub(crate) fn write(&self, data: &[u8]) -> Result<()> {
        trace!(data = %data.escape_ascii(), "write");
        self.transport.write(data)?;
        Ok(())
    }
}

impl<T: Transport> fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("config", &self.config)
            .finish()
    }
}

/// Scoped raw REPL acquisition.
///
/// Derefs to the [`Session`]; dropping the guard sends the raw REPL exit
/// sequence on every path, including early returns and errors.
pub struct RawRepl<'a, T: Transport> {
    session: &'a mut Session<T>,
}

impl<T: Transport> Deref for RawRepl<'_, T> {
    type Target = Session<T>;

    fn deref(&self) -> &Self::Target {
        self.session
    }
}

impl<T: Transport> DerefMut for RawRepl<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.session
    }
}

impl<T: Transport> Drop for RawRepl<'_, T> {
    fn drop(&mut self) {
        if let Err(err) = self.session.exit_raw_repl() {
            warn!(error = %err, "exit raw repl failed");
        }
    }
}
