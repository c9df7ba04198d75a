use std::fmt;

use rawrepl_transport::Transport;
use tracing::{debug, info};

use crate::error::{ProtocolError, Result};
use crate::protocol::{
    CTRL_C, CTRL_D, ENTER_RAW_REPL, EXIT_RAW_REPL, INTERRUPT, RAW_REPL_BANNER,
    RAW_REPL_PROMPT_BANNER, SOFT_REBOOT_BANNER,
};
use crate::session::Session;

/// Raw REPL handshake state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplState {
    /// Out of raw REPL.
    Idle,
    /// Stopping whatever program the device is running.
    Interrupting,
    /// Waiting for the raw REPL banner and prompt.
    AwaitingRawPrompt,
    /// Waiting for the soft reboot banner.
    SoftRebooting,
    /// Waiting for the raw REPL banner after the reboot.
    AwaitingRawReady,
    /// Ready to execute code.
    RawRepl,
    /// The last handshake failed.
    Error,
}

impl fmt::Display for ReplState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReplState::Idle => "idle",
            ReplState::Interrupting => "interrupting",
            ReplState::AwaitingRawPrompt => "awaiting-raw-prompt",
            ReplState::SoftRebooting => "soft-rebooting",
            ReplState::AwaitingRawReady => "awaiting-raw-ready",
            ReplState::RawRepl => "raw-repl",
            ReplState::Error => "error",
        };
        f.write_str(name)
    }
}

impl<T: Transport> Session<T> {
    /// Bring the device into raw REPL mode.
    ///
    /// Interrupts any running program, requests raw REPL (retrying up to
    /// `max_enter_attempts` times), soft-reboots for a clean interpreter and
    /// waits until raw REPL is ready again. Prefer [`Session::raw_repl`],
    /// which guarantees the matching exit.
    pub async fn enter_raw_repl(&mut self) -> Result<()> {
        match self.handshake().await {
            Ok(()) => {
                self.state = ReplState::RawRepl;
                debug!("entered raw repl");
                Ok(())
            }
            Err(err) => {
                debug!(error = %err, state = %self.state, "raw repl handshake failed");
                self.state = ReplState::Error;
                Err(err)
            }
        }
    }

    /// Leave raw REPL. Does not wait for the device to acknowledge.
    ///
    /// A failed handshake stays visible as [`ReplState::Error`] until the next
    /// successful entry.
    pub fn exit_raw_repl(&mut self) -> Result<()> {
        self.write(EXIT_RAW_REPL)?;
        if self.state != ReplState::Error {
            self.state = ReplState::Idle;
        }
        debug!("exit raw repl sent");
        Ok(())
    }

    /// Soft-reboot the device from the friendly REPL and wait for the banner.
    ///
    /// Returns everything read up to and including the banner.
    pub async fn soft_reset(&mut self) -> Result<String> {
        self.write(&[CTRL_D])?;
        let outcome = self
            .read_until(1, SOFT_REBOOT_BANNER, self.config.reboot_timeout, None)
            .await?;
        if !outcome.is_matched() {
            return Err(ProtocolError::SoftRebootMissing.into());
        }
        info!("device soft reset");
        Ok(String::from_utf8_lossy(outcome.bytes()).into_owned())
    }

    async fn handshake(&mut self) -> Result<()> {
        if !self.settled {
            if let Some(delay) = self.config.start_delay {
                debug!(?delay, "waiting for device to settle");
                tokio::time::sleep(delay).await;
            }
            self.settled = true;
        }

        self.state = ReplState::Interrupting;
        self.write(INTERRUPT)?;
        tokio::time::sleep(self.config.interrupt_delay).await;
        self.write(&[CTRL_C])?;
        tokio::time::sleep(self.config.interrupt_delay).await;

        self.state = ReplState::AwaitingRawPrompt;
        let max_attempts = self.config.max_enter_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            self.write(ENTER_RAW_REPL)?;
            let outcome = self
                .read_until(1, RAW_REPL_PROMPT_BANNER, self.config.banner_timeout, None)
                .await?;
            if outcome.is_matched() {
                debug!(attempt, "raw repl banner received");
                break;
            }
            if attempt >= max_attempts {
                return Err(ProtocolError::RawReplUnavailable { attempts: attempt }.into());
            }
            debug!(
                attempt,
                received = %outcome.bytes().escape_ascii(),
                "raw repl banner missing, retrying"
            );
            tokio::time::sleep(self.config.retry_delay).await;
        }

        self.state = ReplState::SoftRebooting;
        self.write(&[CTRL_D])?;
        let outcome = self
            .read_until(1, SOFT_REBOOT_BANNER, self.config.reboot_timeout, None)
            .await?;
        if !outcome.is_matched() {
            return Err(ProtocolError::SoftRebootMissing.into());
        }

        tokio::time::sleep(self.config.reboot_settle).await;
        self.write(&[CTRL_C])?;
        tokio::time::sleep(self.config.interrupt_delay).await;
        self.write(&[CTRL_C])?;

        self.state = ReplState::AwaitingRawReady;
        let outcome = self
            .read_until(1, RAW_REPL_BANNER, self.config.reboot_timeout, None)
            .await?;
        if !outcome.is_matched() {
            return Err(ProtocolError::NotReadyAfterReboot.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::config::SessionConfig;
    use crate::error::SessionError;
    use crate::sim::SimulatedBoard;

    #[tokio::test(start_paused = true)]
    async fn enters_and_exits_raw_repl() {
        let transport = SimulatedBoard::builder().build();
        let mut session = Session::new(Arc::clone(&transport));

        session.enter_raw_repl().await.unwrap();
        assert_eq!(session.state(), ReplState::RawRepl);
        assert_eq!(transport.count_writes(ENTER_RAW_REPL), 1);

        session.exit_raw_repl().unwrap();
        assert_eq!(session.state(), ReplState::Idle);
        assert_eq!(transport.count_writes(EXIT_RAW_REPL), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn handshake_sends_interrupts_before_entry() {
        let transport = SimulatedBoard::builder().build();
        let mut session = Session::new(Arc::clone(&transport));
        session.enter_raw_repl().await.unwrap();

        let writes = transport.writes();
        assert_eq!(writes[0], INTERRUPT.to_vec());
        assert_eq!(writes[1], vec![CTRL_C]);
        assert_eq!(writes[2], ENTER_RAW_REPL.to_vec());
        assert_eq!(writes[3], vec![CTRL_D]);
        assert_eq!(writes[4], vec![CTRL_C]);
        assert_eq!(writes[5], vec![CTRL_C]);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_third_attempt() {
        let transport = SimulatedBoard::builder().refuse_enter(2).build();
        let mut session = Session::new(Arc::clone(&transport));

        session.enter_raw_repl().await.unwrap();

        assert_eq!(transport.count_writes(ENTER_RAW_REPL), 3);
        assert_eq!(session.state(), ReplState::RawRepl);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_five_attempts() {
        let transport = SimulatedBoard::builder().refuse_enter(usize::MAX).build();
        let mut session = Session::new(Arc::clone(&transport));

        let err = session.enter_raw_repl().await.unwrap_err();

        assert!(matches!(
            err,
            SessionError::Protocol(ProtocolError::RawReplUnavailable { attempts: 5 })
        ));
        assert_eq!(transport.count_writes(ENTER_RAW_REPL), 5);
        assert_eq!(session.state(), ReplState::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_soft_reboot_is_fatal() {
        let transport = SimulatedBoard::builder().silent_reboot().build();
        let mut session = Session::new(Arc::clone(&transport));

        let err = session.enter_raw_repl().await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Protocol(ProtocolError::SoftRebootMissing)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_entry_through_guard_still_exits() {
        let transport = SimulatedBoard::builder().refuse_enter(usize::MAX).build();
        let mut session = Session::new(Arc::clone(&transport));

        assert!(session.raw_repl().await.is_err());
        assert_eq!(transport.count_writes(EXIT_RAW_REPL), 1);
        assert_eq!(session.state(), ReplState::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn guard_exits_on_drop() {
        let transport = SimulatedBoard::builder().build();
        let mut session = Session::new(Arc::clone(&transport));

        {
            let repl = session.raw_repl().await.unwrap();
            assert_eq!(repl.state(), ReplState::RawRepl);
            assert_eq!(transport.count_writes(EXIT_RAW_REPL), 0);
        }

        assert_eq!(transport.count_writes(EXIT_RAW_REPL), 1);
        assert_eq!(session.state(), ReplState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn start_delay_applies_once() {
        let transport = SimulatedBoard::builder().build();
        let config = SessionConfig {
            start_delay: Some(Duration::from_secs(3)),
            ..SessionConfig::default()
        };
        let mut session = Session::with_config(Arc::clone(&transport), config);

        let started = tokio::time::Instant::now();
        session.enter_raw_repl().await.unwrap();
        session.exit_raw_repl().unwrap();
        let first = started.elapsed();

        let started = tokio::time::Instant::now();
        session.enter_raw_repl().await.unwrap();
        let second = started.elapsed();

        assert!(first >= Duration::from_secs(3));
        assert!(second < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn soft_reset_waits_for_banner() {
        let transport = SimulatedBoard::builder().build();
        let mut session = Session::new(Arc::clone(&transport));

        let banner = session.soft_reset().await.unwrap();
        assert!(banner.ends_with("soft reboot\r\n"));
        assert_eq!(session.state(), ReplState::Idle);
    }

    #[test]
    fn state_display_names() {
        assert_eq!(ReplState::RawRepl.to_string(), "raw-repl");
        assert_eq!(ReplState::AwaitingRawPrompt.to_string(), "awaiting-raw-prompt");
    }
}
