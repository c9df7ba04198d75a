use std::time::Duration;

use crate::protocol::CODE_CHUNK_SIZE;

/// Timing and sizing for one raw REPL session.
///
/// Every session carries its own copy; nothing is shared between sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Wait once before the first handshake, for boards that need to settle
    /// right after the connection opens.
    pub start_delay: Option<Duration>,
    /// Pause after each interrupt byte.
    pub interrupt_delay: Duration,
    /// How long to wait for the raw REPL banner on each entry attempt.
    pub banner_timeout: Duration,
    /// Pause between failed entry attempts.
    pub retry_delay: Duration,
    /// Number of raw REPL entry attempts before giving up.
    pub max_enter_attempts: u32,
    /// How long to wait for the soft reboot and post-reboot banners.
    pub reboot_timeout: Duration,
    /// Pause after the soft reboot banner before interrupting again.
    pub reboot_settle: Duration,
    /// How long to wait for the `>` prompt before sending code.
    pub prompt_timeout: Duration,
    /// How long to wait for the `OK` acknowledgement after sending code.
    pub ack_timeout: Duration,
    /// How long to wait for each of the stdout and stderr sentinels.
    pub exec_timeout: Duration,
    /// Code transmission chunk size in bytes.
    pub chunk_size: usize,
    /// Pause between code chunks.
    pub chunk_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            start_delay: None,
            interrupt_delay: Duration::from_millis(100),
            banner_timeout: Duration::from_secs(1),
            retry_delay: Duration::from_millis(200),
            max_enter_attempts: 5,
            reboot_timeout: Duration::from_secs(10),
            reboot_settle: Duration::from_millis(500),
            prompt_timeout: Duration::from_secs(10),
            ack_timeout: Duration::from_secs(10),
            exec_timeout: Duration::from_secs(10),
            chunk_size: CODE_CHUNK_SIZE,
            chunk_delay: Duration::from_millis(10),
        }
    }
}
