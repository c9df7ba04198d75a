//! Simulated raw REPL board for tests.
//!
//! Speaks the device side of the protocol on top of a [`MemoryTransport`]:
//! banners, soft reboot, `OK` acknowledgement and the `0x04`-framed
//! stdout/stderr pair. What executed code "prints" is decided by a handler.

use std::sync::Arc;

use rawrepl_transport::MemoryTransport;

use crate::exec::ExecResult;
use crate::protocol::{
    CTRL_C, CTRL_D, ENTER_RAW_REPL, EOF, EXEC_ACK, EXIT_RAW_REPL, INTERRUPT, PROMPT,
    RAW_REPL_PROMPT_BANNER,
};

type ExecHandler = Box<dyn FnMut(&str) -> ExecResult + Send>;

const FRIENDLY_BANNER: &[u8] = b"MicroPython v1.22.0 on 2024-01-01; simulated board\r\n>>> ";

/// Entry point for building a simulated board.
pub struct SimulatedBoard;

impl SimulatedBoard {
    pub fn builder() -> SimulatedBoardBuilder {
        SimulatedBoardBuilder::default()
    }
}

/// Configures how the simulated board behaves.
#[derive(Default)]
pub struct SimulatedBoardBuilder {
    refuse_enter: usize,
    silent_reboot: bool,
    withhold_ack: bool,
    unterminated_output: bool,
    handler: Option<ExecHandler>,
}

impl SimulatedBoardBuilder {
    /// Ignore the first `attempts` raw REPL entry requests.
    pub fn refuse_enter(mut self, attempts: usize) -> Self {
        self.refuse_enter = attempts;
        self
    }

    /// Never print the soft reboot banner.
    pub fn silent_reboot(mut self) -> Self {
        self.silent_reboot = true;
        self
    }

    /// Never acknowledge code with `OK`.
    pub fn withhold_ack(mut self) -> Self {
        self.withhold_ack = true;
        self
    }

    /// Acknowledge code and print stdout, but never send the sentinels.
    pub fn unterminated_output(mut self) -> Self {
        self.unterminated_output = true;
        self
    }

    /// Decide the output of every executed code block.
    pub fn on_exec<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&str) -> ExecResult + Send + 'static,
    {
        self.handler = Some(Box::new(handler));
        self
    }

    pub fn build(self) -> Arc<MemoryTransport> {
        let mut board = Board {
            settings: self,
            raw: false,
            fresh: false,
            enter_requests: 0,
            code: Vec::new(),
        };
        Arc::new(MemoryTransport::with_responder(move |data| board.respond(data)))
    }
}

struct Board {
    settings: SimulatedBoardBuilder,
    raw: bool,
    fresh: bool,
    enter_requests: usize,
    code: Vec<u8>,
}

impl Board {
    fn respond(&mut self, data: &[u8]) -> Vec<Vec<u8>> {
        if data == INTERRUPT || data == [CTRL_C] {
            self.code.clear();
            return Vec::new();
        }

        if data == ENTER_RAW_REPL {
            self.enter_requests += 1;
            if self.enter_requests <= self.settings.refuse_enter {
                return vec![b"\r\n>>> ".to_vec()];
            }
            self.raw = true;
            self.fresh = true;
            self.code.clear();
            let (head, tail) = RAW_REPL_PROMPT_BANNER.split_at(14);
            return vec![head.to_vec(), tail.to_vec()];
        }

        if data == EXIT_RAW_REPL {
            self.raw = false;
            return vec![b"\r\n".to_vec(), FRIENDLY_BANNER.to_vec()];
        }

        if data == [CTRL_D] {
            if !self.raw {
                return vec![b"MPY: soft reboot\r\n".to_vec(), FRIENDLY_BANNER.to_vec()];
            }
            if self.fresh {
                self.fresh = false;
                if self.settings.silent_reboot {
                    return Vec::new();
                }
                return vec![
                    b"MPY: soft reboot\r\n".to_vec(),
                    RAW_REPL_PROMPT_BANNER.to_vec(),
                ];
            }
            return self.execute();
        }

        if self.raw {
            self.code.extend_from_slice(data);
        }
        Vec::new()
    }

    fn execute(&mut self) -> Vec<Vec<u8>> {
        let code = String::from_utf8_lossy(&std::mem::take(&mut self.code)).into_owned();
        if self.settings.withhold_ack {
            return Vec::new();
        }

        let result = match self.settings.handler.as_mut() {
            Some(handler) => handler(&code),
            None => ExecResult::default(),
        };

        let mut replies = vec![EXEC_ACK.to_vec()];
        replies.extend(
            result
                .stdout
                .as_bytes()
                .chunks(16)
                .map(<[u8]>::to_vec),
        );
        if self.settings.unterminated_output {
            return replies;
        }
        replies.push(EOF.to_vec());
        if !result.stderr.is_empty() {
            replies.push(result.stderr.into_bytes());
        }
        replies.push(EOF.to_vec());
        replies.push(PROMPT.to_vec());
        replies
    }
}
