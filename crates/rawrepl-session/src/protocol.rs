//! Raw REPL control bytes, banners and transmission constants.

/// Interrupt a running program (Ctrl-C).
pub const CTRL_C: u8 = 0x03;
/// Enter raw REPL (Ctrl-A).
pub const CTRL_A: u8 = 0x01;
/// Exit raw REPL (Ctrl-B).
pub const CTRL_B: u8 = 0x02;
/// Soft reboot, execute buffered code, or end-of-stream sentinel (Ctrl-D).
pub const CTRL_D: u8 = 0x04;

/// Interrupt sequence sent first, preceded by a carriage return.
pub const INTERRUPT: &[u8] = b"\r\x03";
/// Raw REPL entry sequence.
pub const ENTER_RAW_REPL: &[u8] = b"\r\x01";
/// Raw REPL exit sequence.
pub const EXIT_RAW_REPL: &[u8] = b"\r\x02";

/// Banner printed on raw REPL entry, including the input prompt.
pub const RAW_REPL_PROMPT_BANNER: &[u8] = b"raw REPL; CTRL-B to exit\r\n>";
/// Banner printed once the device is back in raw REPL after a soft reboot.
pub const RAW_REPL_BANNER: &[u8] = b"raw REPL; CTRL-B to exit\r\n";
/// Banner printed when a soft reboot starts.
pub const SOFT_REBOOT_BANNER: &[u8] = b"soft reboot\r\n";
/// Raw REPL input prompt.
pub const PROMPT: &[u8] = b">";
/// Acknowledgement of a received code block.
pub const EXEC_ACK: &[u8] = b"OK";
/// Sentinel terminating the stdout and stderr streams.
pub const EOF: &[u8] = &[CTRL_D];

/// Code is transmitted in chunks of this many bytes.
pub const CODE_CHUNK_SIZE: usize = 256;
/// File payloads are moved in chunks of this many bytes.
pub const FILE_CHUNK_SIZE: usize = 32;
