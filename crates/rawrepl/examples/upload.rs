//! Upload a script as `template.py`, then soft-reset the board so it runs.
//!
//! Run with:
//!   cargo run --example upload -- /dev/ttyACM0 app.py
//!
//! The line is put in raw mode at 115200 baud.

use std::sync::Arc;

use rawrepl::fs::Files;
use rawrepl::session::Session;
use rawrepl::transport::{SerialConfig, StreamTransport};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let device = args.next().ok_or("usage: upload <device> <script>")?;
    let script = args.next().ok_or("usage: upload <device> <script>")?;

    let code = tokio::fs::read(&script).await?;
    eprintln!("Opening {device}");
    let config = SerialConfig {
        baud_rate: Some(115200),
    };
    let transport = Arc::new(StreamTransport::open_serial(&device, &config).await?);
    let mut files = Files::new(Session::new(Arc::clone(&transport)));

    eprintln!("Uploading {script} as template.py");
    let total = code.len().max(1);
    let mut sent = 0;
    let mut on_progress = |n: usize| {
        sent += n;
        eprintln!("Progress: {}%", sent * 100 / total);
    };
    files.put("template.py", &code, Some(&mut on_progress)).await?;

    eprintln!("Resetting board");
    let banner = files.session_mut().soft_reset().await?;
    eprint!("{banner}");

    transport.shutdown().await;
    Ok(())
}
