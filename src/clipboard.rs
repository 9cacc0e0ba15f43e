//! Clipboard access through the OSC 52 terminal escape sequence.
//!
//! Works over SSH and inside most modern terminal emulators without a
//! platform clipboard library; terminals that do not support OSC 52 ignore it.

use std::io::{self, Write};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Build the OSC 52 "set clipboard" sequence for `text`.
pub fn osc52_sequence(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", STANDARD.encode(text.as_bytes()))
}

/// Write `text` to the system clipboard via the controlling terminal.
pub fn copy_to_clipboard(text: &str) -> io::Result<()> {
    let mut stdout = io::stdout();
    stdout.write_all(osc52_sequence(text).as_bytes())?;
    stdout.flush()
}
