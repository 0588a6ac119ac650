//! Diagnostic output for interactive runs.
//!
//! A [`Reporter`] is picked once, at construction time, and handed to
//! whatever needs to print progress. [`Silent`] drops everything;
//! [`Verbose`] prefixes every line with the channel it came from.

use std::fmt;
use std::io::Write;
use std::sync::Mutex;

/// Where a diagnostic message comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// General progress.
    Info,
    /// The source database.
    Source,
    /// The destination database.
    Destination,
}

impl Channel {
    pub fn prefix(&self) -> &'static str {
        match self {
            Channel::Info => "inf",
            Channel::Source => "src",
            Channel::Destination => "dst",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

pub trait Reporter: Send + Sync {
    fn report(&self, channel: Channel, message: &str);
}

/// Discards all messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl Reporter for Silent {
    fn report(&self, _channel: Channel, _message: &str) {}
}

/// Writes each line of a message as `<prefix> <line>`.
pub struct Verbose<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> Verbose<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> Reporter for Verbose<W> {
    fn report(&self, channel: Channel, message: &str) {
        let mut out = match self.out.lock() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        };
        for line in message.split('\n') {
            if let Err(e) = writeln!(out, "{} {}", channel.prefix(), line) {
                tracing::warn!(error = %e, "failed to write diagnostic output");
                return;
            }
        }
    }
}

/// Pick the reporter for a run. Verbose output goes to `out`, which should
/// not be the stream that carries rendered SQL.
pub fn reporter_for<W: Write + Send + 'static>(verbose: bool, out: W) -> Box<dyn Reporter> {
    if verbose {
        Box::new(Verbose::new(out))
    } else {
        Box::new(Silent)
    }
}
