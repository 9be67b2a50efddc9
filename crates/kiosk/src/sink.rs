//! NDJSON access log.
//!
//! One row per scan, serialized straight into a buffered writer:
//!
//! ```ignore
//! let mut log = ScanLogSink::new(std::fs::File::create("scans.ndjson")?);
//! log.write_outcome("front-door", &outcome)?;
//! log.finish()?;
//! ```

use gymdesk_core::ScanOutcome;
use serde::Serialize;
use std::io::{self, BufWriter, Write};

/// Flattened log row for one scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanLogRow<'a> {
    pub kiosk_id: &'a str,
    pub decision: &'static str,
    pub source: &'static str,
    pub member_id: Option<&'a str>,
    pub member_name: Option<&'a str>,
    pub reason: Option<&'a str>,
    pub scanned_at: String,
}

impl<'a> ScanLogRow<'a> {
    pub fn from_outcome(kiosk_id: &'a str, outcome: &'a ScanOutcome) -> Self {
        Self {
            kiosk_id,
            decision: outcome.decision.as_str(),
            source: match outcome.source {
                gymdesk_core::ScanSource::Online => "online",
                gymdesk_core::ScanSource::Offline => "offline",
            },
            member_id: outcome.member_id.as_ref().map(|id| id.as_str()),
            member_name: outcome.member_name.as_deref(),
            reason: outcome.reason.as_deref(),
            scanned_at: outcome.scanned_at.to_rfc3339(),
        }
    }
}

pub struct ScanLogSink<W: Write> {
    writer: BufWriter<W>,
    rows_written: usize,
}

impl ScanLogSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ScanLogSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(16 * 1024, writer),
            rows_written: 0,
        }
    }

    /// Writes one row and flushes, so a crash loses at most the current scan.
    pub fn write_outcome(&mut self, kiosk_id: &str, outcome: &ScanOutcome) -> io::Result<()> {
        let row = ScanLogRow::from_outcome(kiosk_id, outcome);
        serde_json::to_writer(&mut self.writer, &row).map_err(io::Error::other)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.rows_written += 1;
        Ok(())
    }

    /// Flush and return how many rows were written.
    pub fn finish(mut self) -> io::Result<usize> {
        self.writer.flush()?;
        Ok(self.rows_written)
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }
}
