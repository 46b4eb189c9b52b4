//! JSON lines report of completed byte rounds.
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use gpiolink::{ByteReport, ReportSink};

/// Writes every byte report as one JSON object per line.
pub struct JsonLinesReport<W: Write> {
    writer: W,
    failed: bool,
}

impl JsonLinesReport<BufWriter<File>> {
    pub fn create(path: &Path) -> io::Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> JsonLinesReport<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            failed: false,
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_report(&mut self, report: &ByteReport) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, report)?;
        self.writer.write_all(b"\n")
    }
}

impl<W: Write> ReportSink for JsonLinesReport<W> {
    fn report(&mut self, report: ByteReport) {
        if self.failed {
            return;
        }
        if let Err(e) = self.write_report(&report) {
            log::warn!("writing byte report failed, disabling report file: {e}");
            self.failed = true;
        }
    }
}
