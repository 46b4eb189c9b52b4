//! Lines backed by GPIO character device files.
//!
//! Every line is one device file, for example `/dev/gpio27`. Reading the file from offset 0
//! yields the ASCII character `'1'` or `'0'`, writing one of these characters drives the line.
//! The files must already exist and be configured with the correct direction. Exporting the pins
//! is the job of the system setup, not of this module.
//!
//! The GPIO driver does not implement seeking. Levels are read with a positional read at offset 0
//! and written without any positioning. Regular files standing in for devices are overwritten at
//! offset 0 instead.
//!
//! Edge detection uses polling with the granularity configured by
//! [TimingPolicy::edge_poll_interval][crate::timing::TimingPolicy::edge_poll_interval]: the
//! clock line is re-read until a low level followed by a high level was observed.
use core::time::Duration;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{LineError, SetupError};
use crate::lines::{EdgeResult, EndpointRole, Level, LineId, SignalLines};
use crate::timing::hold;

/// Device file of every line.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LinePaths {
    pub clock: PathBuf,
    pub master_out: PathBuf,
    pub slave_out: PathBuf,
}

impl LinePaths {
    pub fn new(
        clock: impl Into<PathBuf>,
        master_out: impl Into<PathBuf>,
        slave_out: impl Into<PathBuf>,
    ) -> Self {
        Self {
            clock: clock.into(),
            master_out: master_out.into(),
            slave_out: slave_out.into(),
        }
    }

    /// Default wiring of the master board.
    pub fn default_master() -> Self {
        Self::new("/dev/gpio22", "/dev/gpio27", "/dev/gpio17")
    }

    /// Default wiring of the slave board.
    pub fn default_slave() -> Self {
        Self::new("/dev/gpio21", "/dev/gpio26", "/dev/gpio20")
    }

    pub fn path(&self, line: LineId) -> &Path {
        match line {
            LineId::Clock => &self.clock,
            LineId::MasterOut => &self.master_out,
            LineId::SlaveOut => &self.slave_out,
        }
    }
}

#[derive(Debug)]
struct LineFile {
    file: File,
    writable: bool,
    regular: bool,
}

/// Line set of one endpoint backed by character device files.
#[derive(Debug)]
pub struct CharDevLines {
    role: EndpointRole,
    files: [LineFile; 3],
    poll_interval: Duration,
    last_seen: [Option<Level>; 3],
}

impl CharDevLines {
    /// Open all three lines. Lines driven by `role` are opened write-only, the others read-only.
    pub fn open(
        role: EndpointRole,
        paths: &LinePaths,
        poll_interval: Duration,
    ) -> Result<Self, SetupError> {
        let open_line = |line: LineId| -> Result<LineFile, SetupError> {
            let path = paths.path(line);
            let writable = line.is_driven_by(role);
            let setup_error = |source| SetupError {
                line,
                path: path.to_path_buf(),
                source,
            };
            let file = OpenOptions::new()
                .read(!writable)
                .write(writable)
                .open(path)
                .map_err(setup_error)?;
            let regular = file.metadata().map_err(setup_error)?.is_file();
            log::debug!(
                "opened {} at {} as {}",
                line,
                path.display(),
                if writable { "output" } else { "input" }
            );
            Ok(LineFile {
                file,
                writable,
                regular,
            })
        };
        Ok(Self {
            role,
            files: [
                open_line(LineId::Clock)?,
                open_line(LineId::MasterOut)?,
                open_line(LineId::SlaveOut)?,
            ],
            poll_interval,
            last_seen: [None; 3],
        })
    }

    pub fn role(&self) -> EndpointRole {
        self.role
    }

    fn io_error(line: LineId) -> impl FnOnce(io::Error) -> LineError {
        move |source| LineError::Io { line, source }
    }

    fn read_level(&mut self, line: LineId) -> Result<Level, LineError> {
        let line_file = &mut self.files[line.index()];
        if line_file.writable {
            return Err(LineError::NotReadable(line));
        }
        let mut raw = [0u8; 1];
        line_file
            .file
            .read_exact_at(&mut raw, 0)
            .map_err(Self::io_error(line))?;
        Level::from_ascii(raw[0]).ok_or(LineError::InvalidLevel { line, raw: raw[0] })
    }
}

impl SignalLines for CharDevLines {
    fn set_level(&mut self, line: LineId, level: Level) -> Result<(), LineError> {
        let line_file = &mut self.files[line.index()];
        if !line_file.writable {
            return Err(LineError::NotWritable(line));
        }
        let raw = [level.as_ascii()];
        let result = if line_file.regular {
            line_file.file.write_all_at(&raw, 0)
        } else {
            line_file.file.write_all(&raw)
        };
        result.map_err(Self::io_error(line))
    }

    fn get_level(&mut self, line: LineId) -> Result<Level, LineError> {
        self.read_level(line)
    }

    fn await_edge(&mut self, line: LineId, timeout: Duration) -> Result<EdgeResult, LineError> {
        let deadline = Instant::now() + timeout;
        let mut previous = match self.last_seen[line.index()] {
            Some(level) => level,
            None => self.read_level(line)?,
        };
        loop {
            let level = self.read_level(line)?;
            self.last_seen[line.index()] = Some(level);
            if previous == Level::Low && level == Level::High {
                return Ok(EdgeResult::EdgeObserved);
            }
            previous = level;
            let now = Instant::now();
            if now >= deadline {
                return Ok(EdgeResult::TimedOut);
            }
            hold((deadline - now).min(self.poll_interval));
        }
    }
}
