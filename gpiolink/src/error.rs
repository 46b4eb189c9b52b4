//! Error types of the link.
//!
//! Timing related corruption is not represented here. Bits sampled outside their window are
//! silently wrong and no component of the protocol is able to observe it.
use std::io;
use std::path::PathBuf;

use crate::lines::LineId;
use crate::timing::TimingError;

/// Failure of a single operation on an already acquired line.
#[derive(Debug, thiserror::Error)]
pub enum LineError {
    #[error("line {0} is not driven by this endpoint")]
    NotWritable(LineId),
    #[error("line {0} is not readable by this endpoint")]
    NotReadable(LineId),
    #[error("line {line} reported invalid level byte {raw:#04x}")]
    InvalidLevel { line: LineId, raw: u8 },
    #[error("I/O error on line {line}: {source}")]
    Io {
        line: LineId,
        #[source]
        source: io::Error,
    },
    #[error("line {0} was disconnected from its provider")]
    Disconnected(LineId),
}

/// A required line could not be acquired.
#[derive(Debug, thiserror::Error)]
#[error("acquiring line {line} at {path:?} failed: {source}")]
pub struct SetupError {
    pub line: LineId,
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Top-level error. Every variant aborts the running session.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Setup(#[from] SetupError),
    #[error(transparent)]
    Line(#[from] LineError),
    #[error("the reply message of a slave must contain at least one byte")]
    EmptyReply,
    #[error("invalid timing policy: {0}")]
    InvalidTiming(#[from] TimingError),
}
