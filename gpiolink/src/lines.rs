//! Signal line abstraction shared by both engines.
//!
//! The engines never own line storage. They only hold something implementing [SignalLines], which
//! can be real device files (see [crate::hal::std::chardev]) or one of the simulated providers
//! inside [crate::sim].
use core::fmt;
use core::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::LineError;

/// The two communicating parties.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EndpointRole {
    Master,
    Slave,
}

/// Named line of the link. Every line has exactly one endpoint driving it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LineId {
    /// Clock, driven by the master. Rising edges are the only synchronization signal.
    Clock = 0,
    /// Master out, slave in.
    MasterOut = 1,
    /// Slave out, master in.
    SlaveOut = 2,
}

impl LineId {
    pub const ALL: [LineId; 3] = [LineId::Clock, LineId::MasterOut, LineId::SlaveOut];

    /// Endpoint which drives this line.
    pub const fn driver(&self) -> EndpointRole {
        match self {
            LineId::Clock | LineId::MasterOut => EndpointRole::Master,
            LineId::SlaveOut => EndpointRole::Slave,
        }
    }

    pub const fn is_driven_by(&self, role: EndpointRole) -> bool {
        matches!(
            (self.driver(), role),
            (EndpointRole::Master, EndpointRole::Master)
                | (EndpointRole::Slave, EndpointRole::Slave)
        )
    }

    pub const fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineId::Clock => write!(f, "CLK"),
            LineId::MasterOut => write!(f, "MOSI"),
            LineId::SlaveOut => write!(f, "MISO"),
        }
    }
}

/// Logical level of a line.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Level {
    #[default]
    Low = 0,
    High = 1,
}

impl Level {
    /// Level of bit `index` of `byte`.
    pub const fn of_bit(byte: u8, index: u8) -> Self {
        if (byte >> index) & 1 == 1 {
            Level::High
        } else {
            Level::Low
        }
    }

    pub const fn as_bit(&self) -> u8 {
        *self as u8
    }

    /// ASCII representation used by the GPIO character devices.
    pub const fn as_ascii(&self) -> u8 {
        match self {
            Level::Low => b'0',
            Level::High => b'1',
        }
    }

    pub const fn from_ascii(raw: u8) -> Option<Self> {
        match raw {
            b'0' => Some(Level::Low),
            b'1' => Some(Level::High),
            _ => None,
        }
    }
}

impl From<bool> for Level {
    fn from(value: bool) -> Self {
        if value {
            Level::High
        } else {
            Level::Low
        }
    }
}

impl From<Level> for bool {
    fn from(value: Level) -> Self {
        value == Level::High
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_bit())
    }
}

/// Outcome of [SignalLines::await_edge].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EdgeResult {
    EdgeObserved,
    TimedOut,
}

/// The three operations the protocol requires from a line provider.
pub trait SignalLines {
    /// Drive a line. Fails if this endpoint does not own the direction of the line.
    fn set_level(&mut self, line: LineId, level: Level) -> Result<(), LineError>;

    /// Sample the current level of a line.
    fn get_level(&mut self, line: LineId) -> Result<Level, LineError>;

    /// Block until a rising transition was observed on `line` or `timeout` elapsed.
    ///
    /// Each observed edge is reported exactly once. Implementations must suspend the caller
    /// instead of spinning on the level.
    fn await_edge(&mut self, line: LineId, timeout: Duration) -> Result<EdgeResult, LineError>;
}

impl<T: SignalLines + ?Sized> SignalLines for &mut T {
    fn set_level(&mut self, line: LineId, level: Level) -> Result<(), LineError> {
        (**self).set_level(line, level)
    }

    fn get_level(&mut self, line: LineId) -> Result<Level, LineError> {
        (**self).get_level(line)
    }

    fn await_edge(&mut self, line: LineId, timeout: Duration) -> Result<EdgeResult, LineError> {
        (**self).await_edge(line, timeout)
    }
}

impl<T: SignalLines + ?Sized> SignalLines for Box<T> {
    fn set_level(&mut self, line: LineId, level: Level) -> Result<(), LineError> {
        (**self).set_level(line, level)
    }

    fn get_level(&mut self, line: LineId) -> Result<Level, LineError> {
        (**self).get_level(line)
    }

    fn await_edge(&mut self, line: LineId, timeout: Duration) -> Result<EdgeResult, LineError> {
        (**self).await_edge(line, timeout)
    }
}
