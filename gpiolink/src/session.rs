//! Sessions, per-byte transfers and byte reports.
use core::fmt;
use std::sync::mpsc;

use derive_new::new;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::lines::Level;

/// How the cursor of a [Session] behaves at the end of its message.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CursorMode {
    /// The session ends after the last byte. Used by the master.
    Once,
    /// The session restarts at the first byte. Used by the slave, which repeats its reply.
    Circular,
}

/// The ordered bytes an endpoint intends to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    message: Vec<u8>,
    cursor: usize,
    mode: CursorMode,
}

impl Session {
    pub fn once(message: impl Into<Vec<u8>>) -> Self {
        Self {
            message: message.into(),
            cursor: 0,
            mode: CursorMode::Once,
        }
    }

    pub fn circular(message: impl Into<Vec<u8>>) -> Self {
        Self {
            message: message.into(),
            cursor: 0,
            mode: CursorMode::Circular,
        }
    }

    /// Byte of the current round, if any. Does not advance the cursor.
    pub fn current(&self) -> Option<u8> {
        self.message.get(self.cursor).copied()
    }

    /// Advance the cursor after a completed byte round.
    pub fn advance(&mut self) {
        if self.message.is_empty() {
            return;
        }
        match self.mode {
            CursorMode::Once => self.cursor = (self.cursor + 1).min(self.message.len()),
            CursorMode::Circular => self.cursor = (self.cursor + 1) % self.message.len(),
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn message(&self) -> &[u8] {
        &self.message
    }

    pub fn mode(&self) -> CursorMode {
        self.mode
    }

    pub fn is_finished(&self) -> bool {
        self.current().is_none()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Direction {
    MasterToSlave,
    SlaveToMaster,
}

/// One byte moving in one direction, MSB first.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Transfer {
    direction: Direction,
    value: u8,
    bit_index: u8,
    complete: bool,
}

impl Transfer {
    pub fn new(direction: Direction, value: u8) -> Self {
        Self {
            direction,
            value,
            bit_index: 7,
            complete: false,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    pub fn bit_index(&self) -> u8 {
        self.bit_index
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Level of the bit at the current index.
    pub fn current_level(&self) -> Level {
        Level::of_bit(self.value, self.bit_index)
    }

    /// Store `level` into the bit at the current index.
    pub fn store(&mut self, level: Level) {
        let mask = 1 << self.bit_index;
        match level {
            Level::High => self.value |= mask,
            Level::Low => self.value &= !mask,
        }
    }

    /// Move to the next lower bit. Returns true once the last bit was handled.
    pub fn advance(&mut self) -> bool {
        if self.bit_index == 0 {
            self.complete = true;
        } else {
            self.bit_index -= 1;
        }
        self.complete
    }
}

/// The pair of transfers one endpoint runs during one byte round.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ByteRound {
    pub outgoing: Transfer,
    pub incoming: Transfer,
}

impl ByteRound {
    pub fn new(outgoing: Direction, tx: u8) -> Self {
        let incoming = match outgoing {
            Direction::MasterToSlave => Direction::SlaveToMaster,
            Direction::SlaveToMaster => Direction::MasterToSlave,
        };
        Self {
            outgoing: Transfer::new(outgoing, tx),
            incoming: Transfer::new(incoming, 0),
        }
    }

    pub fn bit_index(&self) -> u8 {
        self.outgoing.bit_index()
    }

    pub fn outgoing_level(&self) -> Level {
        self.outgoing.current_level()
    }

    pub fn latch(&mut self, level: Level) {
        self.incoming.store(level);
    }

    /// Finish the current bit-round. Returns true once all eight bits were exchanged.
    pub fn advance(&mut self) -> bool {
        self.incoming.advance();
        self.outgoing.advance()
    }

    pub fn is_complete(&self) -> bool {
        self.outgoing.is_complete()
    }

    pub fn report(&self, index: usize) -> ByteReport {
        ByteReport::new(index, self.outgoing.value(), self.incoming.value())
    }
}

/// Transmitted and received byte of one completed byte round.
#[derive(new, Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ByteReport {
    /// Number of byte rounds completed before this one.
    pub index: usize,
    pub sent: u8,
    pub received: u8,
}

struct Printable(u8);

impl fmt::Display for Printable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_ascii_graphic() || self.0 == b' ' {
            write!(f, "{}", self.0 as char)
        } else {
            write!(f, ".")
        }
    }
}

impl fmt::Display for ByteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TX char: {} (0x{:02X}), RX char: {} (0x{:02X})",
            Printable(self.sent),
            self.sent,
            Printable(self.received),
            self.received
        )
    }
}

/// Receiver of completed byte rounds.
pub trait ReportSink {
    fn report(&mut self, report: ByteReport);
}

impl ReportSink for () {
    fn report(&mut self, _report: ByteReport) {}
}

impl ReportSink for Vec<ByteReport> {
    fn report(&mut self, report: ByteReport) {
        self.push(report);
    }
}

impl ReportSink for mpsc::Sender<ByteReport> {
    fn report(&mut self, report: ByteReport) {
        if self.send(report).is_err() {
            log::warn!("byte report receiver has disconnected, dropping {report}");
        }
    }
}

impl<T: ReportSink + ?Sized> ReportSink for &mut T {
    fn report(&mut self, report: ByteReport) {
        (**self).report(report)
    }
}

impl<T: ReportSink + ?Sized> ReportSink for Box<T> {
    fn report(&mut self, report: ByteReport) {
        (**self).report(report)
    }
}
