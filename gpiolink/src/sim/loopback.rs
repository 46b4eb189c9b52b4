//! Deterministic loopback line set.
//!
//! [LoopbackLines] is handed to a master engine. A reference slave is wired behind it: every rising
//! edge the master drives on the clock line immediately runs one step of a [SlaveShifter], so MISO
//! always carries exactly the bit a well-behaved slave would drive. There are no threads and no
//! timing dependencies, which makes this line set suitable for exhaustive tests.
use core::time::Duration;

use crate::error::{Error, LineError};
use crate::lines::{EdgeResult, Level, LineId, SignalLines};
use crate::session::{ByteReport, Session};
use crate::slave::{SlaveShifter, SlaveStep};
use crate::timing::hold;

#[derive(Debug, Clone)]
pub struct LoopbackLines {
    levels: [Level; 3],
    reply: Session,
    shifter: SlaveShifter,
    slave_reports: Vec<ByteReport>,
}

impl LoopbackLines {
    /// The reference slave repeats `reply`, which must not be empty.
    pub fn new(reply: impl Into<Vec<u8>>) -> Result<Self, Error> {
        let reply = Session::circular(reply);
        let first = reply.current().ok_or(Error::EmptyReply)?;
        let shifter = SlaveShifter::new(first);
        let mut levels = [Level::Low; 3];
        levels[LineId::SlaveOut.index()] = shifter.initial_level();
        Ok(Self {
            levels,
            reply,
            shifter,
            slave_reports: Vec::new(),
        })
    }

    /// Byte rounds completed by the reference slave.
    pub fn slave_reports(&self) -> &[ByteReport] {
        &self.slave_reports
    }

    fn clock_edge(&mut self) {
        let sampled = self.levels[LineId::MasterOut.index()];
        match self.shifter.on_edge(sampled) {
            SlaveStep::DriveNext(level) => self.levels[LineId::SlaveOut.index()] = level,
            SlaveStep::Complete(round) => {
                self.slave_reports
                    .push(round.report(self.slave_reports.len()));
                self.reply.advance();
                // The reply session is circular and non-empty.
                let next = self.reply.current().unwrap_or_default();
                self.shifter = SlaveShifter::new(next);
                self.levels[LineId::SlaveOut.index()] = self.shifter.initial_level();
            }
        }
    }
}

impl SignalLines for LoopbackLines {
    fn set_level(&mut self, line: LineId, level: Level) -> Result<(), LineError> {
        if line == LineId::SlaveOut {
            return Err(LineError::NotWritable(line));
        }
        let previous = core::mem::replace(&mut self.levels[line.index()], level);
        if line == LineId::Clock && previous == Level::Low && level == Level::High {
            self.clock_edge();
        }
        Ok(())
    }

    fn get_level(&mut self, line: LineId) -> Result<Level, LineError> {
        Ok(self.levels[line.index()])
    }

    /// The master side never observes edges it did not generate itself.
    fn await_edge(&mut self, _line: LineId, timeout: Duration) -> Result<EdgeResult, LineError> {
        hold(timeout);
        Ok(EdgeResult::TimedOut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_reply() {
        assert!(matches!(
            LoopbackLines::new(Vec::<u8>::new()),
            Err(Error::EmptyReply)
        ));
    }

    #[test]
    fn test_initial_miso_is_msb() {
        let mut lines = LoopbackLines::new(vec![0x80]).unwrap();
        assert_eq!(lines.get_level(LineId::SlaveOut).unwrap(), Level::High);
        let mut lines = LoopbackLines::new(vec![0x7F]).unwrap();
        assert_eq!(lines.get_level(LineId::SlaveOut).unwrap(), Level::Low);
    }

    #[test]
    fn test_miso_not_writable() {
        let mut lines = LoopbackLines::new(vec![0]).unwrap();
        assert!(matches!(
            lines.set_level(LineId::SlaveOut, Level::High),
            Err(LineError::NotWritable(LineId::SlaveOut))
        ));
    }

    #[test]
    fn test_reference_slave_samples_mosi_on_rising_edge() {
        let mut lines = LoopbackLines::new(vec![0xFF]).unwrap();
        for bit in (0..8).rev() {
            lines
                .set_level(LineId::MasterOut, Level::of_bit(0x3C, bit))
                .unwrap();
            lines.set_level(LineId::Clock, Level::High).unwrap();
            // Holding the clock high is not another edge.
            lines.set_level(LineId::Clock, Level::High).unwrap();
            lines.set_level(LineId::Clock, Level::Low).unwrap();
        }
        assert_eq!(lines.slave_reports(), [ByteReport::new(0, 0xFF, 0x3C)]);
    }
}
