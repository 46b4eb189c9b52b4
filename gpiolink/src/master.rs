//! Master engine.
//!
//! The master is the clock source. It never waits for the slave, every phase of a bit-round is
//! paced by the fixed delays of its [TimingPolicy]. A slave which is slower than these delays
//! corrupts the exchanged data without any error being raised.
//!
//! One bit-round for bit index `b` looks like this:
//!
//! ```text
//!           set MOSI = tx[b]       latch rx[b] = MISO
//!                 |                     |
//! CLK  ___________|_____________________|‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾|__________|______
//!                 |<---- quarter ------>|<------ half ------->|<-quarter->|settle
//! ```
//!
//! The slave samples MOSI right after the rising edge and then drives the next reply bit for the
//! following round. The master therefore latches MISO immediately before raising the clock, when
//! the level driven during the previous round has had a full bit period to settle.
use bus::BusReader;

use crate::error::{Error, LineError};
use crate::executable::{termination_requested, Endpoint, EndpointSummary, StopReason};
use crate::lines::{Level, LineId, SignalLines};
use crate::session::{ByteReport, ByteRound, Direction, ReportSink, Session};
use crate::timing::{hold, TimingPolicy};

pub const MASTER_TASK_NAME: &str = "gpiolink-master";

pub struct MasterEngine<Lines: SignalLines, Sink: ReportSink = ()> {
    lines: Lines,
    timing: TimingPolicy,
    session: Session,
    sink: Sink,
    completed: usize,
}

impl<Lines: SignalLines> MasterEngine<Lines> {
    pub fn new(lines: Lines, timing: TimingPolicy, message: impl Into<Vec<u8>>) -> Self {
        Self {
            lines,
            timing,
            session: Session::once(message),
            sink: (),
            completed: 0,
        }
    }
}

impl<Lines: SignalLines, Sink: ReportSink> MasterEngine<Lines, Sink> {
    /// Replace the report sink which receives every completed byte round.
    pub fn with_sink<NewSink: ReportSink>(self, sink: NewSink) -> MasterEngine<Lines, NewSink> {
        MasterEngine {
            lines: self.lines,
            timing: self.timing,
            session: self.session,
            sink,
            completed: self.completed,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn timing(&self) -> &TimingPolicy {
        &self.timing
    }

    pub fn lines(&self) -> &Lines {
        &self.lines
    }

    pub fn sink(&self) -> &Sink {
        &self.sink
    }

    pub fn into_parts(self) -> (Lines, Sink) {
        (self.lines, self.sink)
    }

    /// Exchange one byte with the slave: eight bit-rounds, MSB first.
    pub fn exchange_byte(&mut self, tx: u8) -> Result<u8, LineError> {
        let mut round = ByteRound::new(Direction::MasterToSlave, tx);
        loop {
            self.bit_round(&mut round)?;
            if round.advance() {
                break;
            }
        }
        Ok(round.incoming.value())
    }

    fn bit_round(&mut self, round: &mut ByteRound) -> Result<(), LineError> {
        let tx_level = round.outgoing_level();
        self.lines.set_level(LineId::MasterOut, tx_level)?;
        hold(self.timing.quarter_period());

        let rx_level = self.lines.get_level(LineId::SlaveOut)?;
        round.latch(rx_level);
        self.lines.set_level(LineId::Clock, Level::High)?;
        hold(self.timing.half_period());

        self.lines.set_level(LineId::Clock, Level::Low)?;
        hold(self.timing.quarter_period());
        hold(self.timing.settle_delay());
        log::debug!("TX: {}, RX: {}", tx_level, rx_level);
        Ok(())
    }

    /// Send the complete message. The first failing line operation aborts the session.
    pub fn run_session(
        &mut self,
        mut termination: Option<&mut BusReader<()>>,
    ) -> Result<EndpointSummary, Error> {
        self.lines.set_level(LineId::Clock, Level::Low)?;
        while let Some(tx) = self.session.current() {
            if termination_requested(termination.as_deref_mut()) {
                log::info!(
                    "termination requested after {} of {} bytes",
                    self.completed,
                    self.session.message().len()
                );
                return Ok(self.summary(StopReason::TerminationRequested));
            }
            let rx = self.exchange_byte(tx)?;
            let report = ByteReport::new(self.completed, tx, rx);
            log::info!("{report}");
            self.sink.report(report);
            self.completed += 1;
            self.session.advance();
        }
        Ok(self.summary(StopReason::SessionComplete))
    }

    fn summary(&self, reason: StopReason) -> EndpointSummary {
        EndpointSummary {
            task_name: MASTER_TASK_NAME,
            byte_rounds: self.completed,
            reason,
        }
    }
}

impl<Lines: SignalLines, Sink: ReportSink> Endpoint for MasterEngine<Lines, Sink> {
    fn task_name(&self) -> &'static str {
        MASTER_TASK_NAME
    }

    fn run(&mut self, termination: Option<&mut BusReader<()>>) -> Result<EndpointSummary, Error> {
        self.run_session(termination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lines::EdgeResult;
    use core::time::Duration;
    use std::collections::VecDeque;

    /// Records every write and answers reads of MISO from a fixed queue.
    #[derive(Default)]
    struct RecordingLines {
        writes: Vec<(LineId, Level)>,
        miso: VecDeque<Level>,
        fail_on_clock: bool,
    }

    impl SignalLines for RecordingLines {
        fn set_level(&mut self, line: LineId, level: Level) -> Result<(), LineError> {
            if self.fail_on_clock && line == LineId::Clock && level == Level::High {
                return Err(LineError::Io {
                    line,
                    source: std::io::Error::from(std::io::ErrorKind::BrokenPipe),
                });
            }
            self.writes.push((line, level));
            Ok(())
        }

        fn get_level(&mut self, line: LineId) -> Result<Level, LineError> {
            if line != LineId::SlaveOut {
                return Err(LineError::NotReadable(line));
            }
            Ok(self.miso.pop_front().unwrap_or_default())
        }

        fn await_edge(
            &mut self,
            _line: LineId,
            _timeout: Duration,
        ) -> Result<EdgeResult, LineError> {
            Ok(EdgeResult::TimedOut)
        }
    }

    fn zero_timing() -> TimingPolicy {
        TimingPolicy::with_bit_period(Duration::ZERO)
    }

    #[test]
    fn test_bit_round_write_order() {
        let mut engine =
            MasterEngine::new(RecordingLines::default(), zero_timing(), Vec::<u8>::new());
        engine.exchange_byte(0b1000_0000).unwrap();
        let writes = &engine.lines().writes;
        assert_eq!(writes.len(), 24);
        assert_eq!(writes[0], (LineId::MasterOut, Level::High));
        assert_eq!(writes[1], (LineId::Clock, Level::High));
        assert_eq!(writes[2], (LineId::Clock, Level::Low));
        assert_eq!(writes[3], (LineId::MasterOut, Level::Low));
        let pulses = writes
            .iter()
            .filter(|w| **w == (LineId::Clock, Level::High))
            .count();
        assert_eq!(pulses, 8);
    }

    #[test]
    fn test_sampled_bits_assembled_msb_first() {
        let lines = RecordingLines {
            miso: (0..8).rev().map(|b| Level::of_bit(0xA5, b)).collect(),
            ..Default::default()
        };
        let mut engine = MasterEngine::new(lines, zero_timing(), Vec::<u8>::new());
        assert_eq!(engine.exchange_byte(0x00).unwrap(), 0xA5);
    }

    #[test]
    fn test_empty_message_has_no_rounds() {
        let mut engine =
            MasterEngine::new(RecordingLines::default(), zero_timing(), Vec::<u8>::new())
                .with_sink(Vec::new());
        let summary = engine.run_session(None).unwrap();
        assert_eq!(summary.byte_rounds, 0);
        assert_eq!(summary.reason, StopReason::SessionComplete);
        assert!(engine.sink().is_empty());
        // Only the idle clock level was driven.
        assert_eq!(engine.lines().writes, [(LineId::Clock, Level::Low)]);
    }

    #[test]
    fn test_line_failure_aborts_session() {
        let lines = RecordingLines {
            fail_on_clock: true,
            ..Default::default()
        };
        let mut engine = MasterEngine::new(lines, zero_timing(), *b"HI").with_sink(Vec::new());
        let result = engine.run_session(None);
        assert!(matches!(
            result,
            Err(Error::Line(LineError::Io {
                line: LineId::Clock,
                ..
            }))
        ));
        assert!(engine.sink().is_empty());
        assert_eq!(engine.session().cursor(), 0);
    }

    #[test]
    fn test_session_reports() {
        let mut engine = MasterEngine::new(RecordingLines::default(), zero_timing(), *b"AB")
            .with_sink(Vec::new());
        let summary = engine.run_session(None).unwrap();
        assert_eq!(summary.byte_rounds, 2);
        assert_eq!(summary.task_name, MASTER_TASK_NAME);
        let (_, reports) = engine.into_parts();
        assert_eq!(
            reports,
            [ByteReport::new(0, b'A', 0), ByteReport::new(1, b'B', 0)]
        );
    }
}
