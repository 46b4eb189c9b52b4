//! Slave engine.
//!
//! The slave reacts to rising edges of the clock generated by the master. Per byte it runs the
//! following state machine:
//!
//! 1. Initial: drive MISO to bit 7 of the current reply byte.
//! 2. Await a rising edge on the clock line.
//! 3. Sample MOSI into bit `b` of the incoming byte.
//! 4. If bits remain, drive MISO to bit `b - 1`, hold the stabilization delay and continue with 2.
//! 5. After the eighth edge report the byte pair, advance the reply cursor and restart at 1.
//!
//! The slave has no notion of the master's byte boundaries. Both sides stay in phase only because
//! they count the same number of edges. A missed or spurious edge shifts every following byte and
//! nothing in the protocol detects it.
use bus::BusReader;

use crate::error::{Error, LineError};
use crate::executable::{termination_requested, Endpoint, EndpointSummary, StopReason};
use crate::lines::{EdgeResult, Level, LineId, SignalLines};
use crate::session::{ByteReport, ByteRound, Direction, ReportSink, Session};
use crate::timing::{hold, TimingPolicy};

pub const SLAVE_TASK_NAME: &str = "gpiolink-slave";

/// What the slave has to do after sampling MOSI on a clock edge.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SlaveStep {
    /// Drive MISO to this level for the next bit-round.
    DriveNext(Level),
    /// All eight bits were exchanged.
    Complete(ByteRound),
}

/// Line independent per-byte state machine of the slave.
///
/// This is shared between [SlaveEngine] and the reference slave of
/// [LoopbackLines][crate::sim::loopback::LoopbackLines].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SlaveShifter {
    round: ByteRound,
}

impl SlaveShifter {
    pub fn new(tx: u8) -> Self {
        Self {
            round: ByteRound::new(Direction::SlaveToMaster, tx),
        }
    }

    /// Level to drive before the first edge of the byte.
    pub fn initial_level(&self) -> Level {
        self.round.outgoing_level()
    }

    /// Index of the bit the next edge will sample.
    pub fn bit_index(&self) -> u8 {
        self.round.bit_index()
    }

    pub fn is_started(&self) -> bool {
        self.round.bit_index() != 7
    }

    pub fn on_edge(&mut self, sampled: Level) -> SlaveStep {
        self.round.latch(sampled);
        if self.round.advance() {
            SlaveStep::Complete(self.round)
        } else {
            SlaveStep::DriveNext(self.round.outgoing_level())
        }
    }
}

pub struct SlaveEngine<Lines: SignalLines, Sink: ReportSink = ()> {
    lines: Lines,
    timing: TimingPolicy,
    session: Session,
    sink: Sink,
    byte_limit: Option<usize>,
    completed: usize,
}

impl<Lines: SignalLines> SlaveEngine<Lines> {
    /// Creates a slave which repeats `reply` indefinitely. The reply must not be empty.
    pub fn new(
        lines: Lines,
        timing: TimingPolicy,
        reply: impl Into<Vec<u8>>,
    ) -> Result<Self, Error> {
        let session = Session::circular(reply);
        if session.message().is_empty() {
            return Err(Error::EmptyReply);
        }
        Ok(Self {
            lines,
            timing,
            session,
            sink: (),
            byte_limit: None,
            completed: 0,
        })
    }
}

impl<Lines: SignalLines, Sink: ReportSink> SlaveEngine<Lines, Sink> {
    pub fn with_sink<NewSink: ReportSink>(self, sink: NewSink) -> SlaveEngine<Lines, NewSink> {
        SlaveEngine {
            lines: self.lines,
            timing: self.timing,
            session: self.session,
            sink,
            byte_limit: self.byte_limit,
            completed: self.completed,
        }
    }

    /// Stop after exchanging `limit` bytes instead of running until termination.
    pub fn with_byte_limit(mut self, limit: usize) -> Self {
        self.byte_limit = Some(limit);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
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

    /// Exchange one byte. Returns [None] if termination was requested while waiting for an edge,
    /// in which case a partially received byte is dropped.
    pub fn exchange_byte(
        &mut self,
        tx: u8,
        mut termination: Option<&mut BusReader<()>>,
    ) -> Result<Option<ByteRound>, LineError> {
        let mut shifter = SlaveShifter::new(tx);
        self.lines
            .set_level(LineId::SlaveOut, shifter.initial_level())?;
        loop {
            match self
                .lines
                .await_edge(LineId::Clock, self.timing.edge_timeout())?
            {
                EdgeResult::TimedOut => {
                    if termination_requested(termination.as_deref_mut()) {
                        if shifter.is_started() {
                            log::warn!(
                                "abandoning partial byte, {} bits received",
                                7 - shifter.bit_index()
                            );
                        }
                        return Ok(None);
                    }
                    log::trace!("no clock edge within {:?}", self.timing.edge_timeout());
                }
                EdgeResult::EdgeObserved => {
                    let sampled = self.lines.get_level(LineId::MasterOut)?;
                    match shifter.on_edge(sampled) {
                        SlaveStep::DriveNext(level) => {
                            self.lines.set_level(LineId::SlaveOut, level)?;
                            log::debug!("RX: {}, next TX: {}", sampled, level);
                            hold(self.timing.stabilize_delay());
                        }
                        SlaveStep::Complete(round) => {
                            log::debug!("RX: {}", sampled);
                            return Ok(Some(round));
                        }
                    }
                }
            }
        }
    }

    /// Answer the master until termination is requested or the byte limit is reached.
    pub fn serve(
        &mut self,
        mut termination: Option<&mut BusReader<()>>,
    ) -> Result<EndpointSummary, Error> {
        log::info!("waiting for master");
        loop {
            if self.byte_limit.is_some_and(|limit| self.completed >= limit) {
                return Ok(self.summary(StopReason::ByteLimitReached));
            }
            let tx = self.session.current().ok_or(Error::EmptyReply)?;
            let Some(round) = self.exchange_byte(tx, termination.as_deref_mut())? else {
                return Ok(self.summary(StopReason::TerminationRequested));
            };
            let report: ByteReport = round.report(self.completed);
            log::info!("{report}");
            self.sink.report(report);
            self.completed += 1;
            self.session.advance();
        }
    }

    fn summary(&self, reason: StopReason) -> EndpointSummary {
        EndpointSummary {
            task_name: SLAVE_TASK_NAME,
            byte_rounds: self.completed,
            reason,
        }
    }
}

impl<Lines: SignalLines, Sink: ReportSink> Endpoint for SlaveEngine<Lines, Sink> {
    fn task_name(&self) -> &'static str {
        SLAVE_TASK_NAME
    }

    fn run(&mut self, termination: Option<&mut BusReader<()>>) -> Result<EndpointSummary, Error> {
        self.serve(termination)
    }
}
