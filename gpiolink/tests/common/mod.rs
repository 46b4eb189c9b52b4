#![allow(dead_code)]
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use bus::Bus;
use delegate::delegate;
use gpiolink::executable::{spawn_endpoint, EndpointSummary};
use gpiolink::sim::{SimLineBus, SimLines};
use gpiolink::{ByteReport, Level, LineId, MasterEngine, SlaveEngine, TimingPolicy};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn received(reports: &[ByteReport]) -> Vec<u8> {
    reports.iter().map(|r| r.received).collect()
}

pub fn sent(reports: &[ByteReport]) -> Vec<u8> {
    reports.iter().map(|r| r.sent).collect()
}

pub struct SessionOutcome {
    pub master_summary: EndpointSummary,
    pub slave_summary: EndpointSummary,
    pub master: Vec<ByteReport>,
    pub slave: Vec<ByteReport>,
}

/// A master and a slave thread connected through a [SimLineBus].
pub struct SimTestbench {
    pub bus: SimLineBus,
    pub timing: TimingPolicy,
}

impl SimTestbench {
    pub fn new(timing: TimingPolicy) -> Self {
        Self {
            bus: SimLineBus::new(),
            timing,
        }
    }

    delegate! {
        to self.bus {
            pub fn level(&self, line: LineId) -> Option<Level>;
            pub fn rising_edges(&self, line: LineId) -> Option<u64>;
        }
    }

    pub fn run(&self, message: &[u8], reply: &[u8]) -> SessionOutcome {
        self.run_with_slave_lines(message, reply, self.bus.slave())
    }

    /// Runs a whole session. The slave is started first and stopped once the master finished and
    /// the slave drained every pending edge.
    pub fn run_with_slave_lines(
        &self,
        message: &[u8],
        reply: &[u8],
        slave_lines: SimLines,
    ) -> SessionOutcome {
        let mut terminator = Bus::new(1);
        let (slave_report_tx, slave_report_rx) = mpsc::channel();
        let slave = SlaveEngine::new(slave_lines, self.timing, reply.to_vec())
            .expect("creating slave failed")
            .with_sink(slave_report_tx);
        let slave_jh = spawn_endpoint(slave, Some(terminator.add_rx()))
            .expect("spawning slave thread failed");
        thread::sleep(Duration::from_millis(20));

        let mut master = MasterEngine::new(self.bus.master(), self.timing, message.to_vec())
            .with_sink(Vec::new());
        let master_summary = master.run_session(None).expect("master session failed");
        let (_, master_reports) = master.into_parts();

        terminator.broadcast(());
        let slave_summary = slave_jh
            .join()
            .expect("slave thread panicked")
            .expect("slave failed");
        SessionOutcome {
            master_summary,
            slave_summary,
            master: master_reports,
            slave: slave_report_rx.try_iter().collect(),
        }
    }
}
