//! Simulated line providers.
//!
//! [SimLineBus] connects a master and a slave running on different threads of the same process.
//! It replaces the hardware edge interrupt with a condition variable: every rising edge bumps a
//! per-line counter and wakes all waiters. Each [SimLines] handle consumes edges from its own
//! cursor, so an edge which happens before the slave starts waiting is not lost and no edge is
//! reported twice.
//!
//! [loopback::LoopbackLines] is a single threaded alternative for deterministic tests.
use core::time::Duration;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Instant;

use crate::error::LineError;
use crate::lines::{EdgeResult, EndpointRole, Level, LineId, SignalLines};
use crate::timing::hold;

pub mod loopback;

/// Upper bound for a single condition variable wait. Guards against a lost wake-up.
pub const SIM_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Source of synthetic edge-notification latency.
pub type LatencySource = Box<dyn FnMut() -> Duration + Send>;

#[derive(Debug, Default)]
struct BusState {
    levels: [Level; 3],
    rising_edges: [u64; 3],
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<BusState>,
    edge_cond: Condvar,
}

/// Three simulated lines shared by one master and one slave.
#[derive(Debug, Clone, Default)]
pub struct SimLineBus {
    shared: Arc<Shared>,
}

impl SimLineBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a line handle for one endpoint. Edges which happened before this call are not
    /// reported to the new handle.
    pub fn endpoint(&self, role: EndpointRole) -> SimLines {
        let consumed_edges = self
            .shared
            .state
            .lock()
            .map(|state| state.rising_edges)
            .unwrap_or_default();
        SimLines {
            bus: self.clone(),
            role,
            consumed_edges,
            edge_latency: None,
        }
    }

    pub fn master(&self) -> SimLines {
        self.endpoint(EndpointRole::Master)
    }

    pub fn slave(&self) -> SimLines {
        self.endpoint(EndpointRole::Slave)
    }

    /// Current level of a line, for observers.
    pub fn level(&self, line: LineId) -> Option<Level> {
        self.shared
            .state
            .lock()
            .ok()
            .map(|state| state.levels[line.index()])
    }

    /// Number of rising edges seen on a line since the bus was created.
    pub fn rising_edges(&self, line: LineId) -> Option<u64> {
        self.shared
            .state
            .lock()
            .ok()
            .map(|state| state.rising_edges[line.index()])
    }

    fn lock(&self, line: LineId) -> Result<MutexGuard<'_, BusState>, LineError> {
        self.shared
            .state
            .lock()
            .map_err(|_| LineError::Disconnected(line))
    }
}

/// Handle of one endpoint on a [SimLineBus].
pub struct SimLines {
    bus: SimLineBus,
    role: EndpointRole,
    consumed_edges: [u64; 3],
    edge_latency: Option<LatencySource>,
}

impl SimLines {
    pub fn role(&self) -> EndpointRole {
        self.role
    }

    /// Delay every edge notification by a value drawn from `latency`. This models interrupt
    /// and scheduling latency of a real system.
    pub fn with_edge_latency(
        mut self,
        latency: impl FnMut() -> Duration + Send + 'static,
    ) -> Self {
        self.edge_latency = Some(Box::new(latency));
        self
    }

    /// Number of rising edges on `line` which happened but were not consumed yet.
    pub fn pending_edges(&self, line: LineId) -> Result<u64, LineError> {
        let state = self.bus.lock(line)?;
        Ok(state.rising_edges[line.index()] - self.consumed_edges[line.index()])
    }
}

impl SignalLines for SimLines {
    fn set_level(&mut self, line: LineId, level: Level) -> Result<(), LineError> {
        if !line.is_driven_by(self.role) {
            return Err(LineError::NotWritable(line));
        }
        let mut state = self.bus.lock(line)?;
        let previous = core::mem::replace(&mut state.levels[line.index()], level);
        if previous == Level::Low && level == Level::High {
            state.rising_edges[line.index()] += 1;
            self.bus.shared.edge_cond.notify_all();
        }
        Ok(())
    }

    fn get_level(&mut self, line: LineId) -> Result<Level, LineError> {
        let state = self.bus.lock(line)?;
        Ok(state.levels[line.index()])
    }

    fn await_edge(&mut self, line: LineId, timeout: Duration) -> Result<EdgeResult, LineError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.bus.lock(line)?;
        loop {
            if state.rising_edges[line.index()] > self.consumed_edges[line.index()] {
                self.consumed_edges[line.index()] += 1;
                drop(state);
                if let Some(latency) = self.edge_latency.as_mut() {
                    hold(latency());
                }
                return Ok(EdgeResult::EdgeObserved);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(EdgeResult::TimedOut);
            }
            let wait = (deadline - now).min(SIM_POLL_INTERVAL);
            state = self
                .bus
                .shared
                .edge_cond
                .wait_timeout(state, wait)
                .map_err(|_| LineError::Disconnected(line))?
                .0;
        }
    }
}
