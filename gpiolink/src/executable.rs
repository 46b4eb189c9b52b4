//! Running endpoints on their own threads.
//!
//! Each engine is single threaded. The controlling thread can stop an engine by broadcasting on a
//! [bus::Bus] of which the engine holds a [BusReader].
use std::io;
use std::sync::mpsc::TryRecvError;
use std::thread::{self, JoinHandle};

use bus::BusReader;

use crate::error::Error;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The master sent its whole message.
    SessionComplete,
    /// The slave exchanged its configured number of bytes.
    ByteLimitReached,
    TerminationRequested,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EndpointSummary {
    pub task_name: &'static str,
    pub byte_rounds: usize,
    pub reason: StopReason,
}

pub trait Endpoint {
    fn task_name(&self) -> &'static str;

    /// Run the protocol loop until it stops on its own, termination is requested or a line fails.
    fn run(&mut self, termination: Option<&mut BusReader<()>>) -> Result<EndpointSummary, Error>;
}

/// Polls the termination receiver without blocking. A disconnected bus counts as a termination
/// request.
pub fn termination_requested(termination: Option<&mut BusReader<()>>) -> bool {
    match termination {
        Some(terminator) => match terminator.try_recv() {
            Ok(_) | Err(TryRecvError::Disconnected) => true,
            Err(TryRecvError::Empty) => false,
        },
        None => false,
    }
}

/// Runs one endpoint inside a thread named after [Endpoint::task_name].
///
/// # Arguments
///
/// * `endpoint`: Master or slave engine
/// * `termination`: Optional termination handler which can stop the engine with a broadcast
pub fn spawn_endpoint<E: Endpoint + Send + 'static>(
    mut endpoint: E,
    mut termination: Option<BusReader<()>>,
) -> Result<JoinHandle<Result<EndpointSummary, Error>>, io::Error> {
    thread::Builder::new()
        .name(String::from(endpoint.task_name()))
        .spawn(move || endpoint.run(termination.as_mut()))
}
