//! Shared pieces of the gpiolink example binaries.
pub mod config;
pub mod logging;
pub mod report;
