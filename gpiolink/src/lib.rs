//! # gpiolink: a bit-banged synchronous serial link over three digital lines
//!
//! Two endpoints, a master and a slave, exchange fixed-size byte streams over a clock line and two
//! data lines carrying bits in opposite directions.
//!
//! ## Overview
//!
//! The core modules of this crate include
//!
//!  - The [lines] module which defines the [SignalLines][lines::SignalLines] abstraction both
//!    engines drive and sample.
//!  - The [master] and [slave] modules which contain the two protocol engines.
//!  - The [timing] module which contains the [TimingPolicy][timing::TimingPolicy] shared by both
//!    endpoints. These delays are the whole correctness contract of the protocol: there is no
//!    acknowledgement, checksum or resynchronization. A slave which reacts too late to a clock
//!    edge silently corrupts the exchanged bytes.
//!  - The [hal] module with line providers for real hardware and the [sim] module with an
//!    in-process line bus and a deterministic loopback.
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod error;
pub mod executable;
pub mod hal;
pub mod lines;
pub mod master;
pub mod session;
pub mod sim;
pub mod slave;
pub mod timing;

pub use error::{Error, LineError, SetupError};
pub use lines::{EdgeResult, EndpointRole, Level, LineId, SignalLines};
pub use master::MasterEngine;
pub use session::{ByteReport, ReportSink, Session};
pub use slave::SlaveEngine;
pub use timing::TimingPolicy;
