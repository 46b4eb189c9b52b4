//! Line providers for real hardware.
pub mod std;
