//! Helper modules intended to be used on systems with a full [std] runtime.
#[cfg(unix)]
pub mod chardev;
