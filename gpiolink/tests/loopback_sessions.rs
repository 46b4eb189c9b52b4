//! Master sessions against the deterministic reference slave.
use core::time::Duration;

use gpiolink::executable::StopReason;
use gpiolink::sim::loopback::LoopbackLines;
use gpiolink::{Error, MasterEngine, TimingPolicy};

mod common;

use common::{init_logger, received, sent};

fn zero_timing() -> TimingPolicy {
    let mut timing = TimingPolicy::with_bit_period(Duration::ZERO);
    timing.set_stabilize_delay(Duration::ZERO);
    timing
}

fn run_loopback(
    message: &[u8],
    reply: &[u8],
    timing: TimingPolicy,
) -> (Vec<gpiolink::ByteReport>, Vec<gpiolink::ByteReport>) {
    let lines = LoopbackLines::new(reply.to_vec()).expect("invalid reply");
    let mut master = MasterEngine::new(lines, timing, message.to_vec()).with_sink(Vec::new());
    let summary = master.run_session(None).expect("session failed");
    assert_eq!(summary.reason, StopReason::SessionComplete);
    assert_eq!(summary.byte_rounds, message.len());
    let (lines, master_reports) = master.into_parts();
    (master_reports, lines.slave_reports().to_vec())
}

#[test]
fn test_hi_ok_exchange() {
    init_logger();
    let timing = TimingPolicy::with_bit_period(Duration::from_millis(1));
    let (master, slave) = run_loopback(b"HI", b"OK", timing);
    assert_eq!(received(&master), [0x4Fu8, 0x4B]);
    assert_eq!(sent(&master), b"HI");
    assert_eq!(received(&slave), [0x48u8, 0x49]);
    assert_eq!(sent(&slave), b"OK");
    assert_eq!(master[0].to_string(), "TX char: H (0x48), RX char: O (0x4F)");
}

#[test]
fn test_every_byte_value_reconstructed() {
    init_logger();
    let message: Vec<u8> = (0..=255).collect();
    let reply: Vec<u8> = message.iter().rev().copied().collect();
    let (master, slave) = run_loopback(&message, &reply, zero_timing());
    assert_eq!(received(&slave), message);
    assert_eq!(received(&master), reply);
}

#[test]
fn test_reply_cycles_for_any_message_length() {
    let reply = b"ALOHA";
    for len in [1usize, 4, 5, 6, 11, 17] {
        let message: Vec<u8> = (0..len).map(|i| b'a' + (i % 26) as u8).collect();
        let (master, slave) = run_loopback(&message, reply, zero_timing());
        let expected: Vec<u8> = reply.iter().cycle().take(len).copied().collect();
        assert_eq!(received(&master), expected, "message length {len}");
        assert_eq!(received(&slave), message, "message length {len}");
    }
}

#[test]
fn test_independent_sessions_are_identical() {
    let first = run_loopback(b"HELLO", b"ALOHA", zero_timing());
    let second = run_loopback(b"HELLO", b"ALOHA", zero_timing());
    assert_eq!(first, second);
}

#[test]
fn test_empty_message_exchanges_nothing() {
    let (master, slave) = run_loopback(b"", b"ALOHA", zero_timing());
    assert!(master.is_empty());
    assert!(slave.is_empty());
}

#[test]
fn test_single_byte_reply_repeated() {
    let (master, _) = run_loopback(b"HELLO", b"!", zero_timing());
    assert_eq!(received(&master), b"!!!!!");
}

#[test]
fn test_empty_reply_rejected() {
    assert!(matches!(
        LoopbackLines::new(Vec::<u8>::new()),
        Err(Error::EmptyReply)
    ));
}

#[test]
fn test_report_indices_are_consecutive() {
    let (master, slave) = run_loopback(b"HELLO", b"ALOHA", zero_timing());
    for (expected, report) in master.iter().enumerate() {
        assert_eq!(report.index, expected);
    }
    for (expected, report) in slave.iter().enumerate() {
        assert_eq!(report.index, expected);
    }
}
