//! Timing policy shared by master and slave.
//!
//! Both endpoints must be configured with consistent values. Nothing is negotiated at run-time.
use core::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default bit period of 10 ms.
pub const DEFAULT_BIT_PERIOD: Duration = Duration::from_millis(10);
/// Default slave-side stabilization delay after driving the next reply bit.
pub const DEFAULT_STABILIZE_DELAY: Duration = Duration::from_micros(500);
/// Default fallback poll granularity while waiting for an edge notification.
pub const DEFAULT_EDGE_POLL_INTERVAL: Duration = Duration::from_micros(5);
/// Default time after which an edge wait returns to let the slave loop check for termination.
pub const DEFAULT_EDGE_TIMEOUT: Duration = Duration::from_millis(100);

/// Sleep for `delay`. A zero delay returns immediately without yielding.
pub fn hold(delay: Duration) {
    if !delay.is_zero() {
        std::thread::sleep(delay);
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimingError {
    #[error("edge poll interval must be non-zero")]
    ZeroPollInterval,
    #[error("edge timeout must be non-zero")]
    ZeroEdgeTimeout,
}

/// Delays shared by both endpoints.
///
/// With the `serde` feature, deserialized policies are validated like [TimingPolicy::new].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "TimingParams", into = "TimingParams"))]
pub struct TimingPolicy {
    bit_period: Duration,
    stabilize_delay: Duration,
    edge_poll_interval: Duration,
    edge_timeout: Duration,
}

/// Unvalidated serialized form of [TimingPolicy].
#[cfg(feature = "serde")]
#[derive(Serialize, Deserialize)]
struct TimingParams {
    bit_period: Duration,
    stabilize_delay: Duration,
    edge_poll_interval: Duration,
    edge_timeout: Duration,
}

#[cfg(feature = "serde")]
impl TryFrom<TimingParams> for TimingPolicy {
    type Error = TimingError;

    fn try_from(params: TimingParams) -> Result<Self, Self::Error> {
        Self::new(
            params.bit_period,
            params.stabilize_delay,
            params.edge_poll_interval,
            params.edge_timeout,
        )
    }
}

#[cfg(feature = "serde")]
impl From<TimingPolicy> for TimingParams {
    fn from(policy: TimingPolicy) -> Self {
        Self {
            bit_period: policy.bit_period,
            stabilize_delay: policy.stabilize_delay,
            edge_poll_interval: policy.edge_poll_interval,
            edge_timeout: policy.edge_timeout,
        }
    }
}

impl Default for TimingPolicy {
    fn default() -> Self {
        Self {
            bit_period: DEFAULT_BIT_PERIOD,
            stabilize_delay: DEFAULT_STABILIZE_DELAY,
            edge_poll_interval: DEFAULT_EDGE_POLL_INTERVAL,
            edge_timeout: DEFAULT_EDGE_TIMEOUT,
        }
    }
}

impl TimingPolicy {
    pub fn new(
        bit_period: Duration,
        stabilize_delay: Duration,
        edge_poll_interval: Duration,
        edge_timeout: Duration,
    ) -> Result<Self, TimingError> {
        if edge_poll_interval.is_zero() {
            return Err(TimingError::ZeroPollInterval);
        }
        if edge_timeout.is_zero() {
            return Err(TimingError::ZeroEdgeTimeout);
        }
        Ok(Self {
            bit_period,
            stabilize_delay,
            edge_poll_interval,
            edge_timeout,
        })
    }

    /// Default policy with a different bit period.
    pub fn with_bit_period(bit_period: Duration) -> Self {
        Self {
            bit_period,
            ..Default::default()
        }
    }

    pub fn set_stabilize_delay(&mut self, stabilize_delay: Duration) {
        self.stabilize_delay = stabilize_delay;
    }

    pub fn bit_period(&self) -> Duration {
        self.bit_period
    }

    pub fn quarter_period(&self) -> Duration {
        self.bit_period / 4
    }

    pub fn half_period(&self) -> Duration {
        self.bit_period / 2
    }

    /// Gap after the falling clock edge before the next bit-round starts.
    pub fn settle_delay(&self) -> Duration {
        self.bit_period / 8
    }

    pub fn stabilize_delay(&self) -> Duration {
        self.stabilize_delay
    }

    pub fn edge_poll_interval(&self) -> Duration {
        self.edge_poll_interval
    }

    pub fn edge_timeout(&self) -> Duration {
        self.edge_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_delays() {
        let policy = TimingPolicy::default();
        assert_eq!(policy.bit_period(), Duration::from_millis(10));
        assert_eq!(policy.quarter_period(), Duration::from_micros(2500));
        assert_eq!(policy.half_period(), Duration::from_millis(5));
        assert_eq!(policy.settle_delay(), Duration::from_micros(1250));
        assert_eq!(policy.stabilize_delay(), Duration::from_micros(500));
    }

    #[test]
    fn test_stabilize_delay_independent_of_period() {
        let policy = TimingPolicy::with_bit_period(Duration::from_millis(1));
        assert_eq!(policy.stabilize_delay(), DEFAULT_STABILIZE_DELAY);
        assert_eq!(policy.quarter_period(), Duration::from_micros(250));
    }

    #[test]
    fn test_invalid_policies() {
        assert_eq!(
            TimingPolicy::new(
                DEFAULT_BIT_PERIOD,
                DEFAULT_STABILIZE_DELAY,
                Duration::ZERO,
                DEFAULT_EDGE_TIMEOUT
            ),
            Err(TimingError::ZeroPollInterval)
        );
        assert_eq!(
            TimingPolicy::new(
                DEFAULT_BIT_PERIOD,
                DEFAULT_STABILIZE_DELAY,
                DEFAULT_EDGE_POLL_INTERVAL,
                Duration::ZERO
            ),
            Err(TimingError::ZeroEdgeTimeout)
        );
    }

    #[test]
    #[cfg(feature = "serde")]
    fn test_deserialization_validates() {
        let policy = TimingPolicy::default();
        let json = serde_json::to_string(&policy).unwrap();
        assert_eq!(serde_json::from_str::<TimingPolicy>(&json).unwrap(), policy);

        let params = |poll_nanos: u32, timeout_nanos: u32| {
            serde_json::json!({
                "bit_period": { "secs": 0, "nanos": 1_000_000 },
                "stabilize_delay": { "secs": 0, "nanos": 0 },
                "edge_poll_interval": { "secs": 0, "nanos": poll_nanos },
                "edge_timeout": { "secs": 0, "nanos": timeout_nanos },
            })
        };
        let err = serde_json::from_value::<TimingPolicy>(params(0, 0)).unwrap_err();
        assert!(err.to_string().contains("edge poll interval must be non-zero"));
        let err = serde_json::from_value::<TimingPolicy>(params(5_000, 0)).unwrap_err();
        assert!(err.to_string().contains("edge timeout must be non-zero"));
        assert!(serde_json::from_value::<TimingPolicy>(params(5_000, 1_000)).is_ok());
    }

    #[test]
    fn test_zero_bit_period_allowed() {
        let policy = TimingPolicy::new(
            Duration::ZERO,
            Duration::ZERO,
            DEFAULT_EDGE_POLL_INTERVAL,
            DEFAULT_EDGE_TIMEOUT,
        )
        .unwrap();
        assert_eq!(policy.quarter_period(), Duration::ZERO);
    }
}
