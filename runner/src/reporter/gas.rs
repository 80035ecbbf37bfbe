//! Gas and duration speed bands

use super::Tone;

/// Tests slower than this are reported as slow
pub const SLOW_TEST_MS: u64 = 75;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speed {
    Fast,
    Medium,
    Slow,
}

impl Speed {
    /// `<= L/10` fast, `<= 3L/4` medium, slow above; compared exactly
    pub fn for_gas(gas_used: u64, gas_limit: u64) -> Self {
        let gas = gas_used as u128;
        let limit = gas_limit as u128;
        if gas * 10 <= limit {
            Speed::Fast
        } else if gas * 4 <= limit * 3 {
            Speed::Medium
        } else {
            Speed::Slow
        }
    }

    pub fn for_duration(duration_ms: u64, slow_ms: u64) -> Self {
        if duration_ms > slow_ms {
            Speed::Slow
        } else if duration_ms > slow_ms / 2 {
            Speed::Medium
        } else {
            Speed::Fast
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Speed::Fast => "fast",
            Speed::Medium => "medium",
            Speed::Slow => "slow",
        }
    }

    pub fn tone(&self) -> Tone {
        match self {
            Speed::Fast => Tone::Fast,
            Speed::Medium => Tone::Medium,
            Speed::Slow => Tone::Slow,
        }
    }
}
