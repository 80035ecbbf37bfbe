//! Test run configuration
//!
//! A `TestRunRequest` is built once per invocation and never changes
//! afterwards. Use `TestRunRequestBuilder` to construct one.

pub mod builder;

pub use builder::TestRunRequestBuilder;

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Block gas limit used for test deployments
pub const GAS_LIMIT: u64 = 6_000_000;
/// Block gas limit while coverage instrumentation inflates every call
pub const COVERAGE_GAS_LIMIT: u64 = 4_503_599_627_370_495;
/// Per-test timeout handed to the script suite runner
pub const TEST_TIMEOUT: Duration = Duration::from_millis(15_000);
/// Default test location relative to the project root
pub const DEFAULT_TEST_PATH: &str = "test";

/// Which group of discovered files is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// `.js` files under the script suite runner
    Javascript,
    /// `_test.sol` files under the contract test engine
    Solidity,
    /// Resolves to `Javascript`
    #[default]
    Auto,
}

impl Mode {
    /// The concrete mode a run executes
    pub fn resolve(self) -> Mode {
        match self {
            Mode::Auto => Mode::Javascript,
            other => other,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Javascript => write!(f, "javascript"),
            Mode::Solidity => write!(f, "solidity"),
            Mode::Auto => write!(f, "auto"),
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "javascript" | "js" => Ok(Mode::Javascript),
            "solidity" | "solc" => Ok(Mode::Solidity),
            "auto" => Ok(Mode::Auto),
            _ => Err(format!("Unknown test mode: {s}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRunRequest {
    pub root_path: PathBuf,
    pub mode: Mode,
    pub coverage: bool,
    pub gas_limit: u64,
    pub no_browser: bool,
    /// Print per-deployment gas lines
    pub gas_details: bool,
    /// Decode and print the transactions of every test
    pub tx_details: bool,
}

impl TestRunRequest {
    pub fn builder() -> TestRunRequestBuilder {
        TestRunRequestBuilder::new()
    }
}

impl Default for TestRunRequest {
    fn default() -> Self {
        Self {
            root_path: PathBuf::from(DEFAULT_TEST_PATH),
            mode: Mode::Auto,
            coverage: false,
            gas_limit: GAS_LIMIT,
            no_browser: false,
            gas_details: false,
            tx_details: false,
        }
    }
}
