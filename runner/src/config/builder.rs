//! Test run request builder

use std::path::PathBuf;

use super::{COVERAGE_GAS_LIMIT, GAS_LIMIT, Mode, TestRunRequest};

pub struct TestRunRequestBuilder {
    request: TestRunRequest,
    gas_limit: Option<u64>,
}

impl TestRunRequestBuilder {
    pub fn new() -> Self {
        Self {
            request: TestRunRequest::default(),
            gas_limit: None,
        }
    }

    /// Set the file or directory holding the tests
    pub fn root_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.request.root_path = path.into();
        self
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.request.mode = mode;
        self
    }

    /// Run the contract test engine instead of the script suite runner
    pub fn solidity(self) -> Self {
        self.mode(Mode::Solidity)
    }

    /// Enable coverage; also raises the default gas limit
    pub fn coverage(mut self, enabled: bool) -> Self {
        self.request.coverage = enabled;
        self
    }

    /// Override the gas limit chosen from the coverage flag
    pub fn gas_limit(mut self, limit: u64) -> Self {
        self.gas_limit = Some(limit);
        self
    }

    pub fn no_browser(mut self, no_browser: bool) -> Self {
        self.request.no_browser = no_browser;
        self
    }

    pub fn gas_details(mut self, enabled: bool) -> Self {
        self.request.gas_details = enabled;
        self
    }

    pub fn tx_details(mut self, enabled: bool) -> Self {
        self.request.tx_details = enabled;
        self
    }

    pub fn build(mut self) -> TestRunRequest {
        self.request.gas_limit = self.gas_limit.unwrap_or(if self.request.coverage {
            COVERAGE_GAS_LIMIT
        } else {
            GAS_LIMIT
        });
        self.request
    }
}

impl Default for TestRunRequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}
