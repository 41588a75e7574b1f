//! Strategy Execution Layer
//!
//! Drives one browser session through a compiled strategy and records a
//! result for every step. Drivers plug in behind [`BrowserDriver`]; the
//! W3C WebDriver client talks to chromedriver, geckodriver or msedgedriver
//! and the in-memory mock backs tests and dry runs.

pub mod artifacts;
pub mod driver;
pub mod errors;
pub mod executor;
pub mod mock;
pub mod strategies;
pub mod types;
pub mod webdriver;

pub use artifacts::{ArtifactStore, DEFAULT_ARTIFACT_DIR};
pub use driver::{BrowserDriver, BrowserSession, ElementHandle};
pub use errors::{DriverError, ExecutionError};
pub use executor::AutomationExecutor;
pub use mock::MockBrowserDriver;
pub use strategies::StepRetryPolicy;
pub use types::{
    ExecutionSettings, ExecutionTrace, SessionPhase, StepError, StepOutcome, StepResult,
};
pub use webdriver::{WebDriverClient, WebDriverConfig, DEFAULT_WEBDRIVER_URL};
