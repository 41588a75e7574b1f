//! Browser driver seam.
//!
//! The executor only talks to these traits; the W3C client and the
//! in-memory mock both implement them.

use async_trait::async_trait;
use strategy_builder::Selector;

use crate::errors::DriverError;
use crate::types::ExecutionSettings;

/// Opaque reference to a located element, valid within its session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub String);

#[async_trait]
pub trait BrowserDriver: Send + Sync {
    fn name(&self) -> &str;

    /// Open an exclusive session for one invocation.
    async fn open_session(
        &self,
        settings: &ExecutionSettings,
    ) -> Result<Box<dyn BrowserSession>, DriverError>;
}

/// One live browser session. Never shared across invocations.
#[async_trait]
pub trait BrowserSession: Send {
    fn id(&self) -> &str;

    async fn navigate(&mut self, url: &str) -> Result<(), DriverError>;

    async fn find_element(&mut self, selector: &Selector) -> Result<ElementHandle, DriverError>;

    async fn click(&mut self, element: &ElementHandle) -> Result<(), DriverError>;

    async fn type_text(&mut self, element: &ElementHandle, text: &str) -> Result<(), DriverError>;

    /// Press Enter on the element.
    async fn submit(&mut self, element: &ElementHandle) -> Result<(), DriverError>;

    async fn scroll(&mut self) -> Result<(), DriverError>;

    async fn is_displayed(&mut self, element: &ElementHandle) -> Result<bool, DriverError>;

    async fn element_text(&mut self, element: &ElementHandle) -> Result<String, DriverError>;

    async fn title(&mut self) -> Result<String, DriverError>;

    async fn current_url(&mut self) -> Result<String, DriverError>;

    /// PNG bytes of the current viewport.
    async fn screenshot(&mut self) -> Result<Vec<u8>, DriverError>;

    async fn close(&mut self) -> Result<(), DriverError>;
}
