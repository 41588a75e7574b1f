//! In-memory browser driver for tests and dry runs.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use strategy_builder::Selector;

use crate::driver::{BrowserDriver, BrowserSession, ElementHandle};
use crate::errors::DriverError;
use crate::types::ExecutionSettings;

/// Minimal PNG signature returned as screenshot bytes.
pub const MOCK_PNG: &[u8] = b"\x89PNG\r\n\x1a\n";

#[derive(Debug, Default)]
struct MockState {
    open_error: Option<DriverError>,
    missing: HashSet<String>,
    hidden: HashSet<String>,
    transient: HashMap<String, VecDeque<DriverError>>,
    delays: HashMap<String, Duration>,
    texts: HashMap<String, String>,
    panic_on: Option<String>,
    screenshot_error: Option<DriverError>,
    title: String,
    url: String,
    sessions_opened: u32,
    sessions_closed: u32,
    actions: Vec<String>,
}

/// Scriptable driver: every selector resolves unless configured otherwise.
/// Selectors are matched by their value.
#[derive(Debug, Clone, Default)]
pub struct MockBrowserDriver {
    state: Arc<Mutex<MockState>>,
}

impl MockBrowserDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(self, title: impl Into<String>) -> Self {
        self.state.lock().title = title.into();
        self
    }

    pub fn with_open_failure(self, error: DriverError) -> Self {
        self.state.lock().open_error = Some(error);
        self
    }

    pub fn with_missing(self, selector_value: impl Into<String>) -> Self {
        self.state.lock().missing.insert(selector_value.into());
        self
    }

    pub fn with_hidden(self, selector_value: impl Into<String>) -> Self {
        self.state.lock().hidden.insert(selector_value.into());
        self
    }

    /// Fail the next lookups of `selector_value` with `error`, once per entry.
    pub fn with_transient_error(self, selector_value: impl Into<String>, error: DriverError) -> Self {
        self.state
            .lock()
            .transient
            .entry(selector_value.into())
            .or_default()
            .push_back(error);
        self
    }

    /// Delay lookups of `selector_value`, or navigation to a URL equal to it.
    pub fn with_delay(self, selector_value: impl Into<String>, delay: Duration) -> Self {
        self.state.lock().delays.insert(selector_value.into(), delay);
        self
    }

    pub fn with_text(self, selector_value: impl Into<String>, text: impl Into<String>) -> Self {
        self.state
            .lock()
            .texts
            .insert(selector_value.into(), text.into());
        self
    }

    /// Panic when `selector_value` is looked up.
    pub fn with_panic_on(self, selector_value: impl Into<String>) -> Self {
        self.state.lock().panic_on = Some(selector_value.into());
        self
    }

    pub fn with_screenshot_failure(self) -> Self {
        self.state.lock().screenshot_error =
            Some(DriverError::Protocol {
                code: "unable to capture screen".into(),
                message: "mock capture failure".into(),
            });
        self
    }

    pub fn sessions_opened(&self) -> u32 {
        self.state.lock().sessions_opened
    }

    pub fn sessions_closed(&self) -> u32 {
        self.state.lock().sessions_closed
    }

    /// Driver calls in order, e.g. `navigate:https://...`, `find:css: a`.
    pub fn actions(&self) -> Vec<String> {
        self.state.lock().actions.clone()
    }
}

#[async_trait]
impl BrowserDriver for MockBrowserDriver {
    fn name(&self) -> &str {
        "mock"
    }

    async fn open_session(
        &self,
        _settings: &ExecutionSettings,
    ) -> Result<Box<dyn BrowserSession>, DriverError> {
        let mut state = self.state.lock();
        if let Some(err) = state.open_error.clone() {
            return Err(err);
        }
        state.sessions_opened += 1;
        let id = format!("mock-session-{}", state.sessions_opened);
        Ok(Box::new(MockSession {
            id,
            state: Arc::clone(&self.state),
            closed: false,
        }))
    }
}

struct MockSession {
    id: String,
    state: Arc<Mutex<MockState>>,
    closed: bool,
}

impl MockSession {
    fn record(&self, action: String) {
        self.state.lock().actions.push(action);
    }

    fn delay_for(&self, key: &str) -> Option<Duration> {
        self.state.lock().delays.get(key).copied()
    }
}

#[async_trait]
impl BrowserSession for MockSession {
    fn id(&self) -> &str {
        &self.id
    }

    async fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        self.record(format!("navigate:{url}"));
        if let Some(delay) = self.delay_for(url) {
            tokio::time::sleep(delay).await;
        }
        self.state.lock().url = url.to_string();
        Ok(())
    }

    async fn find_element(&mut self, selector: &Selector) -> Result<ElementHandle, DriverError> {
        self.record(format!("find:{}", selector.describe()));
        if let Some(delay) = self.delay_for(&selector.value) {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock();
        if state.panic_on.as_deref() == Some(selector.value.as_str()) {
            drop(state);
            panic!("mock driver fault on {}", selector.value);
        }
        if let Some(err) = state
            .transient
            .get_mut(&selector.value)
            .and_then(VecDeque::pop_front)
        {
            return Err(err);
        }
        if state.missing.contains(&selector.value) {
            return Err(DriverError::NoSuchElement(selector.describe()));
        }
        Ok(ElementHandle(selector.value.clone()))
    }

    async fn click(&mut self, element: &ElementHandle) -> Result<(), DriverError> {
        self.record(format!("click:{}", element.0));
        Ok(())
    }

    async fn type_text(&mut self, element: &ElementHandle, text: &str) -> Result<(), DriverError> {
        self.record(format!("type:{}={}", element.0, text));
        Ok(())
    }

    async fn submit(&mut self, element: &ElementHandle) -> Result<(), DriverError> {
        self.record(format!("submit:{}", element.0));
        Ok(())
    }

    async fn scroll(&mut self) -> Result<(), DriverError> {
        self.record("scroll".to_string());
        Ok(())
    }

    async fn is_displayed(&mut self, element: &ElementHandle) -> Result<bool, DriverError> {
        Ok(!self.state.lock().hidden.contains(&element.0))
    }

    async fn element_text(&mut self, element: &ElementHandle) -> Result<String, DriverError> {
        Ok(self
            .state
            .lock()
            .texts
            .get(&element.0)
            .cloned()
            .unwrap_or_default())
    }

    async fn title(&mut self) -> Result<String, DriverError> {
        Ok(self.state.lock().title.clone())
    }

    async fn current_url(&mut self) -> Result<String, DriverError> {
        Ok(self.state.lock().url.clone())
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, DriverError> {
        self.record("screenshot".to_string());
        match self.state.lock().screenshot_error.clone() {
            Some(err) => Err(err),
            None => Ok(MOCK_PNG.to_vec()),
        }
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        if !self.closed {
            self.closed = true;
            self.state.lock().sessions_closed += 1;
        }
        Ok(())
    }
}
