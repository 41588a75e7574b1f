//! W3C WebDriver client (chromedriver, geckodriver, msedgedriver, Selenium).

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use reqwest::{Client, Method};
use serde_json::{json, Value};
use strategy_builder::{Selector, SelectorStrategy};
use testpilot_core_types::BrowserKind;
use tracing::{debug, info, warn};

use crate::driver::{BrowserDriver, BrowserSession, ElementHandle};
use crate::errors::DriverError;
use crate::types::ExecutionSettings;

/// W3C element reference key.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";
const ENTER_KEY: &str = "\u{E007}";
const SCROLL_SCRIPT: &str =
    "window.scrollTo(0, document.body.scrollHeight / 2); window.scrollTo(0, 0); return true;";

pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";

#[derive(Debug, Clone)]
pub struct WebDriverConfig {
    pub endpoint: String,
    /// HTTP timeout for a single driver command.
    pub request_timeout: Duration,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_WEBDRIVER_URL.to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

pub struct WebDriverClient {
    http: Client,
    config: WebDriverConfig,
}

impl WebDriverClient {
    pub fn new(config: WebDriverConfig) -> Result<Self, DriverError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| DriverError::Transport(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { http, config })
    }

    fn endpoint(&self) -> &str {
        self.config.endpoint.trim_end_matches('/')
    }
}

#[async_trait]
impl BrowserDriver for WebDriverClient {
    fn name(&self) -> &str {
        "webdriver"
    }

    async fn open_session(
        &self,
        settings: &ExecutionSettings,
    ) -> Result<Box<dyn BrowserSession>, DriverError> {
        let url = format!("{}/session", self.endpoint());
        let body = json!({ "capabilities": capabilities(settings) });
        let value = send(&self.http, Method::POST, &url, Some(body))
            .await
            .map_err(|err| match err {
                DriverError::Transport(message) => DriverError::SessionNotCreated(message),
                other => other,
            })?;

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| DriverError::SessionNotCreated("response carried no sessionId".into()))?
            .to_string();

        let mut session = WebDriverSession {
            http: self.http.clone(),
            base: format!("{}/session/{}", self.endpoint(), session_id),
            id: session_id,
            closed: false,
        };

        let timeouts = json!({
            "implicit": settings.implicit_wait.as_millis() as u64,
            "pageLoad": settings.page_load_timeout.as_millis() as u64,
        });
        if let Err(err) = session.command(Method::POST, "/timeouts", Some(timeouts)).await {
            let _ = session.close().await;
            return Err(err);
        }

        info!(
            session = %session.id,
            browser = %settings.browser,
            headless = settings.headless,
            "WebDriver session opened"
        );
        Ok(Box::new(session))
    }
}

struct WebDriverSession {
    http: Client,
    base: String,
    id: String,
    closed: bool,
}

impl WebDriverSession {
    async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, DriverError> {
        let url = format!("{}{}", self.base, path);
        send(&self.http, method, &url, body).await
    }

    fn element_path(element: &ElementHandle, suffix: &str) -> String {
        format!("/element/{}{}", element.0, suffix)
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    fn id(&self) -> &str {
        &self.id
    }

    async fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .await
            .map(|_| ())
    }

    async fn find_element(&mut self, selector: &Selector) -> Result<ElementHandle, DriverError> {
        let (using, value) = w3c_locator(selector)?;
        let response = self
            .command(
                Method::POST,
                "/element",
                Some(json!({ "using": using, "value": value })),
            )
            .await?;
        response
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .map(|id| ElementHandle(id.to_string()))
            .ok_or_else(|| DriverError::Protocol {
                code: "invalid response".into(),
                message: "element reference missing".into(),
            })
    }

    async fn click(&mut self, element: &ElementHandle) -> Result<(), DriverError> {
        self.command(
            Method::POST,
            &Self::element_path(element, "/click"),
            Some(json!({})),
        )
        .await
        .map(|_| ())
    }

    async fn type_text(&mut self, element: &ElementHandle, text: &str) -> Result<(), DriverError> {
        self.command(
            Method::POST,
            &Self::element_path(element, "/value"),
            Some(json!({ "text": text })),
        )
        .await
        .map(|_| ())
    }

    async fn submit(&mut self, element: &ElementHandle) -> Result<(), DriverError> {
        self.type_text(element, ENTER_KEY).await
    }

    async fn scroll(&mut self) -> Result<(), DriverError> {
        self.command(
            Method::POST,
            "/execute/sync",
            Some(json!({ "script": SCROLL_SCRIPT, "args": [] })),
        )
        .await
        .map(|_| ())
    }

    async fn is_displayed(&mut self, element: &ElementHandle) -> Result<bool, DriverError> {
        let value = self
            .command(Method::GET, &Self::element_path(element, "/displayed"), None)
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn element_text(&mut self, element: &ElementHandle) -> Result<String, DriverError> {
        let value = self
            .command(Method::GET, &Self::element_path(element, "/text"), None)
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn title(&mut self) -> Result<String, DriverError> {
        let value = self.command(Method::GET, "/title", None).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn current_url(&mut self) -> Result<String, DriverError> {
        let value = self.command(Method::GET, "/url", None).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, DriverError> {
        let value = self.command(Method::GET, "/screenshot", None).await?;
        let encoded = value.as_str().ok_or_else(|| DriverError::Protocol {
            code: "invalid response".into(),
            message: "screenshot payload is not a string".into(),
        })?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|err| DriverError::Protocol {
                code: "invalid response".into(),
                message: format!("screenshot is not valid base64: {err}"),
            })
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let url = self.base.clone();
        send(&self.http, Method::DELETE, &url, None).await?;
        debug!(session = %self.id, "WebDriver session deleted");
        Ok(())
    }
}

/// Send one command and unwrap the W3C `value` envelope.
async fn send(
    http: &Client,
    method: Method,
    url: &str,
    body: Option<Value>,
) -> Result<Value, DriverError> {
    let mut request = http.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }
    let response = request
        .send()
        .await
        .map_err(|err| DriverError::Transport(format!("{url}: {err}")))?;
    let status = response.status();
    let payload: Value = response
        .json()
        .await
        .map_err(|err| DriverError::Transport(format!("{url}: invalid response body: {err}")))?;
    let value = payload.get("value").cloned().unwrap_or(Value::Null);

    if status.is_success() {
        return Ok(value);
    }
    let code = value
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown error");
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default();
    warn!(status = status.as_u16(), code, "WebDriver command failed");
    Err(DriverError::from_w3c(code, message))
}

/// Session capabilities for the requested browser.
pub fn capabilities(settings: &ExecutionSettings) -> Value {
    let (width, height) = settings.window_size;
    let browser = settings.browser;
    let mut args: Vec<String> = Vec::new();
    match browser {
        BrowserKind::Chrome | BrowserKind::Edge => {
            if settings.headless {
                args.push("--headless=new".into());
            }
            args.extend([
                "--no-sandbox".to_string(),
                "--disable-dev-shm-usage".to_string(),
                "--disable-gpu".to_string(),
                format!("--window-size={width},{height}"),
            ]);
        }
        BrowserKind::Firefox => {
            if settings.headless {
                args.push("-headless".into());
            }
            args.extend([format!("--width={width}"), format!("--height={height}")]);
        }
    }
    let options_key = match browser {
        BrowserKind::Chrome => "goog:chromeOptions",
        BrowserKind::Firefox => "moz:firefoxOptions",
        BrowserKind::Edge => "ms:edgeOptions",
    };

    let mut always_match = serde_json::Map::new();
    always_match.insert("browserName".into(), json!(browser.capability_name()));
    always_match.insert(options_key.into(), json!({ "args": args }));
    json!({ "alwaysMatch": Value::Object(always_match) })
}

/// Translate a selector into a W3C `(using, value)` pair. Attribute
/// strategies become CSS attribute selectors.
pub fn w3c_locator(selector: &Selector) -> Result<(&'static str, String), DriverError> {
    let attribute = |name: &str| format!("[{}=\"{}\"]", name, css_escape(&selector.value));
    let locator = match selector.strategy {
        SelectorStrategy::Css => ("css selector", selector.value.clone()),
        SelectorStrategy::XPath => ("xpath", selector.value.clone()),
        SelectorStrategy::Id => ("css selector", attribute("id")),
        SelectorStrategy::Name => ("css selector", attribute("name")),
        SelectorStrategy::TestId => ("css selector", attribute("data-testid")),
        SelectorStrategy::AriaLabel => ("css selector", attribute("aria-label")),
        SelectorStrategy::LinkText => ("link text", selector.value.clone()),
        SelectorStrategy::TagName => ("tag name", selector.value.clone()),
        SelectorStrategy::Url | SelectorStrategy::Title => {
            return Err(DriverError::InvalidSelector(format!(
                "{} is not an element locator",
                selector.strategy.as_str()
            )))
        }
    };
    Ok(locator)
}

fn css_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
