//! W3C WebDriver page driver
//!
//! Talks to a running chromedriver (or any W3C-compliant server) over its
//! JSON wire protocol using a blocking client. Element lookups rely on the
//! session's implicit wait, so every call is bounded by that timeout.

use crate::driver::{DriverResult, PageDriver};
use crate::error::{DriverError, Result};
use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::thread;
use std::time::{Duration, Instant};

/// Key the W3C protocol uses for element references
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Picks an option by value and fires `change` so dependent controls reload
const SELECT_OPTION_JS: &str = "const select = arguments[0];
const option = Array.from(select.options).find(o => o.value === arguments[1]);
if (!option) { return false; }
select.value = option.value;
select.dispatchEvent(new Event('change', { bubbles: true }));
return true;";

const SELECTED_LABEL_JS: &str = "const select = arguments[0];
const option = select.options[select.selectedIndex];
return option ? option.text : '';";

/// How a browser session is started
#[derive(Debug, Clone)]
pub struct WebDriverOptions {
    pub headless: bool,
    /// Upper bound on waiting for elements and options to appear
    pub implicit_wait: Duration,
    pub page_load_timeout: Duration,
}

impl Default for WebDriverOptions {
    fn default() -> Self {
        Self {
            headless: false,
            implicit_wait: Duration::from_secs(5),
            page_load_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Deserialize)]
struct WireResponse {
    #[serde(default)]
    value: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewSession {
    session_id: String,
}

/// A live browser session; closed when dropped
pub struct WebDriverSession {
    client: Client,
    base_url: String,
    session_id: String,
    implicit_wait: Duration,
}

impl WebDriverSession {
    /// Open a new browser session on the WebDriver server at `server_url`
    pub fn start(server_url: &str, options: &WebDriverOptions) -> Result<Self> {
        let client = Client::builder()
            .timeout(options.page_load_timeout + Duration::from_secs(10))
            .build()?;
        let base_url = server_url.trim_end_matches('/').to_string();

        let mut args = vec!["--window-size=1280,1024"];
        if options.headless {
            args.push("--headless=new");
        }
        let body = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args }
                }
            }
        });

        log::info!("Starting browser session via {}", base_url);
        let value = send(client.post(format!("{}/session", base_url)).json(&body))?;
        let session: NewSession = serde_json::from_value(value)?;

        let driver = Self {
            client,
            base_url,
            session_id: session.session_id,
            implicit_wait: options.implicit_wait,
        };
        driver.post(
            "timeouts",
            json!({
                "implicit": options.implicit_wait.as_millis() as u64,
                "pageLoad": options.page_load_timeout.as_millis() as u64,
            }),
        )?;

        log::info!("Browser session {} started", driver.session_id);
        Ok(driver)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn url(&self, path: &str) -> String {
        format!("{}/session/{}/{}", self.base_url, self.session_id, path)
    }

    fn post(&self, path: &str, body: Value) -> DriverResult<Value> {
        send(self.client.post(self.url(path)).json(&body))
    }

    fn get(&self, path: &str) -> DriverResult<Value> {
        send(self.client.get(self.url(path)))
    }

    fn find(&self, selector: &str) -> DriverResult<String> {
        let value = self.post(
            "element",
            json!({ "using": "css selector", "value": selector }),
        )?;
        element_id(&value)
            .ok_or_else(|| DriverError::new(format!("No element reference for {}", selector)))
    }

    fn execute(&self, script: &str, args: Vec<Value>) -> DriverResult<Value> {
        self.post("execute/sync", json!({ "script": script, "args": args }))
    }
}

impl Drop for WebDriverSession {
    fn drop(&mut self) {
        let url = format!("{}/session/{}", self.base_url, self.session_id);
        if let Err(e) = send(self.client.delete(url)) {
            log::debug!("Closing browser session failed: {}", e);
        }
    }
}

fn element_id(value: &Value) -> Option<String> {
    value.get(ELEMENT_KEY)?.as_str().map(str::to_string)
}

fn element_ref(id: &str) -> Value {
    let mut reference = Map::new();
    reference.insert(ELEMENT_KEY.to_string(), Value::String(id.to_string()));
    Value::Object(reference)
}

/// Send a command and unwrap the protocol's `{"value": ...}` envelope
fn send(request: RequestBuilder) -> DriverResult<Value> {
    let response = request
        .send()
        .map_err(|e| DriverError::new(format!("WebDriver request failed: {}", e)))?;
    let status = response.status();
    let body: WireResponse = response
        .json()
        .map_err(|e| DriverError::new(format!("Malformed WebDriver response: {}", e)))?;

    if !status.is_success() {
        let error = body
            .value
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        let message = body
            .value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default();
        return Err(DriverError::new(format!("{} ({}): {}", error, status, message)));
    }
    Ok(body.value)
}

fn as_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl PageDriver for WebDriverSession {
    fn load(&mut self, url: &str) -> DriverResult<()> {
        self.post("url", json!({ "url": url }))?;
        Ok(())
    }

    fn select(&mut self, control: &str, value: &str) -> DriverResult<()> {
        let deadline = Instant::now() + self.implicit_wait;
        loop {
            // Options are repopulated asynchronously, so look the control up each time
            let select = self.find(control)?;
            let picked = self.execute(SELECT_OPTION_JS, vec![element_ref(&select), json!(value)])?;
            if picked.as_bool() == Some(true) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DriverError::new(format!(
                    "Option {} not available in {}",
                    value, control
                )));
            }
            thread::sleep(Duration::from_millis(250));
        }
    }

    fn read_text(&mut self, selector: &str) -> DriverResult<String> {
        let id = self.find(selector)?;
        self.get(&format!("element/{}/text", id)).map(as_text)
    }

    fn is_visible(&mut self, selector: &str) -> bool {
        let Ok(id) = self.find(selector) else {
            return false;
        };
        self.get(&format!("element/{}/displayed", id))
            .ok()
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    fn count(&mut self, selector: &str) -> DriverResult<usize> {
        let value = self.post(
            "elements",
            json!({ "using": "css selector", "value": selector }),
        )?;
        Ok(value.as_array().map_or(0, Vec::len))
    }

    fn selected_value(&mut self, control: &str) -> DriverResult<String> {
        let id = self.find(control)?;
        self.get(&format!("element/{}/property/value", id))
            .map(as_text)
    }

    fn selected_label(&mut self, control: &str) -> DriverResult<String> {
        let id = self.find(control)?;
        self.execute(SELECTED_LABEL_JS, vec![element_ref(&id)])
            .map(as_text)
    }
}

#[cfg(test)]
#[path = "webdriver_tests.rs"]
mod tests;
