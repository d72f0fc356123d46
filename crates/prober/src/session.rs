use std::ffi::OsString;
use std::sync::Arc;
use std::time::Duration;

use headless_chrome::{Browser, Tab};
use tracing::{info, warn};

use keycheck_core::config::BrowserConfig;

use crate::error::{Result, SessionError};

/// What the probe protocol needs from a browser session. One implementation
/// drives Chrome; tests script a fake.
pub trait KeySession {
    fn navigate(&mut self, url: &str) -> Result<()>;

    /// Wait up to `timeout` for the input field with the given `name`
    /// attribute. `Ok(false)` when it never appeared.
    fn wait_for_field(&mut self, name: &str, timeout: Duration) -> Result<bool>;

    fn clear_field(&mut self, name: &str) -> Result<()>;

    /// Type into the field with real key events. Called once per character
    /// during incremental injection, once with the whole key on the bulk
    /// retry.
    fn type_text(&mut self, name: &str, text: &str) -> Result<()>;

    /// Current value of the field, for post-injection verification.
    fn field_value(&mut self, name: &str) -> Result<String>;

    /// Submit the form with the given id directly.
    fn submit_form(&mut self, form_id: &str) -> Result<()>;

    /// Click the first element matching the CSS selector.
    fn click(&mut self, selector: &str) -> Result<()>;

    /// Full rendered HTML of the current page.
    fn rendered_html(&mut self) -> Result<String>;

    fn close(&mut self);
}

/// Chrome session over the DevTools protocol. Launched visible by default:
/// the portal requires an interactive login before any probing can start.
pub struct ChromeSession {
    // Owns the browser process; dropping it ends the session.
    _browser: Browser,
    tab: Arc<Tab>,
}

impl ChromeSession {
    pub fn launch(config: &BrowserConfig) -> Result<Self> {
        let mut extra_args: Vec<OsString> = Vec::new();
        extra_args.push(OsString::from("--no-sandbox"));
        extra_args.push(OsString::from("--disable-dev-shm-usage"));
        // Drops the most obvious automation tell in the renderer
        extra_args.push(OsString::from("--disable-blink-features=AutomationControlled"));

        let mut builder = headless_chrome::LaunchOptionsBuilder::default();
        builder
            .headless(config.headless)
            .window_size(Some((1920, 1080)))
            // Manual login plus paced probing far exceeds the default idle
            // timeout, which would kill the browser mid-run.
            .idle_browser_timeout(Duration::from_secs(24 * 60 * 60))
            .args(extra_args.iter().map(|a| a.as_ref()).collect());

        // Use CHROME_PATH env var if set (for Docker/custom installs)
        if let Ok(chrome_path) = std::env::var("CHROME_PATH") {
            builder.path(Some(std::path::PathBuf::from(chrome_path)));
        }

        let launch_options = builder
            .build()
            .map_err(|e| SessionError::Launch(e.to_string()))?;
        let browser = Browser::new(launch_options).map_err(|e| SessionError::Launch(e.to_string()))?;
        let tab = browser
            .new_tab()
            .map_err(|e| SessionError::Launch(e.to_string()))?;

        // Suppress the navigator automation flag once per session
        tab.evaluate(
            "Object.defineProperty(navigator, 'webdriver', {get: () => undefined})",
            false,
        )
        .map_err(|e| SessionError::Evaluate(e.to_string()))?;

        info!(headless = config.headless, "chrome session started");
        Ok(Self {
            _browser: browser,
            tab,
        })
    }

    fn field_selector(name: &str) -> String {
        format!("input[name='{}']", name)
    }
}

impl KeySession for ChromeSession {
    fn navigate(&mut self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .map_err(|e| SessionError::Navigation(e.to_string()))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| SessionError::Navigation(e.to_string()))?;
        Ok(())
    }

    fn wait_for_field(&mut self, name: &str, timeout: Duration) -> Result<bool> {
        let selector = Self::field_selector(name);
        match self
            .tab
            .wait_for_element_with_custom_timeout(&selector, timeout)
        {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!(selector, error = %e, "field did not appear");
                Ok(false)
            }
        }
    }

    fn clear_field(&mut self, name: &str) -> Result<()> {
        self.tab
            .evaluate(
                &format!(
                    r#"
                    const elem = document.querySelector("{}");
                    if (elem) {{
                        elem.value = '';
                        elem.dispatchEvent(new Event('input', {{ bubbles: true }}));
                        elem.dispatchEvent(new Event('change', {{ bubbles: true }}));
                    }} else {{
                        throw new Error('Element not found');
                    }}
                    "#,
                    Self::field_selector(name)
                ),
                false,
            )
            .map_err(|e| SessionError::Evaluate(e.to_string()))?;
        Ok(())
    }

    fn type_text(&mut self, name: &str, text: &str) -> Result<()> {
        let selector = Self::field_selector(name);
        let elem = self
            .tab
            .find_element(&selector)
            .map_err(|_| SessionError::ElementNotFound(selector))?;
        elem.type_into(text)
            .map_err(|e| SessionError::Browser(e.to_string()))?;
        Ok(())
    }

    fn field_value(&mut self, name: &str) -> Result<String> {
        let result = self
            .tab
            .evaluate(
                &format!(
                    r#"
                    const elem = document.querySelector("{}");
                    if (!elem) {{ throw new Error('Element not found'); }}
                    elem.value
                    "#,
                    Self::field_selector(name)
                ),
                false,
            )
            .map_err(|e| SessionError::Evaluate(e.to_string()))?;

        Ok(result
            .value
            .and_then(|v| v.as_str().map(|s| s.to_string()))
            .unwrap_or_default())
    }

    fn submit_form(&mut self, form_id: &str) -> Result<()> {
        self.tab
            .evaluate(
                &format!(
                    r#"
                    const form = document.getElementById("{}");
                    if (form) {{
                        form.submit();
                    }} else {{
                        throw new Error('Form not found');
                    }}
                    "#,
                    form_id
                ),
                false,
            )
            .map_err(|e| SessionError::Evaluate(e.to_string()))?;
        Ok(())
    }

    fn click(&mut self, selector: &str) -> Result<()> {
        self.tab
            .evaluate(
                &format!(
                    r#"
                    const elem = document.querySelector("{}");
                    if (elem) {{
                        elem.click();
                    }} else {{
                        throw new Error('Element not found');
                    }}
                    "#,
                    selector
                ),
                false,
            )
            .map_err(|e| SessionError::Evaluate(e.to_string()))?;
        Ok(())
    }

    fn rendered_html(&mut self) -> Result<String> {
        self.tab
            .get_content()
            .map_err(|e| SessionError::Browser(e.to_string()))
    }

    fn close(&mut self) {
        info!("closing chrome session");
        // Browser process is killed when `_browser` drops with the session.
    }
}
