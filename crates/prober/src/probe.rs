use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use keycheck_core::config::{BrowserConfig, PortalConfig};
use keycheck_core::ports::KeyProber;
use keycheck_core::{mask_key, KeyStatus};

use crate::classify::classify_page;
use crate::error::Result;
use crate::session::{ChromeSession, KeySession};

/// Submit-control fallbacks, tried in order when the form can't be submitted
/// by id: generic submit input, submit button, then the portal's localized
/// button labels.
const SUBMIT_SELECTORS: [&str; 4] = [
    "input[type='submit']",
    "button[type='submit']",
    "input[value*='Vérifier']",
    "input[value*='Verify']",
];

#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub url: String,
    pub key_field: String,
    pub form_id: String,
    pub field_wait: Duration,
    pub settle: Duration,
    pub char_delay: Duration,
}

impl ProbeConfig {
    pub fn new(portal: &PortalConfig, browser: &BrowserConfig) -> Self {
        Self {
            url: portal.url.clone(),
            key_field: portal.key_field.clone(),
            form_id: portal.form_id.clone(),
            field_wait: Duration::from_secs(browser.field_wait_secs),
            settle: Duration::from_secs(browser.settle_secs),
            char_delay: Duration::from_millis(browser.type_char_delay_ms),
        }
    }
}

/// Drives one long-lived session through the per-key protocol. Cookies and
/// the manual login persist across keys; probing is strictly sequential.
pub struct PortalProber<S: KeySession> {
    session: S,
    config: ProbeConfig,
}

impl PortalProber<ChromeSession> {
    /// Launch the browser and land on the verification endpoint so the
    /// operator can log in before the first probe.
    pub fn launch(portal: &PortalConfig, browser: &BrowserConfig) -> Result<Self> {
        let mut session = ChromeSession::launch(browser)?;
        session.navigate(&portal.url)?;
        Ok(Self {
            session,
            config: ProbeConfig::new(portal, browser),
        })
    }
}

impl<S: KeySession> PortalProber<S> {
    pub fn new(session: S, config: ProbeConfig) -> Self {
        Self { session, config }
    }

    async fn try_probe(&mut self, key: &str) -> Result<KeyStatus> {
        let field = self.config.key_field.clone();

        self.session.navigate(&self.config.url)?;

        if !self.session.wait_for_field(&field, self.config.field_wait)? {
            return Ok(KeyStatus::FieldNotFound);
        }

        self.session.clear_field(&field)?;
        tokio::time::sleep(Duration::from_millis(500)).await;

        // Incremental injection: the page's input listeners drop values that
        // arrive as one bulk write.
        for ch in key.chars() {
            self.session.type_text(&field, &ch.to_string())?;
            tokio::time::sleep(self.config.char_delay).await;
        }

        let mut typed = self.session.field_value(&field)?;
        if typed != key {
            warn!(
                key = %mask_key(key),
                observed = %mask_key(&typed),
                "incremental injection mismatch, retrying with bulk write"
            );
            self.session.clear_field(&field)?;
            self.session.type_text(&field, key)?;
            tokio::time::sleep(Duration::from_millis(500)).await;

            typed = self.session.field_value(&field)?;
            if typed != key {
                return Ok(KeyStatus::InputMismatch {
                    expected: key.to_string(),
                    observed: typed,
                });
            }
        }

        if self.session.submit_form(&self.config.form_id).is_err() {
            let clicked = SUBMIT_SELECTORS
                .iter()
                .any(|selector| self.session.click(selector).is_ok());
            if !clicked {
                return Ok(KeyStatus::SubmitControlNotFound);
            }
        }

        // No readiness signal exists on this endpoint; flat settle wait.
        tokio::time::sleep(self.config.settle).await;

        let html = self.session.rendered_html()?;
        Ok(classify_page(&html))
    }
}

#[async_trait]
impl<S: KeySession + Send> KeyProber for PortalProber<S> {
    async fn probe(&mut self, key: &str) -> KeyStatus {
        let status = match self.try_probe(key).await {
            Ok(status) => status,
            // Session hiccups become data; one key never aborts the run.
            Err(e) => KeyStatus::Error(e.to_string()),
        };
        info!(key = %mask_key(key), status = %status, "key probed");
        status
    }

    fn close(&mut self) {
        self.session.close();
    }
}
