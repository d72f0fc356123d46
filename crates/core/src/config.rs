use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub portal: PortalConfig,
    #[serde(default)]
    pub columns: ColumnsConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
}

/// The verification endpoint and the form conventions of its page.
#[derive(Debug, Deserialize, Clone)]
pub struct PortalConfig {
    #[serde(default = "default_portal_url")]
    pub url: String,
    /// `name` attribute of the key input field
    #[serde(default = "default_key_field")]
    pub key_field: String,
    /// `id` of the form enclosing the key input
    #[serde(default = "default_form_id")]
    pub form_id: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ColumnsConfig {
    #[serde(default = "default_key_column_1")]
    pub key_column_1: String,
    #[serde(default = "default_key_column_2")]
    pub key_column_2: String,
    /// Also queue the second key column. Useful when two keys go out per row.
    #[serde(default = "default_true")]
    pub check_second_column: bool,
    #[serde(default = "default_filter_column")]
    pub filter_column: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FilterConfig {
    /// Tokens accepted as "yes, check this row". Treated as configuration
    /// rather than hidden logic so new locales need a deliberate change.
    #[serde(default = "default_truthy_tokens")]
    pub truthy_tokens: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PacingConfig {
    #[serde(default = "default_min_delay")]
    pub min_delay_secs: f64,
    #[serde(default = "default_max_delay")]
    pub max_delay_secs: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BrowserConfig {
    /// Headless makes the manual login gate impossible, so the default is a
    /// visible window.
    #[serde(default)]
    pub headless: bool,
    #[serde(default = "default_field_wait")]
    pub field_wait_secs: u64,
    /// Flat wait for the result to render after submit. The portal exposes
    /// no readiness signal to poll for.
    #[serde(default = "default_settle")]
    pub settle_secs: u64,
    #[serde(default = "default_char_delay")]
    pub type_char_delay_ms: u64,
}

fn default_portal_url() -> String {
    "https://partner.steamgames.com/querycdkey/".to_string()
}
fn default_key_field() -> String {
    "cdkey".to_string()
}
fn default_form_id() -> String {
    "queryForm".to_string()
}
fn default_key_column_1() -> String {
    "key_1".to_string()
}
fn default_key_column_2() -> String {
    "key_2".to_string()
}
fn default_filter_column() -> String {
    "to check".to_string()
}
fn default_true() -> bool {
    true
}
fn default_truthy_tokens() -> Vec<String> {
    ["true", "1", "yes", "oui"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_min_delay() -> f64 {
    1.0
}
fn default_max_delay() -> f64 {
    10.0
}
fn default_field_wait() -> u64 {
    10
}
fn default_settle() -> u64 {
    3
}
fn default_char_delay() -> u64 {
    100
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            url: default_portal_url(),
            key_field: default_key_field(),
            form_id: default_form_id(),
        }
    }
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        Self {
            key_column_1: default_key_column_1(),
            key_column_2: default_key_column_2(),
            check_second_column: true,
            filter_column: default_filter_column(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            truthy_tokens: default_truthy_tokens(),
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_delay_secs: default_min_delay(),
            max_delay_secs: default_max_delay(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            field_wait_secs: default_field_wait(),
            settle_secs: default_settle(),
            type_char_delay_ms: default_char_delay(),
        }
    }
}
