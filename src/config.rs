//! Site configuration module.
//!
//! Handles loading, validating, and merging the `recipes.toml` config file.
//! Stock defaults are serialized to a TOML table and the user file is merged
//! on top, so a config file only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [site]
//! title = "Recipes"
//!
//! [contentful]
//! space_id = ""             # Usually supplied via CONTENTFUL_SPACE_ID
//! access_token = ""         # Usually supplied via CONTENTFUL_ACCESS_KEY
//! environment = "master"
//! host = "cdn.contentful.com"
//! content_type = "recipe"
//! page_size = 100           # Entries per listing request (1-1000)
//! timeout_secs = 30
//!
//! [revalidate]
//! interval_secs = 1         # Minimum page age before it is regenerated
//!
//! [colors.light]
//! background = "#ffffff"
//! text = "#333333"
//! accent = "#e0e0e0"
//! banner = "#ffffff"
//!
//! [colors.dark]
//! background = "#121212"
//! text = "#eeeeee"
//! accent = "#2a2a2a"
//! banner = "#1e1e1e"
//!
//! [processing]
//! max_processes = 4         # Max parallel page generations (omit for auto)
//! ```
//!
//! Unknown keys are rejected to catch typos early.
//!
//! The configuration is an explicit value passed down to every stage. Nothing
//! here reads the process environment; credentials from environment variables
//! are applied at the CLI boundary through [`SiteConfig::with_credentials`].

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `recipes.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Site-wide presentation settings.
    pub site: SiteSection,
    /// Content Delivery API connection settings.
    pub contentful: ContentfulConfig,
    /// Incremental revalidation policy.
    pub revalidate: RevalidateConfig,
    /// Color schemes for light and dark modes.
    pub colors: ColorConfig,
    /// Parallel generation settings.
    pub processing: ProcessingConfig,
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    ///
    /// Credentials are not checked here: offline builds from a fixture file
    /// never need them. [`ContentfulConfig::require_credentials`] covers the
    /// online case.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.contentful.content_type.trim().is_empty() {
            return Err(ConfigError::Validation(
                "contentful.content_type must not be empty".into(),
            ));
        }
        if self.contentful.host.trim().is_empty() {
            return Err(ConfigError::Validation(
                "contentful.host must not be empty".into(),
            ));
        }
        if !(1..=1000).contains(&self.contentful.page_size) {
            return Err(ConfigError::Validation(
                "contentful.page_size must be 1-1000".into(),
            ));
        }
        if self.contentful.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "contentful.timeout_secs must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Override credentials with values supplied outside the config file.
    ///
    /// `None` leaves the configured value untouched.
    pub fn with_credentials(mut self, space_id: Option<String>, access_token: Option<String>) -> Self {
        if let Some(space_id) = space_id {
            self.contentful.space_id = space_id;
        }
        if let Some(access_token) = access_token {
            self.contentful.access_token = access_token;
        }
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteSection {
    /// Suffix for every page `<title>`.
    pub title: String,
}

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            title: "Recipes".to_string(),
        }
    }
}

/// Connection settings for the Content Delivery API.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContentfulConfig {
    /// Space identifier.
    pub space_id: String,
    /// Delivery API access token.
    pub access_token: String,
    /// Space environment.
    pub environment: String,
    /// API host, without scheme.
    pub host: String,
    /// Content type id of recipe entries.
    pub content_type: String,
    /// Entries requested per listing page.
    pub page_size: u32,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ContentfulConfig {
    fn default() -> Self {
        Self {
            space_id: String::new(),
            access_token: String::new(),
            environment: "master".to_string(),
            host: "cdn.contentful.com".to_string(),
            content_type: "recipe".to_string(),
            page_size: 100,
            timeout_secs: 30,
        }
    }
}

// Hand-written so the token never lands in logs.
impl std::fmt::Debug for ContentfulConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentfulConfig")
            .field("space_id", &self.space_id)
            .field("access_token", &"<redacted>")
            .field("environment", &self.environment)
            .field("host", &self.host)
            .field("content_type", &self.content_type)
            .field("page_size", &self.page_size)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ContentfulConfig {
    /// Fail unless both credentials are present.
    pub fn require_credentials(&self) -> Result<(), ConfigError> {
        if self.space_id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "contentful.space_id is required (or set CONTENTFUL_SPACE_ID)".into(),
            ));
        }
        if self.access_token.trim().is_empty() {
            return Err(ConfigError::Validation(
                "contentful.access_token is required (or set CONTENTFUL_ACCESS_KEY)".into(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Revalidation policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RevalidateConfig {
    /// Minimum age, in seconds, before a generated page is regenerated.
    /// Zero regenerates on every pass.
    pub interval_secs: u64,
}

impl Default for RevalidateConfig {
    fn default() -> Self {
        Self { interval_secs: 1 }
    }
}

impl RevalidateConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Parallel generation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of pages generated in parallel.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)`, never below one
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Color configuration for light and dark modes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorConfig {
    pub light: ColorScheme,
    pub dark: ColorScheme,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            light: ColorScheme::default_light(),
            dark: ColorScheme::default_dark(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorScheme {
    /// Page background.
    pub background: String,
    /// Body text.
    pub text: String,
    /// Skeleton blocks and rules.
    pub accent: String,
    /// Background of the tilted title card over the banner image.
    pub banner: String,
}

impl ColorScheme {
    pub fn default_light() -> Self {
        Self {
            background: "#ffffff".to_string(),
            text: "#333333".to_string(),
            accent: "#e0e0e0".to_string(),
            banner: "#ffffff".to_string(),
        }
    }

    pub fn default_dark() -> Self {
        Self {
            background: "#121212".to_string(),
            text: "#eeeeee".to_string(),
            accent: "#2a2a2a".to_string(),
            banner: "#1e1e1e".to_string(),
        }
    }
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self::default_light()
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILENAME: &str = "recipes.toml";

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(SiteConfig::default())
        .map_err(|e| ConfigError::Validation(format!("stock defaults failed to serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a file path.
///
/// A missing file yields the stock defaults; an unreadable or invalid file
/// is an error.
pub fn load_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using stock defaults");
        return resolve_config(None);
    }
    let content = fs::read_to_string(path)?;
    let overlay: toml::Value = toml::from_str(&content)?;
    resolve_config(Some(overlay))
}

/// Returns a fully-commented stock `recipes.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Recipe Pages Configuration
# ==========================
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

[site]
# Appended to every page title ("Banana Bread | Recipes").
title = "Recipes"

# ---------------------------------------------------------------------------
# Content Delivery API
# ---------------------------------------------------------------------------
[contentful]
# Prefer CONTENTFUL_SPACE_ID / CONTENTFUL_ACCESS_KEY over committing these.
space_id = ""
access_token = ""
environment = "master"
host = "cdn.contentful.com"

# Content type id of recipe entries.
content_type = "recipe"

# Entries per listing request when enumerating pages (1-1000).
page_size = 100

# Per-request timeout in seconds.
timeout_secs = 30

# ---------------------------------------------------------------------------
# Revalidation
# ---------------------------------------------------------------------------
[revalidate]
# Minimum age in seconds before a generated page is fetched and rendered
# again. Zero regenerates on every pass.
interval_secs = 1

# ---------------------------------------------------------------------------
# Colors
# ---------------------------------------------------------------------------
[colors.light]
background = "#ffffff"
text = "#333333"
accent = "#e0e0e0"        # Skeleton blocks
banner = "#ffffff"        # Title card over the banner image

[colors.dark]
background = "#121212"
text = "#eeeeee"
accent = "#2a2a2a"
banner = "#1e1e1e"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum pages generated in parallel.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

/// Generate CSS custom properties from color config.
pub fn generate_color_css(colors: &ColorConfig) -> String {
    format!(
        r#":root {{
    --color-bg: {light_bg};
    --color-text: {light_text};
    --color-accent: {light_accent};
    --color-banner: {light_banner};
}}

@media (prefers-color-scheme: dark) {{
    :root {{
        --color-bg: {dark_bg};
        --color-text: {dark_text};
        --color-accent: {dark_accent};
        --color-banner: {dark_banner};
    }}
}}"#,
        light_bg = colors.light.background,
        light_text = colors.light.text,
        light_accent = colors.light.accent,
        light_banner = colors.light.banner,
        dark_bg = colors.dark.background,
        dark_text = colors.dark.text,
        dark_accent = colors.dark.accent,
        dark_banner = colors.dark.banner,
    )
}
