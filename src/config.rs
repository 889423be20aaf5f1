//! Harvester configuration.
//!
//! Settings load from a TOML file when one is present and fall back to the
//! built-in defaults for the apniroots collection source. Every field is
//! individually defaulted so a config file only needs to name what it
//! changes.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::driver::DriverConfig;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "harvest.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub scroll: ScrollConfig,
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
    #[serde(default)]
    pub driver: DriverConfig,
}

/// What to harvest: the collection URL and the selector set for one item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_url")]
    pub url: String,

    /// Fixed classification applied to every record from this source.
    #[serde(default = "default_category")]
    pub category: String,

    /// Selector for one raw item in the collection grid.
    #[serde(default = "default_item_selector")]
    pub item_selector: String,

    /// The record identity. Items where this matches nothing are skipped.
    #[serde(default = "default_name_selector")]
    pub name_selector: String,

    /// Checked before the regular price selector.
    #[serde(default = "default_sale_price_selector")]
    pub sale_price_selector: String,

    #[serde(default = "default_price_selector")]
    pub price_selector: String,

    #[serde(default = "default_description_selector")]
    pub description_selector: String,

    #[serde(default = "default_availability_selector")]
    pub availability_selector: String,

    #[serde(default = "default_image_selector")]
    pub image_selector: String,

    /// Attribute carrying the image URL template.
    #[serde(default = "default_image_attribute")]
    pub image_attribute: String,

    /// Sizing token in the image URL template.
    #[serde(default = "default_image_width_token")]
    pub image_width_token: String,

    /// Fixed width substituted for the sizing token.
    #[serde(default = "default_image_width")]
    pub image_width: String,

    /// Interstitial popup container, dismissed best-effort before scrolling.
    #[serde(default = "default_popup_selector")]
    pub popup_selector: String,

    #[serde(default = "default_popup_close_selector")]
    pub popup_close_selector: String,
}

fn default_url() -> String {
    "https://apniroots.com/collections/all".to_string()
}

fn default_category() -> String {
    "All Products".to_string()
}

fn default_item_selector() -> String {
    "product-item.product-collection".to_string()
}

fn default_name_selector() -> String {
    "h4 a".to_string()
}

fn default_sale_price_selector() -> String {
    "span.price--sale[data-js-product-price]".to_string()
}

fn default_price_selector() -> String {
    "span.price[data-js-product-price]".to_string()
}

fn default_description_selector() -> String {
    "p.product-collection__description".to_string()
}

fn default_availability_selector() -> String {
    "p[data-js-product-availability] span:nth-child(2)".to_string()
}

fn default_image_selector() -> String {
    "img.rimage__img".to_string()
}

fn default_image_attribute() -> String {
    "data-master".to_string()
}

fn default_image_width_token() -> String {
    "{width}x".to_string()
}

fn default_image_width() -> String {
    "1024x".to_string()
}

fn default_popup_selector() -> String {
    "div[data-testid=\"POPUP\"]".to_string()
}

fn default_popup_close_selector() -> String {
    "button[aria-label=\"Close dialog\"]".to_string()
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            category: default_category(),
            item_selector: default_item_selector(),
            name_selector: default_name_selector(),
            sale_price_selector: default_sale_price_selector(),
            price_selector: default_price_selector(),
            description_selector: default_description_selector(),
            availability_selector: default_availability_selector(),
            image_selector: default_image_selector(),
            image_attribute: default_image_attribute(),
            image_width_token: default_image_width_token(),
            image_width: default_image_width(),
            popup_selector: default_popup_selector(),
            popup_close_selector: default_popup_close_selector(),
        }
    }
}

/// Scroll-loop timing and stall tolerance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrollConfig {
    /// Pause after each scroll so async content can materialize.
    #[serde(default = "default_pause_ms")]
    pub pause_ms: u64,

    /// Upper bound on waiting for the page to settle after a scroll.
    /// Hitting it is not an error; the loop proceeds regardless.
    #[serde(default = "default_settle_timeout_ms")]
    pub settle_timeout_ms: u64,

    /// Consecutive no-growth scrolls tolerated before terminating.
    #[serde(default = "default_max_stall_scrolls")]
    pub max_stall_scrolls: u32,

    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,

    /// How long to watch for an interstitial popup before moving on.
    #[serde(default = "default_popup_wait_ms")]
    pub popup_wait_ms: u64,
}

fn default_pause_ms() -> u64 {
    1000
}

fn default_settle_timeout_ms() -> u64 {
    10_000
}

fn default_max_stall_scrolls() -> u32 {
    5
}

fn default_navigation_timeout_ms() -> u64 {
    60_000
}

fn default_popup_wait_ms() -> u64 {
    7_000
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            pause_ms: default_pause_ms(),
            settle_timeout_ms: default_settle_timeout_ms(),
            max_stall_scrolls: default_max_stall_scrolls(),
            navigation_timeout_ms: default_navigation_timeout_ms(),
            popup_wait_ms: default_popup_wait_ms(),
        }
    }
}

/// Checkpoint and final artifact locations plus save cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// In-progress artifact, rewritten wholesale on every trigger.
    #[serde(default = "default_checkpoint_path")]
    pub path: String,

    /// Final artifact, written once on a clean run; the checkpoint is
    /// removed after it.
    #[serde(default = "default_output_path")]
    pub output: String,

    /// Save after this many newly accepted records.
    #[serde(default = "default_save_interval")]
    pub save_interval: usize,
}

fn default_checkpoint_path() -> String {
    "apniroots_products_partial.json".to_string()
}

fn default_output_path() -> String {
    "apniroots_products.json".to_string()
}

fn default_save_interval() -> usize {
    20
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            path: default_checkpoint_path(),
            output: default_output_path(),
            save_interval: default_save_interval(),
        }
    }
}

/// Load settings from an explicit path, or `harvest.toml` if present, or
/// fall back to defaults.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let default = Path::new(CONFIG_FILE);
            if !default.exists() {
                debug!("No {} found, using built-in defaults", CONFIG_FILE);
                return Ok(Settings::default());
            }
            default.to_path_buf()
        }
    };
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("reading config {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_yields_defaults() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings.source.url, "https://apniroots.com/collections/all");
        assert_eq!(settings.scroll.max_stall_scrolls, 5);
        assert_eq!(settings.checkpoint.save_interval, 20);
        assert!(settings.driver.headless);
    }

    #[test]
    fn test_partial_config_overrides_only_named_fields() {
        let settings: Settings = toml::from_str(
            r#"
            [source]
            url = "https://example.com/collections/tea"
            category = "Tea"

            [checkpoint]
            save_interval = 5
            "#,
        )
        .unwrap();
        assert_eq!(settings.source.url, "https://example.com/collections/tea");
        assert_eq!(settings.source.category, "Tea");
        // untouched fields keep their defaults
        assert_eq!(settings.source.name_selector, "h4 a");
        assert_eq!(settings.checkpoint.save_interval, 5);
        assert_eq!(settings.scroll.pause_ms, 1000);
    }
}
