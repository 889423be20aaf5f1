//! Render driver capability: the engine's only window onto the page.
//!
//! The harvest loop treats the browser as an opaque capability producing a
//! stream of currently-visible raw items. Everything page-specific lives
//! behind these traits, which keeps the dedup/checkpoint core testable
//! against a scripted driver.

mod chromium;

pub use chromium::ChromiumDriver;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Browser driver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Run the browser headless (default: true).
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Explicit browser binary; discovered from well-known paths when unset.
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,

    /// Additional Chrome arguments.
    #[serde(default)]
    pub chrome_args: Vec<String>,
}

fn default_headless() -> bool {
    true
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            chrome_path: None,
            chrome_args: Vec::new(),
        }
    }
}

/// One element in the driver's current snapshot of the page.
///
/// Reads degrade to None instead of erroring; a selector that matches
/// nothing is an expected per-field condition, not a driver failure.
#[async_trait]
pub trait ElementHandle: Send + Sync {
    /// First descendant matching `selector`, if any.
    async fn query(&self, selector: &str) -> Option<Box<dyn ElementHandle>>;

    /// Rendered text content of this element.
    async fn text(&self) -> Option<String>;

    async fn attribute(&self, name: &str) -> Option<String>;

    async fn click(&self) -> Result<()>;
}

/// Opaque page-rendering capability.
///
/// Accessed by exactly one caller at a time; every method on the real
/// driver is a CDP round trip. Errors from these methods are driver-level
/// failures: unrecoverable for the current run, handled at the loop
/// boundary by saving what was harvested and exiting.
#[async_trait]
pub trait RenderDriver: Send {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()>;

    /// Evaluate a JavaScript expression and return its JSON value.
    async fn run_script(&self, expr: &str) -> Result<serde_json::Value>;

    /// All elements currently matching `selector`. An empty page yields an
    /// empty vec, not an error.
    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn ElementHandle>>>;

    /// Wait until page activity quiets, bounded by `timeout`. Best-effort:
    /// a timeout is tolerated, never an error.
    async fn wait_for_settled(&self, timeout: Duration);

    async fn close(&mut self);
}
