//! Chromium-backed render driver via chromiumoxide (CDP).

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig, Element, Page};
use futures::StreamExt;
use tracing::{debug, info, warn};

use super::{DriverConfig, ElementHandle, RenderDriver};

/// Common Chrome executable paths to check.
const CHROME_PATHS: &[&str] = &[
    // Linux
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    // macOS
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    // Common install locations
    "/opt/google/chrome/google-chrome",
];

/// Resolves on document load, or after an in-page fallback timeout so the
/// promise never hangs the settle wait.
const SETTLE_SCRIPT: &str = r#"
    new Promise((resolve) => {
        if (document.readyState === 'complete') {
            resolve(document.readyState);
        } else {
            window.addEventListener('load', () => resolve(document.readyState), { once: true });
            setTimeout(() => resolve('timeout'), 8000);
        }
    })
"#;

/// A live browser session holding one page for the whole harvest.
pub struct ChromiumDriver {
    browser: Browser,
    page: Page,
}

impl ChromiumDriver {
    /// Launch the browser and open a blank page.
    ///
    /// Failure here is fatal configuration: the harvest must not start and
    /// no artifacts are touched.
    pub async fn launch(config: &DriverConfig) -> Result<Self> {
        let chrome_path = match &config.chrome_path {
            Some(path) => path.clone(),
            None => find_chrome()?,
        };

        info!("Launching browser (headless={})", config.headless);

        let mut builder = BrowserConfig::builder().chrome_executable(chrome_path);

        // Set headless mode (with_head means NOT headless, confusingly)
        if !config.headless {
            builder = builder.with_head();
        }

        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--no-sandbox") // Often needed for headless in containers/restricted environments
            .arg("--disable-gpu"); // Recommended for headless

        for arg in &config.chrome_args {
            builder = builder.arg(arg);
        }

        let browser_config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build browser config: {}", e))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .context("Failed to launch browser")?;

        // Spawn handler task
        tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .context("Failed to open a page")?;

        Ok(Self { browser, page })
    }
}

/// Find a Chrome/Chromium executable.
fn find_chrome() -> Result<PathBuf> {
    for path in CHROME_PATHS {
        let p = std::path::Path::new(path);
        if p.exists() {
            info!("Found Chrome at: {}", path);
            return Ok(p.to_path_buf());
        }
    }

    for cmd in &[
        "google-chrome",
        "google-chrome-stable",
        "chromium",
        "chromium-browser",
    ] {
        if let Ok(output) = std::process::Command::new("which").arg(cmd).output() {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    info!("Found Chrome in PATH: {}", path);
                    return Ok(PathBuf::from(path));
                }
            }
        }
    }

    Err(anyhow::anyhow!(
        "Chrome/Chromium not found. Please install it:\n\
         - Arch/Manjaro: sudo pacman -S chromium\n\
         - Ubuntu/Debian: sudo apt install chromium-browser\n\
         - Fedora: sudo dnf install chromium\n\
         - Or download from: https://www.google.com/chrome/"
    ))
}

#[async_trait]
impl RenderDriver for ChromiumDriver {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        info!("Navigating to {}", url);
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(result) => {
                result.with_context(|| format!("navigating to {}", url))?;
                Ok(())
            }
            Err(_) => Err(anyhow::anyhow!("navigation to {} timed out", url)),
        }
    }

    async fn run_script(&self, expr: &str) -> Result<serde_json::Value> {
        let result = self
            .page
            .evaluate(expr.to_string())
            .await
            .context("evaluating script")?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn ElementHandle>>> {
        // chromiumoxide reports "no matches" as an error; that is an
        // ordinary empty page here, not a driver failure. Genuine session
        // loss surfaces through run_script on the same tick.
        let elements = match self.page.find_elements(selector).await {
            Ok(elements) => elements,
            Err(err) => {
                debug!("No matches for {}: {}", selector, err);
                Vec::new()
            }
        };
        Ok(elements
            .into_iter()
            .map(|inner| Box::new(ChromiumElement { inner }) as Box<dyn ElementHandle>)
            .collect())
    }

    async fn wait_for_settled(&self, timeout: Duration) {
        match tokio::time::timeout(timeout, self.page.evaluate(SETTLE_SCRIPT.to_string())).await {
            Ok(Ok(result)) => {
                let state: String = result
                    .into_value()
                    .unwrap_or_else(|_| "unknown".to_string());
                debug!("Page ready state: {}", state);
            }
            Ok(Err(e)) => {
                debug!("Could not check ready state: {}", e);
            }
            Err(_) => {
                warn!("Timeout waiting for page to settle, continuing");
            }
        }
    }

    async fn close(&mut self) {
        if let Err(err) = self.browser.close().await {
            debug!("Browser close failed: {}", err);
        }
        let _ = self.browser.wait().await;
    }
}

struct ChromiumElement {
    inner: Element,
}

#[async_trait]
impl ElementHandle for ChromiumElement {
    async fn query(&self, selector: &str) -> Option<Box<dyn ElementHandle>> {
        self.inner
            .find_element(selector)
            .await
            .ok()
            .map(|inner| Box::new(ChromiumElement { inner }) as Box<dyn ElementHandle>)
    }

    async fn text(&self) -> Option<String> {
        self.inner.inner_text().await.ok().flatten()
    }

    async fn attribute(&self, name: &str) -> Option<String> {
        self.inner.attribute(name).await.ok().flatten()
    }

    async fn click(&self) -> Result<()> {
        self.inner.click().await.context("clicking element")?;
        Ok(())
    }
}
