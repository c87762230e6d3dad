//! Headless browser boundary.
//!
//! The listing page is client-rendered, so a plain HTTP fetch returns an
//! empty shell. [`ChromiumPage`] loads it in headless Chromium, waits for the
//! network to go quiet plus a settle delay, and returns the serialized DOM.
//! Everything downstream works on that HTML string.

use crate::config::ExtractorConfig;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::{Stream, StreamExt};
use std::error::Error;
use std::fmt::Display;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, instrument, warn};

/// Something that can turn a URL into rendered HTML.
///
/// Implementors must release whatever session they open before returning,
/// on success and on error alike.
pub trait RenderPage {
    /// Load `url`, let client-side rendering finish and return the DOM as HTML.
    async fn render(&self, url: &str) -> Result<String, Box<dyn Error>>;
}

/// How long a graceful browser shutdown may take before the process is killed.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Renders pages with a short-lived headless Chromium session.
#[derive(Debug, Clone)]
pub struct ChromiumPage {
    chrome_path: Option<PathBuf>,
    navigation_timeout: Duration,
    network_idle: Duration,
    settle: Duration,
}

impl ChromiumPage {
    pub fn new(config: &ExtractorConfig, chrome_path: Option<PathBuf>) -> Self {
        Self {
            chrome_path,
            navigation_timeout: Duration::from_millis(config.navigation_timeout_ms),
            network_idle: Duration::from_millis(config.network_idle_ms),
            settle: Duration::from_millis(config.settle_ms),
        }
    }

    async fn launch(&self) -> Result<(Browser, JoinHandle<()>), Box<dyn Error>> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(2632, 1222)
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions");
        if let Some(path) = &self.chrome_path {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|e| format!("invalid browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| format!("failed to launch Chromium: {e}"))?;

        // The handler must keep being polled until the browser is gone, or
        // close() never sees its reply.
        let events = tokio::spawn(async move {
            let errors = drain_events(&mut handler).await;
            debug!(errors, "Chromium event stream ended");
        });

        info!("Launched headless Chromium");
        Ok((browser, events))
    }

    async fn load(&self, browser: &Browser, url: &str) -> Result<String, Box<dyn Error>> {
        let start = Instant::now();
        let page = timeout(self.navigation_timeout, async {
            let page = browser.new_page(url).await?;
            page.wait_for_navigation().await?;
            Ok::<_, chromiumoxide::error::CdpError>(page)
        })
        .await
        .map_err(|_| format!("navigation to {url} timed out after {:?}", self.navigation_timeout))?
        .map_err(|e| format!("navigation to {url} failed: {e}"))?;
        info!(%url, elapsed_ms = start.elapsed().as_millis() as u64, "Page loaded");

        let remaining = self.navigation_timeout.saturating_sub(start.elapsed());
        wait_for_network_idle(&page, self.network_idle, remaining).await;

        sleep(self.settle).await;
        let html = page.content().await?;
        info!(bytes = html.len(), "Captured rendered DOM");
        Ok(html)
    }
}

impl RenderPage for ChromiumPage {
    #[instrument(level = "info", skip(self))]
    async fn render(&self, url: &str) -> Result<String, Box<dyn Error>> {
        let (mut browser, events) = self.launch().await?;
        let result = self.load(&browser, url).await;

        shut_down(&mut browser, SHUTDOWN_TIMEOUT).await;
        events.abort();
        debug!("Chromium session closed");

        result
    }
}

/// Poll `events` to the end, logging errors instead of stopping on them.
/// Returns how many errors were seen.
async fn drain_events<S, E>(events: &mut S) -> usize
where
    S: Stream<Item = Result<(), E>> + Unpin,
    E: Display,
{
    let mut errors = 0;
    while let Some(event) = events.next().await {
        if let Err(e) = event {
            errors += 1;
            debug!(error = %e, "Chromium event error");
        }
    }
    errors
}

/// Close `browser` gracefully, killing the process if that fails or takes
/// longer than `limit`.
async fn shut_down(browser: &mut Browser, limit: Duration) {
    let close = timeout(limit, browser.close()).await;
    let closed = match close {
        Ok(Ok(_)) => {
            let exit = timeout(limit, browser.wait()).await;
            match exit {
                Ok(Ok(_)) => true,
                Ok(Err(e)) => {
                    warn!(error = %e, "Failed to reap Chromium process");
                    false
                }
                Err(_) => {
                    warn!(limit_ms = limit.as_millis() as u64, "Chromium did not exit after close");
                    false
                }
            }
        }
        Ok(Err(e)) => {
            warn!(error = %e, "Failed to close Chromium cleanly");
            false
        }
        Err(_) => {
            warn!(limit_ms = limit.as_millis() as u64, "Chromium close timed out");
            false
        }
    };
    if !closed {
        match browser.kill().await {
            Some(Err(e)) => warn!(error = %e, "Failed to kill Chromium process"),
            Some(Ok(())) => info!("Killed Chromium process"),
            None => {}
        }
    }
}

/// Wait until the page stops requesting resources.
///
/// Polls the number of performance resource entries and returns once it has
/// stayed the same for `idle`, or when `limit` runs out. A page that never
/// settles is not an error; the settle delay still follows.
async fn wait_for_network_idle(page: &Page, idle: Duration, limit: Duration) {
    const POLL: Duration = Duration::from_millis(100);
    let deadline = Instant::now() + limit;
    let mut last_count: Option<u64> = None;
    let mut stable_since = Instant::now();

    while Instant::now() < deadline {
        let count = match page
            .evaluate("performance.getEntriesByType('resource').length")
            .await
        {
            Ok(result) => result.into_value::<u64>().ok(),
            Err(e) => {
                warn!(error = %e, "Could not read resource count; skipping idle wait");
                return;
            }
        };

        if count != last_count {
            last_count = count;
            stable_since = Instant::now();
        } else if stable_since.elapsed() >= idle {
            debug!(resources = ?count, "Network idle");
            return;
        }
        sleep(POLL).await;
    }
    warn!(limit_ms = limit.as_millis() as u64, "Network did not go idle before the deadline");
}
