//! Chrome session helper for scraping pages that need a real browser
//!
//! [`BrowserSession`] owns the browser process, the CDP event handler task and, on hosts
//! without a graphical session, an Xvfb server. Prefer [`with_session`], which closes the
//! session on every exit path; a session that is dropped without [`BrowserSession::close`]
//! still has its processes killed, but without a graceful shutdown.
//!
//! Optional affordances never fail the caller: a missing cookie banner, a missing virtual
//! display and a rejected click are reported through [`CookieConsent`], [`DisplayOutcome`]
//! and [`ClickOutcome`].

mod display;

pub use chromiumoxide::element::Element;
pub use display::{DisplayOutcome, VirtualDisplay, needs_virtual_display};

use crate::error::{BrowserError, Result};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use futures::future::LocalBoxFuture;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Cookie banners accepted on navigation (English and Spanish sites)
pub const COOKIE_BUTTON_XPATH: &str = "//button[contains(., 'Agree') or contains(., 'Aceptar')]";

/// Default time to wait for a cookie banner
pub const DEFAULT_COOKIE_TIMEOUT: Duration = Duration::from_secs(10);

const COOKIE_POLL_INTERVAL: Duration = Duration::from_millis(250);

const CLICK_SCRIPT: &str = "function() { this.click(); }";

/// Browser launch options
#[derive(Clone, Debug)]
pub struct BrowserOptions {
    /// Run without a visible window (default: true)
    pub headless: bool,
    /// Mute audio output (default: true)
    pub muted: bool,
    /// Start Xvfb when no `DISPLAY` is set (default: true)
    pub virtual_display: bool,
    /// Virtual display size in pixels (default: 800x600)
    pub display_size: (u32, u32),
    /// How long [`BrowserSession::navigate`] waits for a cookie banner (default: 10s)
    pub cookie_timeout: Duration,
    /// Chrome binary (auto-detected if None)
    pub chrome_executable: Option<PathBuf>,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            muted: true,
            virtual_display: true,
            display_size: (800, 600),
            cookie_timeout: DEFAULT_COOKIE_TIMEOUT,
            chrome_executable: None,
        }
    }
}

/// Command-line flags passed to Chrome
pub fn launch_args(options: &BrowserOptions) -> Vec<&'static str> {
    let mut args = vec!["--disable-extensions"];
    if options.headless {
        args.push("--headless");
    }
    if options.muted {
        args.push("--mute-audio");
    }
    args.push("--no-sandbox");
    args.push("--disable-dev-shm-usage");
    args
}

/// Result of looking for a cookie-consent banner after navigation
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CookieConsent {
    /// A consent button was found and clicked
    Dismissed,
    /// No consent button appeared before the timeout
    NotFound,
    /// A consent button was found but never accepted a click before the timeout
    ClickRejected(String),
}

impl CookieConsent {
    /// Outcome once the wait is over without a successful click
    fn timed_out(last_rejection: Option<String>) -> Self {
        match last_rejection {
            Some(reason) => CookieConsent::ClickRejected(reason),
            None => CookieConsent::NotFound,
        }
    }
}

/// Result of a script-injected click
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClickOutcome {
    /// The element received the click
    Clicked,
    /// The page rejected the click
    Rejected(String),
}

impl ClickOutcome {
    fn from_rejection(rejection: Option<String>) -> Self {
        match rejection {
            None => ClickOutcome::Clicked,
            Some(reason) => ClickOutcome::Rejected(reason),
        }
    }
}

/// Quote a string as an XPath 1.0 literal
///
/// XPath 1.0 has no escape sequences, so a string holding both quote kinds is built
/// with `concat()`.
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{}'", value);
    }
    if !value.contains('"') {
        return format!("\"{}\"", value);
    }
    let parts: Vec<String> = value
        .split('\'')
        .map(|part| format!("'{}'", part))
        .collect();
    format!("concat({})", parts.join(", \"'\", "))
}

/// A running browser with one page
pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    display: Option<VirtualDisplay>,
    display_outcome: DisplayOutcome,
    cookie_timeout: Duration,
    closed: bool,
}

impl BrowserSession {
    /// Launch a browser
    ///
    /// # Errors
    /// Returns [`BrowserError`] if the configuration is invalid or Chrome fails to start.
    /// A virtual display that cannot be started is logged and ignored.
    pub async fn launch(options: BrowserOptions) -> Result<Self> {
        let (width, height) = options.display_size;
        let (display, display_outcome) =
            display::prepare(options.virtual_display, width, height).await;
        match &display_outcome {
            DisplayOutcome::Started(name) => info!("Started virtual display {}", name),
            DisplayOutcome::Unavailable(reason) => warn!(
                "Could not use virtual display, will try to continue anyway: {}",
                reason
            ),
            DisplayOutcome::NotNeeded => debug!("No virtual display needed"),
        }

        // Headless mode is controlled by our own flag list rather than the driver default
        let mut builder = BrowserConfig::builder()
            .with_head()
            .args(launch_args(&options));
        if let Some(display) = &display {
            builder = builder.env("DISPLAY", display.display());
        }
        if let Some(executable) = &options.chrome_executable {
            builder = builder.chrome_executable(executable);
        }
        let config = builder.build().map_err(BrowserError::Config)?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(BrowserError::from)?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler_task.abort();
                return Err(BrowserError::from(e).into());
            }
        };

        debug!(args = ?launch_args(&options), "browser launched");
        Ok(Self {
            browser,
            page,
            handler_task,
            display,
            display_outcome,
            cookie_timeout: options.cookie_timeout,
            closed: false,
        })
    }

    /// How the display question was settled at launch
    pub fn display_outcome(&self) -> &DisplayOutcome {
        &self.display_outcome
    }

    /// The page driven by this session
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Navigate to `url`, then try to accept a cookie-consent banner
    ///
    /// # Errors
    /// Returns [`BrowserError`] only if navigation itself fails.
    pub async fn navigate(&self, url: &str) -> Result<CookieConsent> {
        self.page.goto(url).await.map_err(BrowserError::from)?;
        let consent = self.accept_cookies(self.cookie_timeout).await;
        match &consent {
            CookieConsent::Dismissed => info!("Cookies accepted on {}", url),
            CookieConsent::NotFound => info!("No cookie banner found on {}", url),
            CookieConsent::ClickRejected(reason) => {
                warn!("Cookie banner on {} did not accept the click: {}", url, reason)
            }
        }
        Ok(consent)
    }

    /// Poll for a consent button until `timeout` and click it
    pub async fn accept_cookies(&self, timeout: Duration) -> CookieConsent {
        let deadline = Instant::now() + timeout;
        let mut last_rejection: Option<String> = None;

        loop {
            if let Ok(button) = self.page.find_xpath(COOKIE_BUTTON_XPATH).await {
                match button.click().await {
                    Ok(_) => return CookieConsent::Dismissed,
                    Err(e) => last_rejection = Some(e.to_string()),
                }
            }

            if Instant::now() >= deadline {
                return CookieConsent::timed_out(last_rejection);
            }
            tokio::time::sleep(COOKIE_POLL_INTERVAL).await;
        }
    }

    /// Click an element from script, bypassing overlay and visibility checks
    pub async fn click_element(&self, element: &Element) -> ClickOutcome {
        let rejection = match element.call_js_fn(CLICK_SCRIPT, false).await {
            Ok(returns) => returns.exception_details.map(|details| details.text),
            Err(e) => Some(e.to_string()),
        };
        let outcome = ClickOutcome::from_rejection(rejection);
        if let ClickOutcome::Rejected(reason) = &outcome {
            warn!("Element is not clickable: {}", reason);
        }
        outcome
    }

    /// First link whose text contains `text`
    pub async fn find_element_by_partial_text(&self, text: &str) -> Result<Element> {
        self.find_element_by_xpath(&format!("//a[contains(., {})]", xpath_literal(text)))
            .await
    }

    /// First element matching an XPath expression
    pub async fn find_element_by_xpath(&self, xpath: &str) -> Result<Element> {
        Ok(self
            .page
            .find_xpath(xpath)
            .await
            .map_err(BrowserError::from)?)
    }

    /// All elements matching an XPath expression
    pub async fn find_elements_by_xpath(&self, xpath: &str) -> Result<Vec<Element>> {
        Ok(self
            .page
            .find_xpaths(xpath)
            .await
            .map_err(BrowserError::from)?)
    }

    /// Element with the given `id` attribute
    pub async fn find_element_by_id(&self, html_id: &str) -> Result<Element> {
        self.find_element_by_xpath(&format!("//*[@id={}]", xpath_literal(html_id)))
            .await
    }

    /// Shut the browser down and stop the virtual display
    ///
    /// # Errors
    /// Returns [`BrowserError`] if the browser does not acknowledge the close request;
    /// the process is still reaped and the display stopped.
    pub async fn close(mut self) -> Result<()> {
        self.closed = true;

        let closed = self.browser.close().await;
        if let Err(e) = self.browser.wait().await {
            debug!(error = %e, "failed to wait for browser process");
        }
        self.handler_task.abort();
        if let Some(display) = self.display.take() {
            display.stop().await;
        }

        closed.map_err(BrowserError::from)?;
        debug!("browser session closed");
        Ok(())
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if !self.closed {
            warn!("Browser session dropped without close, killing browser");
            self.handler_task.abort();
        }
    }
}

/// Run `f` against a fresh session and close it afterwards, whatever `f` returns
///
/// ```no_run
/// use podcast_dl::browser::{BrowserOptions, with_session};
///
/// # #[tokio::main]
/// # async fn main() -> podcast_dl::Result<()> {
/// let links = with_session(BrowserOptions::default(), |session| {
///     Box::pin(async move {
///         session.navigate("https://www.ivoox.com").await?;
///         Ok(session.find_elements_by_xpath("//a").await?.len())
///     })
/// })
/// .await?;
/// println!("{} links", links);
/// # Ok(())
/// # }
/// ```
pub async fn with_session<T, F>(options: BrowserOptions, f: F) -> Result<T>
where
    F: for<'s> FnOnce(&'s BrowserSession) -> LocalBoxFuture<'s, Result<T>>,
{
    let session = BrowserSession::launch(options).await?;
    let result = f(&session).await;
    let closed = session.close().await;

    match (result, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(close_err)) => Err(close_err),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close_err)) => {
            warn!("Failed to close browser after error: {}", close_err);
            Err(e)
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_launch_args() {
        assert_eq!(
            launch_args(&BrowserOptions::default()),
            vec![
                "--disable-extensions",
                "--headless",
                "--mute-audio",
                "--no-sandbox",
                "--disable-dev-shm-usage",
            ]
        );
    }

    #[test]
    fn headful_unmuted_launch_args() {
        let options = BrowserOptions {
            headless: false,
            muted: false,
            ..Default::default()
        };
        assert_eq!(
            launch_args(&options),
            vec![
                "--disable-extensions",
                "--no-sandbox",
                "--disable-dev-shm-usage"
            ]
        );
    }

    #[test]
    fn default_options() {
        let options = BrowserOptions::default();
        assert_eq!(options.cookie_timeout, Duration::from_secs(10));
        assert_eq!(options.display_size, (800, 600));
        assert!(options.virtual_display);
    }

    #[test]
    fn xpath_literal_quoting() {
        assert_eq!(xpath_literal("Episodes"), "'Episodes'");
        assert_eq!(xpath_literal("Rock'n'roll"), "\"Rock'n'roll\"");
        assert_eq!(
            xpath_literal(r#"say "it's""#),
            r#"concat('say "it', "'", 's"')"#
        );
    }

    #[test]
    fn cookie_consent_after_timeout() {
        assert_eq!(CookieConsent::timed_out(None), CookieConsent::NotFound);
        assert_eq!(
            CookieConsent::timed_out(Some("element is covered".to_string())),
            CookieConsent::ClickRejected("element is covered".to_string())
        );
    }

    #[test]
    fn click_outcome_from_script_result() {
        assert_eq!(ClickOutcome::from_rejection(None), ClickOutcome::Clicked);
        assert_eq!(
            ClickOutcome::from_rejection(Some("Uncaught TypeError".to_string())),
            ClickOutcome::Rejected("Uncaught TypeError".to_string())
        );
    }

    #[test]
    fn cookie_xpath_matches_both_languages() {
        assert!(COOKIE_BUTTON_XPATH.contains("'Agree'"));
        assert!(COOKIE_BUTTON_XPATH.contains("'Aceptar'"));
    }

    // Needs Chrome installed: cargo test -- --ignored
    #[tokio::test]
    #[ignore]
    async fn session_finds_elements_on_a_data_url() {
        let options = BrowserOptions {
            cookie_timeout: Duration::from_millis(500),
            ..Default::default()
        };
        let (by_id, links, consent) = with_session(options, |session| {
            Box::pin(async move {
                let consent = session
                    .navigate("data:text/html,<a id='ep' href='#'>Episode 12</a><a href='#'>Other</a>")
                    .await?;
                let by_id = session.find_element_by_id("ep").await?;
                let click = session.click_element(&by_id).await;
                assert_eq!(click, ClickOutcome::Clicked);
                session.find_element_by_partial_text("Episode").await?;
                let links = session.find_elements_by_xpath("//a").await?.len();
                Ok((by_id.inner_text().await.ok().flatten(), links, consent))
            })
        })
        .await
        .unwrap();

        assert_eq!(by_id.as_deref(), Some("Episode 12"));
        assert_eq!(links, 2);
        assert_eq!(consent, CookieConsent::NotFound);
    }
}
