//! Browser capability interface.
//!
//! The engine only ever talks to a page through [`Browser`]; rendering,
//! element lookup and challenge solving live behind it. A [`BrowserFactory`]
//! hands each worker its own session.

pub mod http;

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub use http::{HttpBrowser, HttpBrowserFactory};

/// Interval between visibility checks in the default `wait_visible`.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("No page is loaded")]
    NoPage,

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Timed out after {waited:?} waiting for {locator}")]
    Timeout { locator: String, waited: Duration },

    #[error("Not supported by this browser backend: {0}")]
    Unsupported(&'static str),

    #[error("Browser session error: {0}")]
    Session(String),
}

/// How to find an element on the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// CSS selector.
    Css(String),
    /// Element with the given tag whose text contains `text`.
    TagWithText { tag: String, text: String },
    /// Matches when any of the inner locators matches; the first match wins for clicks.
    AnyOf(Vec<Locator>),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn tag_with_text(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Locator::TagWithText {
            tag: tag.into(),
            text: text.into(),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(selector) => write!(f, "css({})", selector),
            Locator::TagWithText { tag, text } => write!(f, "{}[text*={:?}]", tag, text),
            Locator::AnyOf(inner) => {
                write!(f, "any(")?;
                for (i, locator) in inner.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{}", locator)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// A link on the current page: absolute destination plus trimmed visible text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub href: String,
    pub text: String,
}

impl Anchor {
    pub fn new(href: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            text: text.into(),
        }
    }
}

/// One automation session. Implementations are driven by a single worker.
#[async_trait]
pub trait Browser: Send {
    /// Page load that may drop and re-establish the connection to get past
    /// an interstitial.
    async fn open_with_reconnect(
        &mut self,
        url: &str,
        reconnect_attempts: u32,
    ) -> Result<(), BrowserError>;

    /// Plain page load.
    async fn open(&mut self, url: &str) -> Result<(), BrowserError>;

    async fn current_url(&mut self) -> Option<String>;

    async fn is_visible(&mut self, locator: &Locator) -> bool;

    async fn click(&mut self, locator: &Locator) -> Result<(), BrowserError>;

    async fn find_anchors(&mut self) -> Result<Vec<Anchor>, BrowserError>;

    async fn wait_visible(
        &mut self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<(), BrowserError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.is_visible(locator).await {
                return Ok(());
            }
            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Err(BrowserError::Timeout {
                    locator: locator.to_string(),
                    waited: timeout,
                });
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    /// Interact with an embedded challenge frame.
    async fn solve_challenge_widget(&mut self) -> Result<(), BrowserError>;

    /// Markup of the page as currently rendered.
    async fn page_source(&mut self) -> Result<String, BrowserError>;

    /// Paginated document export of the current page.
    async fn export_pdf(&mut self) -> Result<Vec<u8>, BrowserError> {
        Err(BrowserError::Unsupported("pdf export"))
    }
}

/// Produces one session per worker.
#[async_trait]
pub trait BrowserFactory: Send + Sync {
    async fn open_session(&self) -> Result<Box<dyn Browser>, BrowserError>;
}

/// Static options applied to every session a factory opens.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Honoured by rendering backends; the HTTP backend has no window.
    pub headless: bool,
}
