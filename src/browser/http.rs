//! Static-HTML backend: every page load is one GET, element queries run
//! against the fetched markup. It cannot run scripts, so challenge widgets
//! and PDF export are unsupported; a site without a JS gate works fine.

use async_trait::async_trait;
use std::sync::Arc;

use super::{Anchor, Browser, BrowserError, BrowserFactory, Locator, SessionOptions};
use crate::network::HttpClient;
use crate::parser::{self, ClickTarget};

/// Transient-error retries inside a single page load.
const FETCH_RETRIES: u32 = 2;

#[derive(Debug, Clone)]
struct LoadedPage {
    url: String,
    html: String,
}

pub struct HttpBrowser {
    client: Arc<HttpClient>,
    page: Option<LoadedPage>,
}

impl HttpBrowser {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self { client, page: None }
    }

    fn loaded(&self) -> Result<&LoadedPage, BrowserError> {
        self.page.as_ref().ok_or(BrowserError::NoPage)
    }

    /// `keep_error_page` keeps a 4xx/5xx response as the current page;
    /// otherwise such a status is a navigation failure.
    async fn load(&mut self, url: &str, keep_error_page: bool) -> Result<(), BrowserError> {
        let fetched = match self.client.fetch(url, FETCH_RETRIES).await {
            Ok(fetched) => fetched,
            Err(e) => {
                self.page = None;
                return Err(BrowserError::Navigation {
                    url: url.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        if fetched.status_code >= 400 {
            if !keep_error_page {
                self.page = None;
                return Err(BrowserError::Navigation {
                    url: url.to_string(),
                    reason: format!("HTTP status {}", fetched.status_code),
                });
            }
            // Challenge walls answer 403/503 with a page worth inspecting.
            tracing::debug!(url = %url, status = fetched.status_code, "Page loaded with error status");
        }

        self.page = Some(LoadedPage {
            url: fetched.final_url,
            html: fetched.content,
        });
        Ok(())
    }
}

#[async_trait]
impl Browser for HttpBrowser {
    async fn open_with_reconnect(
        &mut self,
        url: &str,
        reconnect_attempts: u32,
    ) -> Result<(), BrowserError> {
        let attempts = reconnect_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.load(url, true).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::debug!(url = %url, attempt, error = %e, "Reconnect attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(BrowserError::NoPage))
    }

    async fn open(&mut self, url: &str) -> Result<(), BrowserError> {
        self.load(url, false).await
    }

    async fn current_url(&mut self) -> Option<String> {
        self.page.as_ref().map(|p| p.url.clone())
    }

    async fn is_visible(&mut self, locator: &Locator) -> bool {
        match &self.page {
            Some(page) => parser::matches(&page.html, locator),
            None => false,
        }
    }

    /// Follows the `href` of the first match; anything else needs script.
    async fn click(&mut self, locator: &Locator) -> Result<(), BrowserError> {
        let page = self.loaded()?;
        match parser::click_target(&page.html, locator, &page.url) {
            ClickTarget::Link(target) => self.load(&target, false).await,
            ClickTarget::NotALink => Err(BrowserError::Unsupported("click on a non-link element")),
            ClickTarget::Missing => Err(BrowserError::ElementNotFound(locator.to_string())),
        }
    }

    async fn find_anchors(&mut self) -> Result<Vec<Anchor>, BrowserError> {
        let page = self.loaded()?;
        Ok(parser::extract_anchors(&page.html, &page.url))
    }

    async fn solve_challenge_widget(&mut self) -> Result<(), BrowserError> {
        Err(BrowserError::Unsupported("challenge widget"))
    }

    async fn page_source(&mut self) -> Result<String, BrowserError> {
        Ok(self.loaded()?.html.clone())
    }
}

/// Hands out sessions sharing one connection pool.
pub struct HttpBrowserFactory {
    client: Arc<HttpClient>,
}

impl HttpBrowserFactory {
    pub fn new(options: &SessionOptions) -> Result<Self, BrowserError> {
        let client = HttpClient::new(options.user_agent.clone(), options.timeout_secs)
            .map_err(|e| BrowserError::Session(e.to_string()))?;
        Ok(Self {
            client: Arc::new(client),
        })
    }
}

#[async_trait]
impl BrowserFactory for HttpBrowserFactory {
    async fn open_session(&self) -> Result<Box<dyn Browser>, BrowserError> {
        Ok(Box::new(HttpBrowser::new(Arc::clone(&self.client))))
    }
}
