//! The browser the harvest stages drive.
//!
//! Stages only see these traits: a [`Browser`] hands out isolated
//! [`BrowserContext`]s, which hand out [`Page`]s. Element handles are tied to
//! the document they were resolved on; once a page navigates, every handle
//! taken before the navigation is stale and must be resolved again.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("browser failed to launch: {0}")]
    Launch(String),
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },
    #[error("invalid url `{0}`")]
    InvalidUrl(String),
    #[error("invalid selector `{0}`")]
    InvalidSelector(String),
    #[error("no element matches `{0}`")]
    NotFound(String),
    #[error("timed out after {waited:?} waiting for `{selector}`")]
    WaitTimeout { selector: String, waited: Duration },
    #[error("handle for `{0}` is stale: the page navigated after it was resolved")]
    StaleHandle(String),
    #[error("element `{selector}` cannot be {action}")]
    Unsupported {
        selector: String,
        action: &'static str,
    },
    #[error("{0} is closed")]
    Closed(&'static str),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// A reference to an element on the document a page showed when the handle
/// was taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    generation: u64,
    selector: String,
    index: usize,
}

impl ElementHandle {
    pub fn new(generation: u64, selector: impl Into<String>, index: usize) -> Self {
        Self {
            generation,
            selector: selector.into(),
            index,
        }
    }

    /// Navigation count of the page at resolution time.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Position among all matches of [`Self::selector`].
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Starts the browser process for one run.
#[async_trait]
pub trait Launch: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn Browser>, BrowserError>;
}

#[async_trait]
pub trait Browser: Send + Sync {
    /// Page in the browser's default context.
    async fn new_page(&self) -> Result<Box<dyn Page>, BrowserError>;
    async fn new_context(&self) -> Result<Box<dyn BrowserContext>, BrowserError>;
    async fn close(&self) -> Result<(), BrowserError>;
}

#[async_trait]
pub trait BrowserContext: Send + Sync {
    async fn new_page(&self) -> Result<Box<dyn Page>, BrowserError>;
    async fn close(&self) -> Result<(), BrowserError>;
}

#[async_trait]
pub trait Page: Send + Sync {
    /// Navigates and waits for the load to finish.
    async fn goto(&mut self, url: &str) -> Result<(), BrowserError>;
    fn url(&self) -> Option<String>;
    async fn query_selector(&self, selector: &str) -> Result<Option<ElementHandle>, BrowserError>;
    async fn query_selector_all(&self, selector: &str) -> Result<Vec<ElementHandle>, BrowserError>;
    /// Polls until `selector` matches, failing once `timeout` has passed.
    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<ElementHandle, BrowserError>;
    async fn inner_html(&self, element: &ElementHandle) -> Result<String, BrowserError>;
    async fn text(&self, element: &ElementHandle) -> Result<String, BrowserError>;
    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, BrowserError>;
    /// Picks `value` on a `<select>`; the site navigates on change.
    async fn select_option(
        &mut self,
        select: &ElementHandle,
        value: &str,
    ) -> Result<(), BrowserError>;
    async fn click(&mut self, element: &ElementHandle) -> Result<(), BrowserError>;
    /// Captures the page near `path`; returns where the capture was written.
    async fn screenshot(&self, path: &Path) -> Result<PathBuf, BrowserError>;
    async fn close(&mut self) -> Result<(), BrowserError>;
}
