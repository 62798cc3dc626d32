//! A [`Browser`] that renders pages by fetching them over HTTP and querying
//! the returned markup with CSS selectors.
//!
//! The site needs no script execution: the session dropdown navigates to the
//! selected option's value and the export links are plain anchors. XML
//! responses are shown the way a browser's XML viewer shows them, as one
//! element (id `xml_viewer_id`) whose inner markup is the untouched source.

use crate::browser::{Browser, BrowserContext, BrowserError, ElementHandle, Launch, Page};
use crate::config::HarvestConfig;
use async_trait::async_trait;
use reqwest::Url;
use reqwest::header::CONTENT_TYPE;
use scraper::{Html, Selector};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct Fetched {
    pub body: String,
    pub content_type: Option<String>,
}

/// Transport under [`HttpPage`].
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn get(&self, url: &Url) -> Result<Fetched, BrowserError>;
}

pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, BrowserError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| BrowserError::Launch(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetch for ReqwestFetcher {
    async fn get(&self, url: &Url) -> Result<Fetched, BrowserError> {
        let transport = |e: reqwest::Error| BrowserError::Transport {
            url: url.to_string(),
            source: Box::new(e),
        };

        let response = self.client.get(url.clone()).send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(BrowserError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.map_err(transport)?;
        tracing::debug!(%url, bytes = body.len(), "fetched");
        Ok(Fetched { body, content_type })
    }
}

/// Launches an [`HttpBrowser`] backed by `reqwest`.
pub struct HttpLauncher {
    user_agent: String,
    request_timeout: Duration,
    viewer_id: String,
}

impl HttpLauncher {
    pub fn from_config(config: &HarvestConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            request_timeout: config.request_timeout(),
            viewer_id: config.xml_viewer_id.clone(),
        }
    }
}

#[async_trait]
impl Launch for HttpLauncher {
    async fn launch(&self) -> Result<Box<dyn Browser>, BrowserError> {
        let fetcher = ReqwestFetcher::new(&self.user_agent, self.request_timeout)?;
        Ok(Box::new(HttpBrowser::new(Arc::new(fetcher), &self.viewer_id)))
    }
}

pub struct HttpBrowser {
    fetcher: Arc<dyn Fetch>,
    viewer_id: String,
    closed: AtomicBool,
}

impl HttpBrowser {
    pub fn new(fetcher: Arc<dyn Fetch>, viewer_id: &str) -> Self {
        Self {
            fetcher,
            viewer_id: viewer_id.to_string(),
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> Result<(), BrowserError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BrowserError::Closed("browser"));
        }
        Ok(())
    }
}

#[async_trait]
impl Browser for HttpBrowser {
    async fn new_page(&self) -> Result<Box<dyn Page>, BrowserError> {
        self.ensure_open()?;
        Ok(Box::new(HttpPage::new(self.fetcher.clone(), &self.viewer_id)))
    }

    // No cookies or cache are kept, so every context is isolated already.
    async fn new_context(&self) -> Result<Box<dyn BrowserContext>, BrowserError> {
        self.ensure_open()?;
        Ok(Box::new(HttpContext {
            fetcher: self.fetcher.clone(),
            viewer_id: self.viewer_id.clone(),
            closed: AtomicBool::new(false),
        }))
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub struct HttpContext {
    fetcher: Arc<dyn Fetch>,
    viewer_id: String,
    closed: AtomicBool,
}

#[async_trait]
impl BrowserContext for HttpContext {
    async fn new_page(&self) -> Result<Box<dyn Page>, BrowserError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BrowserError::Closed("browser context"));
        }
        Ok(Box::new(HttpPage::new(self.fetcher.clone(), &self.viewer_id)))
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

enum Document {
    Blank,
    Html(String),
    Xml(String),
}

/// Owned copy of what a handle points at.
struct Snapshot {
    tag: String,
    inner_html: String,
    text: String,
    attrs: Vec<(String, String)>,
    option_values: Vec<String>,
}

impl Snapshot {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

pub struct HttpPage {
    fetcher: Arc<dyn Fetch>,
    viewer_id: String,
    url: Option<Url>,
    document: Document,
    generation: u64,
    closed: bool,
}

impl HttpPage {
    pub fn new(fetcher: Arc<dyn Fetch>, viewer_id: &str) -> Self {
        Self {
            fetcher,
            viewer_id: viewer_id.to_string(),
            url: None,
            document: Document::Blank,
            generation: 0,
            closed: false,
        }
    }

    fn ensure_open(&self) -> Result<(), BrowserError> {
        if self.closed {
            return Err(BrowserError::Closed("page"));
        }
        Ok(())
    }

    fn viewer_selector(&self) -> String {
        format!("#{}", self.viewer_id)
    }

    fn resolve(&self, target: &str) -> Result<Url, BrowserError> {
        let joined = match &self.url {
            Some(base) => base.join(target),
            None => Url::parse(target),
        };
        joined.map_err(|e| BrowserError::InvalidUrl(format!("{target}: {e}")))
    }

    async fn load(&mut self, url: Url) -> Result<(), BrowserError> {
        self.ensure_open()?;
        let fetched = self.fetcher.get(&url).await?;
        self.document = if looks_like_xml(fetched.content_type.as_deref(), &url) {
            Document::Xml(fetched.body)
        } else {
            Document::Html(fetched.body)
        };
        self.url = Some(url);
        self.generation += 1;
        Ok(())
    }

    fn count_matches(&self, selector: &str) -> Result<usize, BrowserError> {
        match &self.document {
            Document::Blank => Ok(0),
            Document::Xml(_) => Ok(usize::from(selector == self.viewer_selector())),
            Document::Html(source) => {
                let css = parse_selector(selector)?;
                Ok(Html::parse_document(source).select(&css).count())
            }
        }
    }

    fn snapshot(&self, handle: &ElementHandle) -> Result<Snapshot, BrowserError> {
        self.ensure_open()?;
        if handle.generation() != self.generation {
            return Err(BrowserError::StaleHandle(handle.selector().to_string()));
        }
        let missing = || BrowserError::NotFound(handle.selector().to_string());

        match &self.document {
            Document::Blank => Err(missing()),
            Document::Xml(source) => {
                if handle.selector() != self.viewer_selector() || handle.index() != 0 {
                    return Err(missing());
                }
                Ok(Snapshot {
                    tag: "div".to_string(),
                    inner_html: source.clone(),
                    text: source.clone(),
                    attrs: vec![("id".to_string(), self.viewer_id.clone())],
                    option_values: Vec::new(),
                })
            }
            Document::Html(source) => {
                let css = parse_selector(handle.selector())?;
                let doc = Html::parse_document(source);
                let element = doc.select(&css).nth(handle.index()).ok_or_else(missing)?;

                let tag = element.value().name().to_string();
                let option_values = if tag == "select" {
                    let option = parse_selector("option")?;
                    element
                        .select(&option)
                        .map(|opt| match opt.value().attr("value") {
                            Some(value) => value.to_string(),
                            None => opt.text().collect::<String>().trim().to_string(),
                        })
                        .collect()
                } else {
                    Vec::new()
                };

                Ok(Snapshot {
                    inner_html: element.inner_html(),
                    text: element.text().collect::<String>().trim().to_string(),
                    attrs: element
                        .value()
                        .attrs()
                        .map(|(key, value)| (key.to_string(), value.to_string()))
                        .collect(),
                    tag,
                    option_values,
                })
            }
        }
    }
}

fn parse_selector(selector: &str) -> Result<Selector, BrowserError> {
    Selector::parse(selector).map_err(|e| BrowserError::InvalidSelector(format!("{selector}: {e:?}")))
}

fn looks_like_xml(content_type: Option<&str>, url: &Url) -> bool {
    let declared = content_type.is_some_and(|ct| {
        let ct = ct.to_ascii_lowercase();
        ct.contains("xml") && !ct.contains("xhtml")
    });
    declared || url.path().ends_with(".xml")
}

#[async_trait]
impl Page for HttpPage {
    async fn goto(&mut self, url: &str) -> Result<(), BrowserError> {
        let url = self.resolve(url)?;
        self.load(url).await
    }

    fn url(&self) -> Option<String> {
        self.url.as_ref().map(Url::to_string)
    }

    async fn query_selector(&self, selector: &str) -> Result<Option<ElementHandle>, BrowserError> {
        self.ensure_open()?;
        let found = self.count_matches(selector)? > 0;
        Ok(found.then(|| ElementHandle::new(self.generation, selector, 0)))
    }

    async fn query_selector_all(&self, selector: &str) -> Result<Vec<ElementHandle>, BrowserError> {
        self.ensure_open()?;
        let count = self.count_matches(selector)?;
        Ok((0..count)
            .map(|index| ElementHandle::new(self.generation, selector, index))
            .collect())
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<ElementHandle, BrowserError> {
        self.ensure_open()?;
        let started = Instant::now();
        loop {
            if self.count_matches(selector)? > 0 {
                return Ok(ElementHandle::new(self.generation, selector, 0));
            }
            let waited = started.elapsed();
            if waited >= timeout {
                return Err(BrowserError::WaitTimeout {
                    selector: selector.to_string(),
                    waited,
                });
            }
            tokio::time::sleep(POLL_INTERVAL.min(timeout - waited)).await;
        }
    }

    async fn inner_html(&self, element: &ElementHandle) -> Result<String, BrowserError> {
        Ok(self.snapshot(element)?.inner_html)
    }

    async fn text(&self, element: &ElementHandle) -> Result<String, BrowserError> {
        Ok(self.snapshot(element)?.text)
    }

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, BrowserError> {
        Ok(self.snapshot(element)?.attr(name).map(str::to_string))
    }

    async fn select_option(
        &mut self,
        select: &ElementHandle,
        value: &str,
    ) -> Result<(), BrowserError> {
        let snapshot = self.snapshot(select)?;
        if snapshot.tag != "select" {
            return Err(BrowserError::Unsupported {
                selector: select.selector().to_string(),
                action: "selected from",
            });
        }
        if !snapshot.option_values.iter().any(|option| option == value) {
            return Err(BrowserError::NotFound(format!(
                "option `{value}` in `{}`",
                select.selector()
            )));
        }
        let target = self.resolve(value)?;
        self.load(target).await
    }

    async fn click(&mut self, element: &ElementHandle) -> Result<(), BrowserError> {
        let snapshot = self.snapshot(element)?;
        let Some(href) = snapshot.attr("href") else {
            return Err(BrowserError::Unsupported {
                selector: element.selector().to_string(),
                action: "clicked",
            });
        };
        let target = self.resolve(href)?;
        self.load(target).await
    }

    async fn screenshot(&self, path: &Path) -> Result<PathBuf, BrowserError> {
        let (extension, source) = match &self.document {
            Document::Blank => ("html", ""),
            Document::Html(source) => ("html", source.as_str()),
            Document::Xml(source) => ("xml", source.as_str()),
        };
        let written = path.with_extension(extension);
        if let Some(parent) = written.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&written, source).await?;
        Ok(written)
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        self.closed = true;
        Ok(())
    }
}
