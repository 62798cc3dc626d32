#![allow(dead_code)]

use async_trait::async_trait;
use harvest::http::{Fetch, Fetched, HttpBrowser};
use harvest::{Browser, BrowserContext, BrowserError, HarvestConfig, Launch, Page, ProgressSink};
use reqwest::Url;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub const ORIGIN: &str = "https://senate.test";
pub const VIEWER: &str = "webkit-xml-viewer-source-xml";

pub fn config(error_dir: &Path) -> HarvestConfig {
    HarvestConfig {
        landing_url: format!("{ORIGIN}/votes_new.htm"),
        vote_url_template: format!("{ORIGIN}/votes/{{congress}}-{{session}}-{{vote}}.htm"),
        page_delay_ms: 0,
        click_delay_ms: 0,
        wait_timeout_ms: 50,
        error_dir: error_dir.to_path_buf(),
        ..HarvestConfig::default()
    }
}

pub struct Session {
    pub congress: &'static str,
    pub session: &'static str,
    pub year: &'static str,
    pub votes: Vec<&'static str>,
}

impl Session {
    pub fn new(congress: &'static str, session: &'static str, year: &'static str, votes: &[&'static str]) -> Self {
        Self {
            congress,
            session,
            year,
            votes: votes.to_vec(),
        }
    }

    pub fn value(&self) -> String {
        format!("/menu_{}_{}.htm", self.congress, self.session)
    }

    pub fn label(&self) -> String {
        format!("{} Congress, Session {}", self.congress, self.session)
    }
}

/// In-memory site shaped like the vote pages: a landing dropdown, one menu
/// page per session with an XML export link, one detail page per vote.
#[derive(Default)]
pub struct StaticSite {
    pages: Mutex<HashMap<String, String>>,
    failing: Mutex<HashSet<String>>,
    hits: Mutex<Vec<String>>,
}

impl StaticSite {
    pub fn with_sessions(sessions: &[Session]) -> Arc<Self> {
        let site = Arc::new(Self::default());
        site.publish(sessions);
        site
    }

    /// Replaces the landing page and (re)publishes every session's pages.
    pub fn publish(&self, sessions: &[Session]) {
        let options: String = sessions
            .iter()
            .map(|s| format!(r#"<option value="{}">{}</option>"#, s.value(), s.label()))
            .collect();
        self.put(
            "/votes_new.htm",
            &format!(
                r#"<html><body><form name="PastVotes"><select name="menu">
                   <option value="">Select Session</option>{options}
                   </select></form></body></html>"#
            ),
        );

        for s in sessions {
            let xml_path = format!("/menu_{}_{}.xml", s.congress, s.session);
            self.put(
                &s.value(),
                &format!(r#"<html><body><a href="{xml_path}">XML</a></body></html>"#),
            );
            self.put(&xml_path, &summary_xml(s));

            for vote in &s.votes {
                let stem = format!("/votes/{}-{}-{vote}", s.congress, s.session);
                self.put(
                    &format!("{stem}.htm"),
                    &format!(r#"<html><body><a href="{stem}.xml">XML</a></body></html>"#),
                );
                self.put(&format!("{stem}.xml"), &member_xml(s, vote));
            }
        }
    }

    pub fn put(&self, path: &str, body: &str) {
        self.pages
            .lock()
            .unwrap()
            .insert(format!("{ORIGIN}{path}"), body.to_string());
    }

    /// Makes `path` answer with a server error.
    pub fn fail(&self, path: &str) {
        self.failing.lock().unwrap().insert(format!("{ORIGIN}{path}"));
    }

    pub fn hits(&self) -> Vec<String> {
        self.hits.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetch for StaticSite {
    async fn get(&self, url: &Url) -> Result<Fetched, BrowserError> {
        let key = url.as_str().to_string();
        self.hits.lock().unwrap().push(key.clone());
        if self.failing.lock().unwrap().contains(&key) {
            return Err(BrowserError::Status { url: key, status: 500 });
        }
        match self.pages.lock().unwrap().get(&key) {
            Some(body) => Ok(Fetched {
                body: body.clone(),
                content_type: None,
            }),
            None => Err(BrowserError::Status { url: key, status: 404 }),
        }
    }
}

fn summary_xml(s: &Session) -> String {
    let votes: String = s
        .votes
        .iter()
        .map(|vote| {
            format!(
                "<vote><vote_number>{vote}</vote_number><vote_date>01-Mar</vote_date>\
                 <issue><A HREF=\"/bill\">S. {vote}</A></issue>\
                 <title>Vote {vote} of {}</title></vote>",
                s.session
            )
        })
        .collect();
    format!(
        "<?xml version=\"1.0\"?><vote_summary><congress>{}</congress><session>{}</session>\
         <congress_year>{}</congress_year><votes>{votes}</votes></vote_summary>",
        s.congress, s.session, s.year
    )
}

fn member_xml(s: &Session, vote: &str) -> String {
    format!(
        "<?xml version=\"1.0\"?><roll_call_vote><congress>{}</congress><vote_number>{vote}</vote_number>\
         <members>\
         <member><first_name>Jane</first_name><last_name>Doe</last_name><party>D</party><state>CA</state><vote_cast>Yea</vote_cast></member>\
         <member><first_name>John</first_name><last_name>Roe</last_name><party>R</party><state>TX</state><vote_cast>Nay</vote_cast></member>\
         </members></roll_call_vote>",
        s.congress
    )
}

/// Launches [`HttpBrowser`]s over a [`StaticSite`] and remembers whether the
/// last one was closed.
pub struct SiteLauncher {
    site: Arc<StaticSite>,
    closed: Arc<AtomicBool>,
    launches: Mutex<usize>,
}

impl SiteLauncher {
    pub fn new(site: Arc<StaticSite>) -> Self {
        Self {
            site,
            closed: Arc::new(AtomicBool::new(false)),
            launches: Mutex::new(0),
        }
    }

    pub fn browser_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn launches(&self) -> usize {
        *self.launches.lock().unwrap()
    }
}

#[async_trait]
impl Launch for SiteLauncher {
    async fn launch(&self) -> Result<Box<dyn Browser>, BrowserError> {
        *self.launches.lock().unwrap() += 1;
        self.closed.store(false, Ordering::SeqCst);
        Ok(Box::new(TrackedBrowser {
            inner: HttpBrowser::new(self.site.clone(), VIEWER),
            closed: self.closed.clone(),
        }))
    }
}

struct TrackedBrowser {
    inner: HttpBrowser,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Browser for TrackedBrowser {
    async fn new_page(&self) -> Result<Box<dyn Page>, BrowserError> {
        self.inner.new_page().await
    }

    async fn new_context(&self) -> Result<Box<dyn BrowserContext>, BrowserError> {
        self.inner.new_context().await
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.closed.store(true, Ordering::SeqCst);
        self.inner.close().await
    }
}

#[derive(Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl ProgressSink for MemorySink {
    fn message(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }
}

pub fn files_under(dir: &Path) -> Vec<std::path::PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            files.extend(files_under(&path));
        } else {
            files.push(path);
        }
    }
    files
}
