use crate::browser::{BrowserError, ElementHandle, Page};
use crate::config::HarvestConfig;
use crate::diagnostics;
use crate::throttle::{Action, FixedDelay, Throttle};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Receives progress lines of a verbose run.
pub trait ProgressSink: Send + Sync {
    fn message(&self, line: &str);
}

/// Progress log file, truncated when the sink is created.
pub struct LogFileSink {
    file: Mutex<File>,
}

impl LogFileSink {
    pub fn create(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl ProgressSink for LogFileSink {
    fn message(&self, line: &str) {
        let stamp = diagnostics::log_timestamp();
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "[{stamp}] ==== {line} ====");
        }
    }
}

/// Everything one run needs besides the browser and the store.
pub struct RunContext {
    pub config: HarvestConfig,
    throttle: Arc<dyn Throttle>,
    verbose: bool,
    sink: Option<Arc<dyn ProgressSink>>,
}

impl RunContext {
    pub fn new(config: HarvestConfig) -> Self {
        let throttle = Arc::new(FixedDelay::from_config(&config));
        Self {
            config,
            throttle,
            verbose: false,
            sink: None,
        }
    }

    pub fn with_throttle(mut self, throttle: Arc<dyn Throttle>) -> Self {
        self.throttle = throttle;
        self
    }

    /// Turns on verbose progress, written to `sink`.
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = Some(sink);
        self.verbose = true;
        self
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn progress(&self, msg: impl AsRef<str>) {
        let msg = msg.as_ref();
        tracing::debug!(target: "harvest::progress", "{msg}");
        if !self.verbose {
            return;
        }
        if let Some(sink) = &self.sink {
            sink.message(msg);
        }
    }

    pub async fn goto(&self, page: &mut dyn Page, url: &str) -> Result<(), BrowserError> {
        self.throttle.before(Action::Navigate).await;
        page.goto(url).await
    }

    /// Choosing a session navigates, so it is paced like a navigation.
    pub async fn select(
        &self,
        page: &mut dyn Page,
        select: &ElementHandle,
        value: &str,
    ) -> Result<(), BrowserError> {
        self.throttle.before(Action::Navigate).await;
        page.select_option(select, value).await
    }

    pub async fn click(&self, page: &mut dyn Page, element: &ElementHandle) -> Result<(), BrowserError> {
        self.throttle.before(Action::Click).await;
        page.click(element).await
    }
}
