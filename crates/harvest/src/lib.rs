pub mod browser;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod discovery;
pub mod error;
pub mod http;
pub mod pipeline;
pub mod summary;
pub mod tally;
pub mod throttle;
mod xml_export;

pub use browser::{Browser, BrowserContext, BrowserError, ElementHandle, Launch, Page};
pub use config::{ConfigError, HarvestConfig};
pub use context::{LogFileSink, ProgressSink, RunContext};
pub use error::{HarvestError, StepError};
pub use http::HttpLauncher;
pub use pipeline::{FailedVote, Pipeline, RunOptions, RunReport, RunResult};
