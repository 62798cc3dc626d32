use crate::browser::{Browser, BrowserContext, BrowserError, Launch};
use crate::context::RunContext;
use crate::discovery::{self, SessionOption};
use crate::error::HarvestError;
use crate::{summary, tally};
use senate_core::VoteStore;
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Wipe both tables before harvesting.
    pub clear_db: bool,
}

#[derive(Debug, Clone)]
pub struct FailedVote {
    pub vote: String,
    pub url: String,
    pub reason: String,
    pub screenshot: Option<PathBuf>,
}

/// Completion payload of a successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub message: &'static str,
    pub sessions: usize,
    pub summaries_inserted: usize,
    /// Summaries in the store when the tally phase started.
    pub summaries_total: usize,
    pub tallies_inserted: usize,
    pub failed_votes: Vec<FailedVote>,
    pub tally_elapsed: Duration,
}

impl RunReport {
    fn new(sessions: usize) -> Self {
        Self {
            message: "completed",
            sessions,
            summaries_inserted: 0,
            summaries_total: 0,
            tallies_inserted: 0,
            failed_votes: Vec::new(),
            tally_elapsed: Duration::ZERO,
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} sessions, {} new summaries ({} total), {} tallies in {}ms",
            self.message,
            self.sessions,
            self.summaries_inserted,
            self.summaries_total,
            self.tallies_inserted,
            self.tally_elapsed.as_millis()
        )?;
        if !self.failed_votes.is_empty() {
            write!(f, ", {} votes skipped", self.failed_votes.len())?;
        }
        Ok(())
    }
}

pub type RunResult = Result<RunReport, HarvestError>;

/// Discovery, then summaries per session, then tallies per stored summary,
/// writing through to the store after every item.
pub struct Pipeline<'a> {
    ctx: &'a RunContext,
    store: &'a dyn VoteStore,
}

impl<'a> Pipeline<'a> {
    pub fn new(ctx: &'a RunContext, store: &'a dyn VoteStore) -> Self {
        Self { ctx, store }
    }

    pub async fn run(&self, launcher: &dyn Launch, options: RunOptions) -> RunResult {
        let result = self.run_inner(launcher, options).await;
        match &result {
            Ok(report) => {
                self.ctx.progress(format!("run ending: {report}"));
                tracing::info!(%report, "harvest finished");
            }
            Err(err) => {
                self.ctx.progress(format!("run error: {err}"));
                tracing::error!(error = %err, "harvest failed");
            }
        }
        result
    }

    async fn run_inner(&self, launcher: &dyn Launch, options: RunOptions) -> RunResult {
        if options.clear_db {
            self.store.clear().await?;
        }
        self.ctx.progress("run started");

        let browser = launcher.launch().await?;
        let outcome = self.drive(browser.as_ref()).await;
        close_quietly("browser", browser.close().await);
        outcome
    }

    async fn drive(&self, browser: &dyn Browser) -> RunResult {
        let sessions = self.discover(browser).await?;
        let mut report = RunReport::new(sessions.len());

        let context = browser.new_context().await?;
        let summaries = self.harvest_summaries(context.as_ref(), &sessions, &mut report).await;
        close_quietly("summary context", context.close().await);
        summaries?;

        let context = browser.new_context().await?;
        let tallies = self.harvest_tallies(context.as_ref(), &mut report).await;
        close_quietly("tally context", context.close().await);
        tallies?;

        Ok(report)
    }

    async fn discover(&self, browser: &dyn Browser) -> Result<Vec<SessionOption>, HarvestError> {
        let mut page = browser.new_page().await?;
        let sessions = discovery::discover_sessions(self.ctx, page.as_mut()).await;
        close_quietly("discovery page", page.close().await);
        sessions
    }

    async fn harvest_summaries(
        &self,
        context: &dyn BrowserContext,
        sessions: &[SessionOption],
        report: &mut RunReport,
    ) -> Result<(), HarvestError> {
        for (index, expected) in sessions.iter().enumerate() {
            let mut page = context.new_page().await?;
            let harvested =
                summary::harvest_session(self.ctx, page.as_mut(), self.store, index, expected).await;
            close_quietly("summary page", page.close().await);
            let harvested = harvested?;

            self.ctx.progress(format!(
                "writing {} of {} summaries for {}",
                harvested.fresh.len(),
                harvested.candidates,
                harvested.session.label
            ));
            report.summaries_inserted += self.store.insert_many_summaries(&harvested.fresh).await?;
            self.ctx
                .progress(format!("session summary ending: {}", harvested.session.label));
        }
        Ok(())
    }

    async fn harvest_tallies(
        &self,
        context: &dyn BrowserContext,
        report: &mut RunReport,
    ) -> Result<(), HarvestError> {
        self.ctx.progress("creating tallies");
        let summaries = self.store.find_all_summaries().await?;
        report.summaries_total = summaries.len();
        self.ctx.progress(format!("# of summaries: {}", summaries.len()));

        let started = Instant::now();
        for summary in &summaries {
            let mut page = context.new_page().await?;
            let harvested = tally::harvest_vote(self.ctx, page.as_mut(), summary).await;
            close_quietly("tally page", page.close().await);

            let tallies = match harvested {
                Ok(tallies) => tallies,
                Err(err) if err.is_recoverable() => {
                    tracing::warn!(vote = %summary.label(), error = %err, "skipping vote");
                    self.ctx.progress(format!("error harvesting vote: {err}"));
                    report.failed_votes.push(failed_vote(err));
                    Vec::new()
                }
                Err(err) => return Err(err),
            };

            if self.ctx.is_verbose() {
                let json = serde_json::to_string(&tallies).unwrap_or_default();
                self.ctx.progress(format!("vote results: {json}"));
            }
            report.tallies_inserted += self.store.insert_many_tallies(&tallies).await?;
        }
        report.tally_elapsed = started.elapsed();
        self.ctx.progress(format!(
            "took {}ms to create tallies",
            report.tally_elapsed.as_millis()
        ));
        Ok(())
    }
}

fn failed_vote(err: HarvestError) -> FailedVote {
    let reason = err.to_string();
    match err {
        HarvestError::TallyHarvest {
            vote,
            url,
            screenshot,
            ..
        } => FailedVote {
            vote,
            url,
            reason,
            screenshot,
        },
        _ => FailedVote {
            vote: String::new(),
            url: String::new(),
            reason,
            screenshot: None,
        },
    }
}

fn close_quietly(what: &str, result: Result<(), BrowserError>) {
    if let Err(err) = result {
        tracing::warn!(what, error = %err, "close failed");
    }
}
