use crate::browser::Page;
use crate::context::RunContext;
use crate::diagnostics;
use crate::discovery::{self, SessionOption};
use crate::error::{HarvestError, StepError};
use crate::xml_export::reveal_xml;
use senate_core::{VoteStore, VoteSummary, detect, xml};

pub const STAGE: &str = "summary";

#[derive(Debug)]
pub struct SessionHarvest {
    pub session: SessionOption,
    /// Votes listed in the session's XML before change detection.
    pub candidates: usize,
    /// Votes not yet in the store.
    pub fresh: Vec<VoteSummary>,
}

/// Harvests the session at `index` of the dropdown on a fresh page.
///
/// Any failure is fatal for the run: the page is captured and the error
/// returned. `expected` is the option discovery saw at this index; it only
/// labels errors and flags a dropdown that changed mid-run.
pub async fn harvest_session(
    ctx: &RunContext,
    page: &mut dyn Page,
    store: &dyn VoteStore,
    index: usize,
    expected: &SessionOption,
) -> Result<SessionHarvest, HarvestError> {
    match harvest_steps(ctx, page, store, index).await {
        Ok(harvest) => {
            if harvest.session.value != expected.value {
                tracing::warn!(
                    index,
                    expected = %expected.value,
                    found = %harvest.session.value,
                    "session dropdown changed since discovery"
                );
            }
            Ok(harvest)
        }
        Err(source) => {
            let screenshot = diagnostics::capture(ctx, &*page, STAGE).await;
            ctx.progress(format!("error harvesting session {}: {source}", expected.label));
            tracing::error!(session = %expected.label, error = %source, "summary harvest failed");
            Err(match source {
                StepError::Storage(err) => HarvestError::Storage(err),
                source => HarvestError::SummaryHarvest {
                    session: expected.label.clone(),
                    screenshot,
                    source,
                },
            })
        }
    }
}

async fn harvest_steps(
    ctx: &RunContext,
    page: &mut dyn Page,
    store: &dyn VoteStore,
    index: usize,
) -> Result<SessionHarvest, StepError> {
    // handles from discovery died with its page; resolve the dropdown again
    ctx.goto(page, &ctx.config.landing_url).await?;
    let discovery::SessionSelect { select, options } = discovery::session_select(ctx, &*page).await?;
    let available = options.len();
    let session = options
        .into_iter()
        .nth(index)
        .ok_or(StepError::SessionMissing { index, available })?;

    let existing = store.find_summaries_by_url(&session.value).await?;
    ctx.progress(format!(
        "session summary starting: {} ({} stored)",
        session.label,
        existing.len()
    ));

    ctx.select(page, &select, &session.value).await?;
    let source = reveal_xml(ctx, page).await?;

    let candidates = xml::parse_summary_shape(&source, &session.value)?;
    let total = candidates.len();
    let fresh = detect::filter_new_votes(candidates, &existing);
    Ok(SessionHarvest {
        session,
        candidates: total,
        fresh,
    })
}
