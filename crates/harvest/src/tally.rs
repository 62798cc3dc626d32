use crate::browser::Page;
use crate::context::RunContext;
use crate::diagnostics;
use crate::error::{HarvestError, StepError};
use crate::xml_export::reveal_xml;
use senate_core::{Tally, VoteSummary, xml};

pub const STAGE: &str = "tally";

/// Harvests the member tallies of one vote.
///
/// On failure the page is captured and a recoverable
/// [`HarvestError::TallyHarvest`] is returned; the caller decides whether to
/// carry on.
pub async fn harvest_vote(
    ctx: &RunContext,
    page: &mut dyn Page,
    summary: &VoteSummary,
) -> Result<Vec<Tally>, HarvestError> {
    let url = ctx
        .config
        .vote_url(&summary.congress, &summary.session, &summary.vote_number);

    match tally_steps(ctx, page, summary, &url).await {
        Ok(tallies) => Ok(tallies),
        Err(source) => {
            let screenshot = diagnostics::capture(ctx, &*page, STAGE).await;
            Err(HarvestError::TallyHarvest {
                vote: summary.label(),
                url,
                screenshot,
                source,
            })
        }
    }
}

async fn tally_steps(
    ctx: &RunContext,
    page: &mut dyn Page,
    summary: &VoteSummary,
    url: &str,
) -> Result<Vec<Tally>, StepError> {
    ctx.progress(format!("loading vote page: {}", summary.label()));
    ctx.goto(page, url).await?;
    let source = reveal_xml(ctx, page).await?;
    Ok(xml::parse_member_shape(&source, summary)?)
}
