use crate::browser::Page;
use crate::context::RunContext;
use crate::error::StepError;

/// Follows the page's XML export link and returns the revealed XML source.
pub(crate) async fn reveal_xml(ctx: &RunContext, page: &mut dyn Page) -> Result<String, StepError> {
    let config = &ctx.config;
    let link = page
        .query_selector(&config.xml_link)
        .await?
        .ok_or_else(|| StepError::MissingElement(config.xml_link.clone()))?;
    ctx.click(page, &link).await?;

    // the viewer element is hidden, so wait on presence rather than visibility
    let viewer = page
        .wait_for_selector(&config.xml_viewer_selector(), config.wait_timeout())
        .await?;
    Ok(page.inner_html(&viewer).await?)
}
