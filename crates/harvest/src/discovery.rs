use crate::browser::{BrowserError, ElementHandle, Page};
use crate::context::RunContext;
use crate::error::HarvestError;

/// One entry of the past-votes dropdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOption {
    /// Opaque selector value; becomes `VoteSummary::url`.
    pub value: String,
    pub label: String,
}

pub(crate) struct SessionSelect {
    pub select: ElementHandle,
    pub options: Vec<SessionOption>,
}

/// Reads the dropdown off the page's current document. The first option is
/// the "Select Session" placeholder and is skipped.
pub(crate) async fn session_select(
    ctx: &RunContext,
    page: &dyn Page,
) -> Result<SessionSelect, BrowserError> {
    let config = &ctx.config;
    let select = page
        .wait_for_selector(&config.session_select, config.wait_timeout())
        .await?;

    let handles = page
        .query_selector_all(&config.session_option_selector())
        .await?;
    let mut options = Vec::with_capacity(handles.len().saturating_sub(1));
    for handle in handles.iter().skip(1) {
        let label = page.text(handle).await?;
        let value = match page.attribute(handle, "value").await? {
            Some(value) => value,
            None => label.clone(),
        };
        options.push(SessionOption { value, label });
    }
    Ok(SessionSelect { select, options })
}

/// Lists the past-vote sessions offered on the landing page.
pub async fn discover_sessions(
    ctx: &RunContext,
    page: &mut dyn Page,
) -> Result<Vec<SessionOption>, HarvestError> {
    ctx.goto(page, &ctx.config.landing_url)
        .await
        .map_err(|source| HarvestError::Discovery { source })?;
    let found = session_select(ctx, &*page)
        .await
        .map_err(|source| HarvestError::Discovery { source })?;

    ctx.progress(format!("discovered {} sessions", found.options.len()));
    Ok(found.options)
}
