use crate::browser::BrowserError;
use senate_core::StoreError;
use senate_core::xml::ParseError;
use std::path::PathBuf;
use thiserror::Error;

/// Why a single harvest step failed.
#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Browser(#[from] BrowserError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Storage(#[from] StoreError),
    #[error("session option {index} is gone; the dropdown now lists {available}")]
    SessionMissing { index: usize, available: usize },
    #[error("no element matches `{0}`")]
    MissingElement(String),
}

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("session discovery failed: {source}")]
    Discovery {
        #[source]
        source: BrowserError,
    },
    #[error("summary harvest failed for session `{session}`: {source}")]
    SummaryHarvest {
        session: String,
        screenshot: Option<PathBuf>,
        #[source]
        source: StepError,
    },
    #[error("tally harvest failed for {vote}: {source}")]
    TallyHarvest {
        vote: String,
        url: String,
        screenshot: Option<PathBuf>,
        #[source]
        source: StepError,
    },
    #[error(transparent)]
    Storage(#[from] StoreError),
    #[error(transparent)]
    Browser(#[from] BrowserError),
}

impl HarvestError {
    /// Only a single vote's tallies may be given up on; everything else
    /// ends the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, HarvestError::TallyHarvest { .. })
    }

    pub fn screenshot(&self) -> Option<&PathBuf> {
        match self {
            HarvestError::SummaryHarvest { screenshot, .. }
            | HarvestError::TallyHarvest { screenshot, .. } => screenshot.as_ref(),
            _ => None,
        }
    }
}
