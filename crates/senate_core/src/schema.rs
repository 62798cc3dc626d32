use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Metadata for one roll-call vote, as listed on a session's summary page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VoteSummary {
    pub congress: String,
    pub congress_year: String,
    pub issue: String,       // "" when the vote carries no issue
    pub session: String,
    pub title: String,
    pub vote_number: String, // zero-padded on the site, e.g. "00042"
    pub vote_date: String,
    pub url: String,         // selector value of the session it was harvested from
}

/// One member's recorded vote on a roll-call vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Tally {
    pub issue: String,
    pub name: String,
    pub party: String,
    pub state: String,
    pub title: String,
    pub vote_cast: String,
}

impl VoteSummary {
    /// Short human label used in progress lines and error messages.
    pub fn label(&self) -> String {
        format!("{}-{} vote {}", self.congress, self.session, self.vote_number)
    }
}
