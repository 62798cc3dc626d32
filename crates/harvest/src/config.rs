use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const PLACEHOLDERS: [&str; 3] = ["{congress}", "{session}", "{vote}"];

/// Site constants and pacing for a harvest run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub landing_url: String,
    pub vote_url_template: String,
    pub session_select: String,
    pub xml_link: String,
    pub xml_viewer_id: String,
    pub page_delay_ms: u64,
    pub click_delay_ms: u64,
    pub wait_timeout_ms: u64,
    pub error_dir: PathBuf,
    pub user_agent: String,
    pub request_timeout_secs: u64,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            landing_url: "https://www.senate.gov/legislative/votes_new.htm".to_string(),
            vote_url_template: "https://www.senate.gov/legislative/LIS/roll_call_lists/roll_call_vote_cfm.cfm?congress={congress}&session={session}&vote={vote}".to_string(),
            session_select: r#"form[name="PastVotes"] select"#.to_string(),
            xml_link: r#"a[href$=".xml"]"#.to_string(),
            xml_viewer_id: "webkit-xml-viewer-source-xml".to_string(),
            page_delay_ms: 750,
            click_delay_ms: 750,
            wait_timeout_ms: 30_000,
            error_dir: PathBuf::from("./screenshots/errors"),
            user_agent: concat!("senate-votes/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("vote_url_template is missing the `{0}` placeholder")]
    MissingPlaceholder(&'static str),
}

impl HarvestConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for placeholder in PLACEHOLDERS {
            if !self.vote_url_template.contains(placeholder) {
                return Err(ConfigError::MissingPlaceholder(placeholder));
            }
        }
        Ok(())
    }

    /// Detail page of one roll-call vote.
    pub fn vote_url(&self, congress: &str, session: &str, vote_number: &str) -> String {
        self.vote_url_template
            .replace("{congress}", congress)
            .replace("{session}", session)
            .replace("{vote}", vote_number)
    }

    pub fn session_option_selector(&self) -> String {
        format!("{} option", self.session_select)
    }

    pub fn xml_viewer_selector(&self) -> String {
        format!("#{}", self.xml_viewer_id)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn click_delay(&self) -> Duration {
        Duration::from_millis(self.click_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
