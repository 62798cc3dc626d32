use crate::config::HarvestConfig;
use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Navigate,
    Click,
}

/// Paces browser actions so the site is not hammered.
#[async_trait]
pub trait Throttle: Send + Sync {
    /// Called immediately before `action` runs.
    async fn before(&self, action: Action);
}

/// Sleeps a fixed time before every action, one delay per action kind.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    navigate: Duration,
    click: Duration,
}

impl FixedDelay {
    pub fn new(navigate: Duration, click: Duration) -> Self {
        Self { navigate, click }
    }

    pub fn from_config(config: &HarvestConfig) -> Self {
        Self::new(config.page_delay(), config.click_delay())
    }

    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn delay_for(&self, action: Action) -> Duration {
        match action {
            Action::Navigate => self.navigate,
            Action::Click => self.click,
        }
    }
}

#[async_trait]
impl Throttle for FixedDelay {
    async fn before(&self, action: Action) {
        let delay = self.delay_for(action);
        if delay.is_zero() {
            return;
        }
        tracing::trace!(?action, ?delay, "throttling");
        tokio::time::sleep(delay).await;
    }
}
