use crate::browser::Page;
use crate::context::RunContext;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::macros::format_description;

pub fn file_timestamp() -> String {
    let format = format_description!(
        "[year]-[month]-[day]T[hour]-[minute]-[second].[subsecond digits:3]Z"
    );
    OffsetDateTime::now_utc().format(format).unwrap_or_default()
}

pub fn log_timestamp() -> String {
    let format = format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
    );
    OffsetDateTime::now_utc().format(format).unwrap_or_default()
}

/// `<error_dir>/<stage>/<timestamp>.png`
pub fn capture_path(error_dir: &Path, stage: &str) -> PathBuf {
    error_dir.join(stage).join(format!("{}.png", file_timestamp()))
}

/// Captures the page for a failed stage. A failed capture is logged and
/// otherwise ignored.
pub async fn capture(ctx: &RunContext, page: &dyn Page, stage: &str) -> Option<PathBuf> {
    let requested = capture_path(&ctx.config.error_dir, stage);
    match page.screenshot(&requested).await {
        Ok(path) => {
            ctx.progress(format!("screenshot stored: {}", path.display()));
            Some(path)
        }
        Err(err) => {
            tracing::warn!(stage, error = %err, "could not capture failing page");
            None
        }
    }
}
