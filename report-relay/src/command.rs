//! On-demand "today's report" command.

use crate::pipeline::ReportCache;
use crate::upstream::ArtifactRef;

/// Reply shown when no report has been rendered since startup.
pub const NO_REPORT_MESSAGE: &str = "no report yet";

/// What the command answers with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandReply {
    Image(ArtifactRef),
    Text(String),
}

/// Return the latest cached report, or a plain-text notice if there is none.
pub async fn today_report(cache: &ReportCache) -> CommandReply {
    match cache.latest().await {
        Some(artifact) => CommandReply::Image(artifact),
        None => CommandReply::Text(NO_REPORT_MESSAGE.to_string()),
    }
}
