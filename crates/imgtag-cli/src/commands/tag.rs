use chrono::Utc;
use imgtag_api_models::{TaggingRequest, UsageEntry};
use tracing::debug;

use crate::cli::{OutputFormat, TagArgs};
use crate::client::{AppContext, CliResult, tracked};
use crate::output::render_tagging;

const TAG_ENDPOINT: &str = "/api/v1/tag/";

pub(crate) async fn handle_tag(
    ctx: &AppContext,
    args: TagArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let mut request = TaggingRequest::new(args.image_url);
    if let Some(mode) = args.mode {
        request = request.with_mode(mode);
    }

    load_quota(ctx).await;

    let call = async {
        let outcome = ctx.client.tag_image_with_status(&request).await;
        let status = match &outcome {
            Ok((status, _)) => Some(*status),
            Err(err) => err.response_status(),
        };
        // Only calls that reached the server are logged.
        if let Some(status) = status {
            ctx.usage.add_item(UsageEntry {
                timestamp: Utc::now(),
                endpoint: TAG_ENDPOINT.to_string(),
                status,
                success: outcome.is_ok(),
            });
        }
        outcome
    };
    let (_, response) = tracked(
        call,
        |loading| ctx.usage.set_loading(loading),
        |error| ctx.usage.set_error(error),
    )
    .await?;
    ctx.usage.increment_usage();
    render_tagging(&response, ctx.usage.snapshot().quota, format)
}

/// Seed the quota from the usage endpoint when a session is available.
/// Tagging proceeds without it on any failure.
async fn load_quota(ctx: &AppContext) {
    if ctx.client.session_cookie().is_none() {
        return;
    }
    match ctx.client.usage().await {
        Ok(quota) => {
            ctx.usage.set_quota(quota);
            ctx.persist_session();
        }
        Err(err) => debug!(error = %err, "quota unavailable before tagging"),
    }
}
