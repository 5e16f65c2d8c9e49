use crate::cli::OutputFormat;
use crate::client::{AppContext, CliResult, tracked};
use crate::output::render_quota;

pub(crate) async fn handle_usage(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    let quota = tracked(
        ctx.client.usage(),
        |loading| ctx.usage.set_loading(loading),
        |error| ctx.usage.set_error(error),
    )
    .await?;
    ctx.usage.set_quota(quota);
    ctx.persist_session();

    match ctx.usage.snapshot().quota {
        Some(quota) => render_quota(&quota, format),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::context_for;
    use httpmock::prelude::*;
    use imgtag_api_models::QuotaSnapshot;
    use serde_json::json;

    #[tokio::test]
    async fn usage_installs_normalised_quota() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/api/v1/usage/");
            then.status(200)
                .json_body(json!({"used": 12, "limit": 10, "remaining": 5}));
        });

        let (ctx, _storage) = context_for(&server);
        handle_usage(&ctx, OutputFormat::Table)
            .await
            .expect("usage");

        mock.assert();
        let usage = ctx.usage.snapshot();
        assert_eq!(usage.quota, Some(QuotaSnapshot::new(12, 10)));
        assert_eq!(usage.quota.map(|quota| quota.remaining), Some(0));
        assert!(!usage.loading);
    }

    #[tokio::test]
    async fn server_failure_exits_with_failure_code() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/usage/");
            then.status(503).body("upstream unavailable");
        });

        let (ctx, _storage) = context_for(&server);
        let err = handle_usage(&ctx, OutputFormat::Table)
            .await
            .expect_err("unavailable");
        assert_eq!(err.exit_code(), 3);
        assert_eq!(err.display_message(), "HTTP 503");
        assert_eq!(ctx.usage.snapshot().error.as_deref(), Some("HTTP 503"));
    }
}
