use crate::cli::{KeysCreateArgs, KeysRevokeArgs, OutputFormat};
use crate::client::{AppContext, CliResult, tracked};
use crate::output::{render_key_list, render_key_secret};

pub(crate) async fn handle_keys_list(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    let keys = tracked(
        ctx.client.list_api_keys(),
        |loading| ctx.api_keys.set_loading(loading),
        |error| ctx.api_keys.set_error(error),
    )
    .await?;
    let active_id = ctx.auth.api_key().and_then(|raw| {
        keys.iter()
            .find(|summary| summary.matches_raw_key(&raw))
            .map(|summary| summary.id)
    });
    ctx.api_keys.set_list(keys);
    ctx.api_keys.select(active_id);
    ctx.persist_session();

    let snapshot = ctx.api_keys.snapshot();
    render_key_list(&snapshot.items, snapshot.selected_id, format)
}

pub(crate) async fn handle_keys_create(
    ctx: &AppContext,
    args: KeysCreateArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let secret = tracked(
        ctx.client.create_api_key(),
        |loading| ctx.api_keys.set_loading(loading),
        |error| ctx.api_keys.set_error(error),
    )
    .await?;
    ctx.api_keys.add_item(secret.summary());
    if args.adopt {
        ctx.auth.authenticate(secret.key.as_str(), secret.info());
    }
    ctx.persist_session();
    render_key_secret(&secret, args.adopt, format)
}

pub(crate) async fn handle_keys_revoke(ctx: &AppContext, args: KeysRevokeArgs) -> CliResult<()> {
    tracked(
        ctx.client.revoke_api_key(args.id),
        |loading| ctx.api_keys.set_loading(loading),
        |error| ctx.api_keys.set_error(error),
    )
    .await?;
    ctx.api_keys.remove_item(args.id);
    ctx.persist_session();
    println!("Revoked API key {}.", args.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::context_for;
    use httpmock::prelude::*;
    use imgtag_store::{CredentialStorage, STORAGE_KEY_API_KEY};
    use serde_json::json;

    const RAW_KEY: &str = "tk_live_feedfacecafebeef";

    #[tokio::test]
    async fn create_with_use_adopts_key() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST).path("/api/v1/keys/");
            then.status(201).json_body(json!({
                "id": 11,
                "key": RAW_KEY,
                "masked_key": "tk_live_****beef",
                "created_at": "2025-03-01T08:00:00Z"
            }));
        });

        let (ctx, storage) = context_for(&server);
        handle_keys_create(&ctx, KeysCreateArgs { adopt: true }, OutputFormat::Json)
            .await
            .expect("create key");

        mock.assert();
        let keys = ctx.api_keys.snapshot();
        assert_eq!(keys.items.len(), 1);
        assert_eq!(keys.items[0].id, 11);
        assert_eq!(ctx.auth.api_key().as_deref(), Some(RAW_KEY));
        assert_eq!(
            storage.get(STORAGE_KEY_API_KEY).expect("read").as_deref(),
            Some(RAW_KEY)
        );
    }

    #[tokio::test]
    async fn create_without_use_leaves_credential_alone() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/api/v1/keys/");
            then.status(201).json_body(json!({
                "id": 12,
                "key": RAW_KEY,
                "masked_key": "tk_live_****beef",
                "created_at": "2025-03-01T08:00:00Z"
            }));
        });

        let (ctx, _storage) = context_for(&server);
        handle_keys_create(&ctx, KeysCreateArgs { adopt: false }, OutputFormat::Table)
            .await
            .expect("create key");
        assert_eq!(ctx.auth.api_key(), None);
    }

    #[tokio::test]
    async fn list_then_revoke_updates_container() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/keys/");
            then.status(200).json_body(json!([
                {"id": 1, "masked_key": "tk_live_****aaaa", "created_at": "2025-01-01T00:00:00Z", "last_used_at": null}
            ]));
        });
        let revoke = server.mock(|when, then| {
            when.method(DELETE).path("/api/v1/keys/1/");
            then.status(204);
        });

        let (ctx, _storage) = context_for(&server);
        handle_keys_list(&ctx, OutputFormat::Table)
            .await
            .expect("list keys");
        ctx.api_keys.select(Some(1));
        assert_eq!(ctx.api_keys.snapshot().items.len(), 1);

        handle_keys_revoke(&ctx, KeysRevokeArgs { id: 1 })
            .await
            .expect("revoke");
        revoke.assert();
        let snapshot = ctx.api_keys.snapshot();
        assert!(snapshot.items.is_empty());
        assert_eq!(snapshot.selected_id, None);
    }

    #[tokio::test]
    async fn listing_selects_the_active_key() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/keys/");
            then.status(200).json_body(json!([
                {"id": 1, "masked_key": "tk_live_****aaaa", "created_at": "2025-01-01T00:00:00Z", "last_used_at": null},
                {"id": 2, "masked_key": "tk_live_****beef", "created_at": "2025-01-02T00:00:00Z", "last_used_at": null}
            ]));
        });

        let (ctx, _storage) = context_for(&server);
        ctx.auth
            .authenticate(RAW_KEY, imgtag_api_models::ApiKeyInfo::from_raw_key(RAW_KEY));
        assert_ne!(
            ctx.auth.snapshot().key_info.clone().map(|info| info.masked_key),
            Some("tk_live_****beef".to_string())
        );

        handle_keys_list(&ctx, OutputFormat::Table)
            .await
            .expect("list keys");
        assert_eq!(ctx.api_keys.snapshot().selected_id, Some(2));
    }

    #[tokio::test]
    async fn listing_without_active_key_selects_nothing() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/keys/");
            then.status(200).json_body(json!([
                {"id": 2, "masked_key": "tk_live_****beef", "created_at": "2025-01-02T00:00:00Z", "last_used_at": null}
            ]));
        });

        let (ctx, _storage) = context_for(&server);
        handle_keys_list(&ctx, OutputFormat::Json)
            .await
            .expect("list keys");
        assert_eq!(ctx.api_keys.snapshot().selected_id, None);
    }

    #[tokio::test]
    async fn unauthenticated_listing_records_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/keys/");
            then.status(403)
                .json_body(json!({"detail": "Authentication credentials were not provided."}));
        });

        let (ctx, _storage) = context_for(&server);
        let err = handle_keys_list(&ctx, OutputFormat::Table)
            .await
            .expect_err("forbidden");
        assert_eq!(err.exit_code(), 2);
        assert_eq!(
            ctx.api_keys.snapshot().error.as_deref(),
            Some("Authentication credentials were not provided.")
        );
    }
}
