use std::io::{self, IsTerminal};

use anyhow::anyhow;
use imgtag_api_models::{ApiKeyInfo, mask_key};
use tracing::warn;

use crate::cli::{CredentialsArgs, ENV_PASSWORD, OutputFormat, UseKeyArgs};
use crate::client::{AppContext, CliError, CliResult, tracked};
use crate::output::{render_auth_status, render_user};

pub(crate) async fn handle_register(
    ctx: &AppContext,
    args: CredentialsArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let password = resolve_password(args.password)?;
    let user = tracked(
        ctx.client.register(&args.email, &password),
        |loading| ctx.auth.set_loading(loading),
        |error| ctx.auth.set_error(error),
    )
    .await?;
    ctx.auth.sign_in(user.clone());
    ctx.persist_session();
    render_user(&user, format)
}

pub(crate) async fn handle_login(
    ctx: &AppContext,
    args: CredentialsArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let password = resolve_password(args.password)?;
    let user = tracked(
        ctx.client.login(&args.email, &password),
        |loading| ctx.auth.set_loading(loading),
        |error| ctx.auth.set_error(error),
    )
    .await?;
    ctx.auth.sign_in(user.clone());
    ctx.persist_session();
    render_user(&user, format)
}

/// Server logout is best effort; local credentials are always cleared.
pub(crate) async fn handle_logout(ctx: &AppContext) -> CliResult<()> {
    if let Err(err) = ctx.client.logout().await {
        warn!(error = %err, "server logout failed; clearing local credentials");
    }
    ctx.auth.logout();
    ctx.api_keys.reset();
    ctx.usage.reset();
    println!("Signed out.");
    Ok(())
}

pub(crate) async fn handle_whoami(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    let user = tracked(
        ctx.client.me(),
        |loading| ctx.auth.set_loading(loading),
        |error| ctx.auth.set_error(error),
    )
    .await?;
    ctx.auth.sign_in(user.clone());
    ctx.persist_session();
    render_user(&user, format)
}

pub(crate) async fn handle_use_key(ctx: &AppContext, args: UseKeyArgs) -> CliResult<()> {
    let key = args.key.trim().to_string();
    if key.is_empty() {
        return Err(CliError::validation("API key cannot be empty"));
    }
    tracked(
        ctx.client.validate_api_key(&key),
        |loading| ctx.auth.set_loading(loading),
        |error| ctx.auth.set_error(error),
    )
    .await?;
    ctx.auth.authenticate(key.as_str(), ApiKeyInfo::from_raw_key(&key));
    println!("Using API key {}.", mask_key(&key));
    Ok(())
}

pub(crate) fn handle_auth_status(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    ctx.auth.restore_session();
    render_auth_status(
        &ctx.auth.snapshot(),
        ctx.config.base_url.as_str(),
        ctx.config.state_path.display().to_string(),
        ctx.auth.stored_session().is_some(),
        format,
    )
}

fn resolve_password(provided: Option<String>) -> CliResult<String> {
    if let Some(password) = provided.filter(|value| !value.is_empty()) {
        return Ok(password);
    }
    if !io::stdin().is_terminal() {
        return Err(CliError::validation(format!(
            "password is required (pass --password or set {ENV_PASSWORD})"
        )));
    }
    let password = rpassword::prompt_password("Password: ")
        .map_err(|err| CliError::failure(anyhow!("failed to read password from stdin: {err}")))?;
    if password.is_empty() {
        return Err(CliError::validation("password cannot be empty"));
    }
    Ok(password)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::{context_for, context_with};
    use httpmock::prelude::*;
    use imgtag_store::{CredentialStorage, STORAGE_KEY_API_KEY, STORAGE_KEY_SESSION};
    use serde_json::json;

    fn user_json() -> serde_json::Value {
        json!({"id": 9, "email": "ada@example.com", "created_at": "2025-02-01T10:00:00Z"})
    }

    fn credentials() -> CredentialsArgs {
        CredentialsArgs {
            email: "ada@example.com".to_string(),
            password: Some("pw-123456".to_string()),
        }
    }

    #[tokio::test]
    async fn login_signs_in_and_persists_session() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST).path("/api/v1/auth/login/").json_body(json!({
                "email": "ada@example.com",
                "password": "pw-123456"
            }));
            then.status(200)
                .header("set-cookie", "sessionid=s3ss10n; Path=/")
                .json_body(user_json());
        });

        let (ctx, storage) = context_for(&server);
        handle_login(&ctx, credentials(), OutputFormat::Table)
            .await
            .expect("login");

        mock.assert();
        let snapshot = ctx.auth.snapshot();
        assert!(snapshot.authenticated);
        assert_eq!(snapshot.user.as_ref().map(|user| user.id), Some(9));
        let stored = storage
            .get(STORAGE_KEY_SESSION)
            .expect("storage read")
            .expect("session stored");
        assert!(stored.contains("sessionid=s3ss10n"));
    }

    #[tokio::test]
    async fn login_failure_is_validation_and_recorded() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/api/v1/auth/login/");
            then.status(400)
                .json_body(json!({"non_field_errors": ["Invalid email or password."]}));
        });

        let (ctx, _storage) = context_for(&server);
        let err = handle_login(&ctx, credentials(), OutputFormat::Table)
            .await
            .expect_err("login should fail");
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.display_message(), "Invalid email or password.");
        let snapshot = ctx.auth.snapshot();
        assert!(!snapshot.authenticated);
        assert!(!snapshot.loading);
        assert_eq!(snapshot.error.as_deref(), Some("Invalid email or password."));
    }

    #[tokio::test]
    async fn use_key_validates_then_persists() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v1/health/")
                .header("authorization", "Api-Key tk_live_abcdefghijkl");
            then.status(200).json_body(json!({"status": "ok"}));
        });

        let (ctx, storage) = context_for(&server);
        handle_use_key(
            &ctx,
            UseKeyArgs {
                key: " tk_live_abcdefghijkl ".to_string(),
            },
        )
        .await
        .expect("use key");

        mock.assert();
        assert_eq!(ctx.auth.api_key().as_deref(), Some("tk_live_abcdefghijkl"));
        assert_eq!(
            storage.get(STORAGE_KEY_API_KEY).expect("read").as_deref(),
            Some("tk_live_abcdefghijkl")
        );

        let reloaded = context_with(&server, storage);
        assert!(reloaded.auth.snapshot().authenticated);
        assert_eq!(reloaded.auth.api_key().as_deref(), Some("tk_live_abcdefghijkl"));
    }

    #[tokio::test]
    async fn use_key_rejected_key_is_not_stored() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/health/");
            then.status(401).json_body(json!({"detail": "Invalid API key."}));
        });

        let (ctx, storage) = context_for(&server);
        let err = handle_use_key(
            &ctx,
            UseKeyArgs {
                key: "revoked-key".to_string(),
            },
        )
        .await
        .expect_err("rejected key");
        assert_eq!(err.display_message(), "invalid credential");
        assert_eq!(ctx.auth.snapshot().error.as_deref(), Some("invalid credential"));
        assert_eq!(storage.get(STORAGE_KEY_API_KEY).expect("read"), None);
    }

    #[tokio::test]
    async fn logout_clears_local_state_even_when_server_fails() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/api/v1/auth/logout/");
            then.status(500);
        });

        let (ctx, storage) = context_for(&server);
        storage
            .set(STORAGE_KEY_SESSION, "sessionid=old")
            .expect("seed session");
        ctx.auth
            .authenticate("tk_live_abcdefghijkl", ApiKeyInfo::from_raw_key("tk_live_abcdefghijkl"));

        handle_logout(&ctx).await.expect("logout");

        assert!(!ctx.auth.snapshot().authenticated);
        assert_eq!(storage.get(STORAGE_KEY_API_KEY).expect("read"), None);
        assert_eq!(storage.get(STORAGE_KEY_SESSION).expect("read"), None);

        let reloaded = context_with(&server, storage);
        assert!(!reloaded.auth.snapshot().authenticated);
    }

    #[test]
    fn explicit_password_is_used_verbatim() {
        let password = resolve_password(Some("secret pass".to_string())).expect("password");
        assert_eq!(password, "secret pass");
    }
}
