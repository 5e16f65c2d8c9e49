//! Output renderers for CLI commands.

use anyhow::anyhow;
use imgtag_api_models::{
    ApiKeyId, ApiKeySecret, ApiKeySummary, QuotaSnapshot, TaggingResponse, User,
    format_timestamp,
};
use imgtag_store::AuthState;
use serde::Serialize;
use serde_json::Value;

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}

pub(crate) fn render_user(user: &User, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(user)?,
        OutputFormat::Table => {
            println!("id: {}", user.id);
            println!("email: {}", user.email);
            println!("joined: {}", format_timestamp(Some(&user.created_at)));
        }
    }
    Ok(())
}

pub(crate) fn render_key_list(
    keys: &[ApiKeySummary],
    active_id: Option<ApiKeyId>,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(keys)?,
        OutputFormat::Table => {
            if keys.is_empty() {
                println!("No API keys yet. Create one with `imgtag keys create`.");
                return Ok(());
            }
            println!(
                "{:>6} {:<20} {:<22} {:<22} ",
                "ID", "KEY", "CREATED", "LAST USED"
            );
            for key in keys {
                let marker = if active_id == Some(key.id) {
                    "*"
                } else {
                    ""
                };
                println!(
                    "{:>6} {:<20} {:<22} {:<22} {marker}",
                    key.id,
                    key.masked_key,
                    format_timestamp(Some(&key.created_at)),
                    format_timestamp(key.last_used_at.as_ref()),
                );
            }
        }
    }
    Ok(())
}

pub(crate) fn render_key_secret(
    secret: &ApiKeySecret,
    adopted: bool,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(secret)?,
        OutputFormat::Table => {
            println!("id: {}", secret.id);
            println!("key: {}", secret.key);
            println!("created: {}", format_timestamp(Some(&secret.created_at)));
            println!("Store this key now; it will not be shown again.");
            if adopted {
                println!("Key adopted as the active credential.");
            }
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct AuthStatusView<'a> {
    api_url: &'a str,
    state_path: String,
    authenticated: bool,
    masked_key: Option<&'a str>,
    session_stored: bool,
}

pub(crate) fn render_auth_status(
    state: &AuthState,
    api_url: &str,
    state_path: String,
    session_stored: bool,
    format: OutputFormat,
) -> CliResult<()> {
    let view = AuthStatusView {
        api_url,
        state_path,
        authenticated: state.authenticated,
        masked_key: state.key_info.as_ref().map(|info| info.masked_key.as_str()),
        session_stored,
    };
    match format {
        OutputFormat::Json => print_json(&view)?,
        OutputFormat::Table => {
            println!("api: {}", view.api_url);
            println!("state: {}", view.state_path);
            println!("authenticated: {}", view.authenticated);
            println!("api key: {}", view.masked_key.unwrap_or("<none>"));
            println!("session: {}", if session_stored { "stored" } else { "none" });
        }
    }
    Ok(())
}

pub(crate) fn render_tagging(
    response: &TaggingResponse,
    quota: Option<QuotaSnapshot>,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(response)?,
        OutputFormat::Table => {
            println!("image: {}", response.image_url);
            for line in tag_lines(&response.tags) {
                println!("{line}");
            }
            if let Some(quota) = quota {
                println!("quota: {} of {} remaining", quota.remaining, quota.limit);
            }
        }
    }
    Ok(())
}

pub(crate) fn render_quota(quota: &QuotaSnapshot, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(quota)?,
        OutputFormat::Table => {
            println!("used: {}", quota.used);
            println!("limit: {}", quota.limit);
            println!("remaining: {}", quota.remaining);
            println!("consumed: {}%", quota.percentage());
        }
    }
    Ok(())
}

/// Flatten opaque tag JSON into `key: value` lines for table output.
fn tag_lines(tags: &Value) -> Vec<String> {
    match tags {
        Value::Object(fields) => fields
            .iter()
            .map(|(key, value)| format!("{key}: {}", scalar_or_list(value)))
            .collect(),
        Value::Null => vec!["tags: <none>".to_string()],
        other => vec![format!("tags: {}", scalar_or_list(other))],
    }
}

fn scalar_or_list(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .map(scalar_or_list)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}
