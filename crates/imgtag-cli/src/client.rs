//! Application context and the CLI error type.

use std::fmt::{self, Display, Formatter};
use std::future::Future;
use std::sync::Arc;

use imgtag_client::{ApiClient, ClientError, ClientResult};
use imgtag_config::{ClientConfig, default_state_path};
use imgtag_store::{ApiKeysStore, AuthStore, CredentialStorage, FileStorage, UsageStore};

use crate::cli::Cli;

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.display_message())
    }
}

impl std::error::Error for CliError {}

impl From<ClientError> for CliError {
    fn from(err: ClientError) -> Self {
        if err.is_caller_error() {
            Self::Validation(err.to_string())
        } else {
            Self::Failure(err.into())
        }
    }
}

/// Everything a command handler needs, built once per process.
pub(crate) struct AppContext {
    pub(crate) config: ClientConfig,
    pub(crate) auth: AuthStore,
    pub(crate) api_keys: ApiKeysStore,
    pub(crate) usage: UsageStore,
    pub(crate) client: ApiClient,
}

impl AppContext {
    /// Resolve configuration from parsed flags and open file-backed storage.
    pub(crate) fn from_cli(cli: &Cli, trace_id: &str) -> CliResult<Self> {
        let state_path = cli.state_path.clone().unwrap_or_else(default_state_path);
        let config = ClientConfig::new(cli.api_url.clone(), cli.timeout, state_path)
            .map_err(|err| CliError::validation(err.to_string()))?;
        let storage = Arc::new(FileStorage::new(config.state_path.clone()));
        Self::new(config, storage, Some(trace_id))
    }

    /// Wire containers and client around `storage`, restoring any stored key.
    pub(crate) fn new(
        config: ClientConfig,
        storage: Arc<dyn CredentialStorage>,
        trace_id: Option<&str>,
    ) -> CliResult<Self> {
        let auth = AuthStore::new(storage);
        if auth.restore_session() {
            tracing::debug!("restored stored API key");
        }
        let client = match trace_id {
            Some(id) => ApiClient::with_request_id(&config, auth.clone(), id),
            None => ApiClient::new(&config, auth.clone()),
        }
        .map_err(CliError::failure)?;

        Ok(Self {
            config,
            auth,
            api_keys: ApiKeysStore::new(),
            usage: UsageStore::new(),
            client,
        })
    }

    /// Save the client's session cookies for the next invocation.
    pub(crate) fn persist_session(&self) {
        self.auth.persist_session(self.client.session_cookie().as_deref());
    }
}

/// Await a client call while mirroring its progress into a container's
/// `loading`/`error` fields.
pub(crate) async fn tracked<T>(
    call: impl Future<Output = ClientResult<T>>,
    set_loading: impl Fn(bool),
    set_error: impl Fn(Option<String>),
) -> CliResult<T> {
    set_loading(true);
    let outcome = call.await;
    set_loading(false);
    match outcome {
        Ok(value) => {
            set_error(None);
            Ok(value)
        }
        Err(err) => {
            set_error(Some(err.to_string()));
            Err(err.into())
        }
    }
}
