//! [`ApiClient`]: one method per backend endpoint.
//!
//! # Design
//! - Session operations go through a cookie-carrying client; API-key
//!   operations use a cookie-less client plus an `Authorization` header.
//! - The active API key is read from the auth container at call time. The
//!   client never writes to that container.
//! - Error bodies are decoded leniently: anything that is not JSON counts as
//!   an empty payload.

use std::sync::Arc;

use imgtag_api_models::{
    ApiKeyId, ApiKeySecret, ApiKeySummary, LoginRequest, QuotaSnapshot, RegisterRequest,
    TaggingRequest, TaggingResponse, User,
};
use imgtag_config::ClientConfig;
use imgtag_store::AuthStore;
use reqwest::cookie::Jar;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

use crate::error::{ClientError, ClientResult};
use crate::problem::{error_message, key_validation_message};
use crate::session;

/// Scheme token preceding the key in the `Authorization` header.
pub const API_KEY_SCHEME: &str = "Api-Key";
/// Correlation header attached to every request when configured.
pub const HEADER_REQUEST_ID: &str = "x-request-id";

const PATH_REGISTER: &str = "/api/v1/auth/register/";
const PATH_LOGIN: &str = "/api/v1/auth/login/";
const PATH_LOGOUT: &str = "/api/v1/auth/logout/";
const PATH_ME: &str = "/api/v1/auth/me/";
const PATH_KEYS: &str = "/api/v1/keys/";
const PATH_HEALTH: &str = "/api/v1/health/";
const PATH_TAG: &str = "/api/v1/tag/";
const PATH_USAGE: &str = "/api/v1/usage/";

#[derive(Clone, Copy)]
enum Credential<'a> {
    Session,
    ApiKey(&'a str),
}

type ErrorDeriver = fn(u16, Option<&Value>) -> String;

/// Client for the image tagging REST API.
#[derive(Clone)]
pub struct ApiClient {
    session_http: Client,
    key_http: Client,
    jar: Arc<Jar>,
    base_url: Url,
    auth: AuthStore,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Build a client for `config`, reading credentials from `auth`.
    ///
    /// A session exported by an earlier run is loaded into the cookie jar.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Build`] when the HTTP stack cannot be set up.
    pub fn new(config: &ClientConfig, auth: AuthStore) -> ClientResult<Self> {
        Self::build(config, auth, None)
    }

    /// Like [`ApiClient::new`], tagging every request with `request_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Build`] when `request_id` is not a valid header
    /// value or the HTTP stack cannot be set up.
    pub fn with_request_id(
        config: &ClientConfig,
        auth: AuthStore,
        request_id: &str,
    ) -> ClientResult<Self> {
        Self::build(config, auth, Some(request_id))
    }

    fn build(config: &ClientConfig, auth: AuthStore, request_id: Option<&str>) -> ClientResult<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(id) = request_id {
            let value = HeaderValue::from_str(id).map_err(|_| {
                ClientError::Build("request identifier contains invalid characters".to_string())
            })?;
            default_headers.insert(HEADER_REQUEST_ID, value);
        }

        let jar = Arc::new(Jar::default());
        if let Some(cookie) = auth.stored_session() {
            session::import_cookies(&jar, &config.base_url, &cookie);
        }

        let session_http = Client::builder()
            .timeout(config.timeout)
            .default_headers(default_headers.clone())
            .cookie_provider(Arc::clone(&jar))
            .build()
            .map_err(|err| ClientError::Build(err.to_string()))?;
        let key_http = Client::builder()
            .timeout(config.timeout)
            .default_headers(default_headers)
            .build()
            .map_err(|err| ClientError::Build(err.to_string()))?;

        Ok(Self {
            session_http,
            key_http,
            jar,
            base_url: config.base_url.clone(),
            auth,
        })
    }

    /// Base URL every path is appended to.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL for an API path, keeping any path prefix of the base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] when the result does not parse.
    pub fn endpoint(&self, path: &str) -> ClientResult<Url> {
        let prefix = self.base_url.path().trim_end_matches('/');
        self.base_url
            .join(&format!("{prefix}{path}"))
            .map_err(|source| ClientError::InvalidUrl {
                path: path.to_string(),
                source,
            })
    }

    /// Session cookies currently held for the base URL, in header form.
    #[must_use]
    pub fn session_cookie(&self) -> Option<String> {
        session::export_cookies(&self.jar, &self.base_url)
    }

    /// Create an account; the server also opens a session.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] for transport, HTTP, or decoding failures.
    pub async fn register(&self, email: &str, password: &str) -> ClientResult<User> {
        let body = RegisterRequest::new(email, password);
        self.call(Method::POST, PATH_REGISTER, Some(&body), Credential::Session)
            .await
    }

    /// Open a cookie session.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] for transport, HTTP, or decoding failures.
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<User> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.call(Method::POST, PATH_LOGIN, Some(&body), Credential::Session)
            .await
    }

    /// Close the server-side session.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] for transport or HTTP failures.
    pub async fn logout(&self) -> ClientResult<()> {
        self.call_unit(Method::POST, PATH_LOGOUT, None::<&Value>, Credential::Session)
            .await
    }

    /// Account behind the current session.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] for transport, HTTP, or decoding failures.
    pub async fn me(&self) -> ClientResult<User> {
        self.call(Method::GET, PATH_ME, None::<&Value>, Credential::Session)
            .await
    }

    /// API keys owned by the session user, masked.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] for transport, HTTP, or decoding failures.
    pub async fn list_api_keys(&self) -> ClientResult<Vec<ApiKeySummary>> {
        self.call(Method::GET, PATH_KEYS, None::<&Value>, Credential::Session)
            .await
    }

    /// Issue a new key. The returned secret is the only time the raw key is
    /// revealed.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] for transport, HTTP, or decoding failures.
    pub async fn create_api_key(&self) -> ClientResult<ApiKeySecret> {
        self.call(Method::POST, PATH_KEYS, Some(&json!({})), Credential::Session)
            .await
    }

    /// Revoke the key with `id`.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] for transport or HTTP failures.
    pub async fn revoke_api_key(&self, id: ApiKeyId) -> ClientResult<()> {
        let path = format!("{PATH_KEYS}{id}/");
        self.call_unit(Method::DELETE, &path, None::<&Value>, Credential::Session)
            .await
    }

    /// Probe the health endpoint with `key` to check that it is accepted.
    ///
    /// # Errors
    ///
    /// 401 yields "invalid credential" and 429 "quota exceeded"; other
    /// failures follow the usual derivation.
    pub async fn validate_api_key(&self, key: &str) -> ClientResult<()> {
        let key = key.trim();
        if key.is_empty() {
            return Err(ClientError::MissingCredential);
        }
        let (status, payload) = self
            .execute(Method::GET, PATH_HEALTH, None::<&Value>, Credential::ApiKey(key))
            .await?;
        ensure_success(status, payload, key_validation_message).map(|_| ())
    }

    /// Tag an image using the API key held by the auth container.
    ///
    /// # Errors
    ///
    /// Fails with [`ClientError::MissingCredential`] or
    /// [`ClientError::InvalidRequest`] before any network I/O when no key is
    /// configured or the image URL is not an absolute http(s) URL.
    pub async fn tag_image(&self, request: &TaggingRequest) -> ClientResult<TaggingResponse> {
        self.tag_image_with_status(request)
            .await
            .map(|(_, response)| response)
    }

    /// Like [`ApiClient::tag_image`], also returning the HTTP status of the
    /// successful response.
    ///
    /// # Errors
    ///
    /// Same as [`ApiClient::tag_image`].
    pub async fn tag_image_with_status(
        &self,
        request: &TaggingRequest,
    ) -> ClientResult<(u16, TaggingResponse)> {
        let key = self.auth.api_key().ok_or(ClientError::MissingCredential)?;
        validate_image_url(&request.image_url)?;
        self.call_with_status(
            Method::POST,
            PATH_TAG,
            Some(request),
            Credential::ApiKey(&key),
        )
        .await
    }

    /// Quota accounting for the session user.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] for transport, HTTP, or decoding failures.
    pub async fn usage(&self) -> ClientResult<QuotaSnapshot> {
        self.call(Method::GET, PATH_USAGE, None::<&Value>, Credential::Session)
            .await
    }

    async fn call<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        credential: Credential<'_>,
    ) -> ClientResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.call_with_status(method, path, body, credential)
            .await
            .map(|(_, value)| value)
    }

    async fn call_with_status<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        credential: Credential<'_>,
    ) -> ClientResult<(u16, T)>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let (status, payload) = self.execute(method, path, body, credential).await?;
        let payload = ensure_success(status, payload, error_message)?;
        let value = serde_json::from_value(payload.unwrap_or(Value::Null)).map_err(|source| {
            ClientError::Decode {
                endpoint: path.to_string(),
                status: status.as_u16(),
                source,
            }
        })?;
        Ok((status.as_u16(), value))
    }

    async fn call_unit<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        credential: Credential<'_>,
    ) -> ClientResult<()>
    where
        B: Serialize + ?Sized,
    {
        let (status, payload) = self.execute(method, path, body, credential).await?;
        ensure_success(status, payload, error_message).map(|_| ())
    }

    async fn execute<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        credential: Credential<'_>,
    ) -> ClientResult<(StatusCode, Option<Value>)>
    where
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(path)?;
        let mut request = match credential {
            Credential::Session => self.session_http.request(method.clone(), url),
            Credential::ApiKey(key) => self
                .key_http
                .request(method.clone(), url)
                .header(AUTHORIZATION, format!("{API_KEY_SCHEME} {key}")),
        };
        if let Some(body) = body {
            request = request.json(body);
        }

        debug!(%method, path, "sending request");
        let transport = |source| ClientError::Transport {
            endpoint: path.to_string(),
            source,
        };
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(transport)?;
        debug!(%method, path, status = status.as_u16(), "response received");

        Ok((status, parse_payload(&bytes)))
    }
}

fn parse_payload(bytes: &[u8]) -> Option<Value> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    serde_json::from_slice(bytes).ok()
}

fn ensure_success(
    status: StatusCode,
    payload: Option<Value>,
    derive: ErrorDeriver,
) -> ClientResult<Option<Value>> {
    if status.is_success() {
        return Ok(payload);
    }
    let code = status.as_u16();
    Err(ClientError::Http {
        status: code,
        message: derive(code, payload.as_ref()),
    })
}

fn validate_image_url(raw: &str) -> ClientResult<()> {
    let parsed = Url::parse(raw.trim())
        .map_err(|err| ClientError::InvalidRequest(format!("invalid image URL '{raw}': {err}")))?;
    if matches!(parsed.scheme(), "http" | "https") {
        Ok(())
    } else {
        Err(ClientError::InvalidRequest(format!(
            "invalid image URL '{raw}': only http and https are supported"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use imgtag_api_models::{ApiKeyInfo, TaggingMode};
    use imgtag_store::{CredentialStorage, MemoryStorage, STORAGE_KEY_SESSION};
    use std::time::Duration;

    const RAW_KEY: &str = "tk_live_0123456789abcdef";

    fn config_for(base_url: &str) -> ClientConfig {
        ClientConfig {
            base_url: base_url.parse().expect("valid URL"),
            timeout: Duration::from_secs(5),
            state_path: std::env::temp_dir().join("imgtag-client-tests.json"),
        }
    }

    fn client_with(server: &MockServer, storage: Arc<dyn CredentialStorage>) -> (ApiClient, AuthStore) {
        let auth = AuthStore::new(storage);
        let client = ApiClient::new(&config_for(&server.base_url()), auth.clone()).expect("client");
        (client, auth)
    }

    fn client_for(server: &MockServer) -> (ApiClient, AuthStore) {
        client_with(server, Arc::new(MemoryStorage::new()))
    }

    fn user_json() -> Value {
        json!({"id": 4, "email": "ada@example.com", "created_at": "2025-01-02T03:04:05Z"})
    }

    #[tokio::test]
    async fn register_mirrors_password_and_captures_session() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path(PATH_REGISTER)
                .header("content-type", "application/json")
                .json_body(json!({
                    "email": "ada@example.com",
                    "password": "pw-123456",
                    "password2": "pw-123456"
                }));
            then.status(201)
                .header("set-cookie", "sessionid=abc123; Path=/; HttpOnly")
                .json_body(user_json());
        });

        let (client, _auth) = client_for(&server);
        let user = client
            .register("ada@example.com", "pw-123456")
            .await
            .expect("register");

        mock.assert();
        assert_eq!(user.id, 4);
        let cookie = client.session_cookie().expect("session cookie");
        assert!(cookie.contains("sessionid=abc123"));
    }

    #[tokio::test]
    async fn stored_session_is_sent_on_session_calls() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path(PATH_ME)
                .header("cookie", "sessionid=persisted");
            then.status(200).json_body(user_json());
        });

        let storage = Arc::new(MemoryStorage::new());
        storage
            .set(STORAGE_KEY_SESSION, "sessionid=persisted")
            .expect("seed session");
        let (client, _auth) = client_with(&server, storage);

        let user = client.me().await.expect("me");
        mock.assert();
        assert_eq!(user.email, "ada@example.com");
    }

    #[tokio::test]
    async fn login_failure_surfaces_non_field_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path(PATH_LOGIN);
            then.status(400).json_body(json!({
                "non_field_errors": ["Invalid email or password."]
            }));
        });

        let (client, _auth) = client_for(&server);
        let err = client
            .login("ada@example.com", "wrong")
            .await
            .expect_err("login should fail");
        assert_eq!(err.to_string(), "Invalid email or password.");
        assert_eq!(err.status(), Some(400));
    }

    #[tokio::test]
    async fn field_errors_are_prefixed() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path(PATH_REGISTER);
            then.status(400)
                .json_body(json!({"email": ["user with this email already exists."]}));
        });

        let (client, _auth) = client_for(&server);
        let err = client
            .register("ada@example.com", "pw")
            .await
            .expect_err("duplicate email");
        assert_eq!(err.to_string(), "email: user with this email already exists.");
    }

    #[tokio::test]
    async fn unparseable_error_body_falls_back_to_status() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path(PATH_KEYS);
            then.status(500)
                .header("content-type", "text/html")
                .body("<html>Server Error</html>");
        });

        let (client, _auth) = client_for(&server);
        let err = client.list_api_keys().await.expect_err("server error");
        assert_eq!(err.to_string(), "HTTP 500");
        assert!(!err.is_caller_error());
    }

    #[tokio::test]
    async fn bare_string_error_is_used_verbatim() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path(PATH_USAGE);
            then.status(400).json_body(json!("oops"));
        });

        let (client, _auth) = client_for(&server);
        let err = client.usage().await.expect_err("bad request");
        assert_eq!(err.to_string(), "oops");
    }

    #[tokio::test]
    async fn key_lifecycle_endpoints() {
        let server = MockServer::start_async().await;
        let list = server.mock(|when, then| {
            when.method(GET).path(PATH_KEYS);
            then.status(200).json_body(json!([
                {"id": 1, "masked_key": "tk_live_…aaaa", "created_at": "2025-01-01T00:00:00Z", "last_used_at": null},
                {"id": 2, "masked_key": "tk_live_…bbbb", "created_at": "2025-01-02T00:00:00Z", "last_used_at": "2025-01-03T00:00:00Z"}
            ]));
        });
        let create = server.mock(|when, then| {
            when.method(POST).path(PATH_KEYS).json_body(json!({}));
            then.status(201).json_body(json!({
                "id": 3,
                "key": RAW_KEY,
                "masked_key": "tk_live_…cdef",
                "created_at": "2025-01-04T00:00:00Z"
            }));
        });
        let revoke = server.mock(|when, then| {
            when.method(DELETE).path("/api/v1/keys/3/");
            then.status(204);
        });

        let (client, _auth) = client_for(&server);
        let keys = client.list_api_keys().await.expect("list");
        assert_eq!(keys.len(), 2);
        assert!(keys[0].last_used_at.is_none());
        assert!(keys[1].last_used_at.is_some());

        let secret = client.create_api_key().await.expect("create");
        assert_eq!(secret.id, 3);
        assert_eq!(secret.key, RAW_KEY);

        client.revoke_api_key(3).await.expect("revoke");

        list.assert();
        create.assert();
        revoke.assert();
    }

    #[tokio::test]
    async fn validate_api_key_maps_fixed_statuses() {
        let server = MockServer::start_async().await;
        let ok = server.mock(|when, then| {
            when.method(GET)
                .path(PATH_HEALTH)
                .header("authorization", "Api-Key good-key");
            then.status(200).json_body(json!({"status": "ok"}));
        });
        server.mock(|when, then| {
            when.method(GET)
                .path(PATH_HEALTH)
                .header("authorization", "Api-Key bad-key");
            then.status(401).json_body(json!({"detail": "Invalid API key."}));
        });
        server.mock(|when, then| {
            when.method(GET)
                .path(PATH_HEALTH)
                .header("authorization", "Api-Key spent-key");
            then.status(429).json_body(json!({"detail": "Daily limit reached."}));
        });

        let (client, _auth) = client_for(&server);
        client.validate_api_key("good-key").await.expect("valid key");
        ok.assert();

        let invalid = client.validate_api_key("bad-key").await.expect_err("401");
        assert_eq!(invalid.to_string(), "invalid credential");
        let spent = client.validate_api_key("spent-key").await.expect_err("429");
        assert_eq!(spent.to_string(), "quota exceeded");

        let empty = client.validate_api_key("  ").await.expect_err("empty key");
        assert!(matches!(empty, ClientError::MissingCredential));
    }

    #[tokio::test]
    async fn tag_image_without_key_fails_before_network() {
        let server = MockServer::start_async().await;
        let (client, _auth) = client_for(&server);

        let err = client
            .tag_image(&TaggingRequest::new("https://images.example.com/dress.jpg"))
            .await
            .expect_err("no key configured");
        assert!(matches!(err, ClientError::MissingCredential));
    }

    #[tokio::test]
    async fn tag_image_rejects_non_http_urls_locally() {
        let server = MockServer::start_async().await;
        let (client, auth) = client_for(&server);
        auth.authenticate(RAW_KEY, ApiKeyInfo::from_raw_key(RAW_KEY));

        let err = client
            .tag_image(&TaggingRequest::new("not a url"))
            .await
            .expect_err("invalid url");
        assert!(matches!(err, ClientError::InvalidRequest(_)));

        let err = client
            .tag_image(&TaggingRequest::new("ftp://images.example.com/a.jpg"))
            .await
            .expect_err("unsupported scheme");
        assert!(err.to_string().contains("only http and https"));
    }

    #[tokio::test]
    async fn tag_image_sends_api_key_header() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path(PATH_TAG)
                .header("authorization", format!("Api-Key {RAW_KEY}"))
                .json_body(json!({
                    "image_url": "https://images.example.com/dress.jpg",
                    "mode": "reasoning"
                }));
            then.status(200).json_body(json!({
                "image_url": "https://images.example.com/dress.jpg",
                "tags": {"category": "dress", "colors": ["red"]}
            }));
        });

        let (client, auth) = client_for(&server);
        auth.authenticate(RAW_KEY, ApiKeyInfo::from_raw_key(RAW_KEY));

        let response = client
            .tag_image(
                &TaggingRequest::new("https://images.example.com/dress.jpg")
                    .with_mode(TaggingMode::Reasoning),
            )
            .await
            .expect("tagging");
        mock.assert();
        assert_eq!(response.tags["category"], json!("dress"));
    }

    #[tokio::test]
    async fn usage_decodes_quota() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path(PATH_USAGE);
            then.status(200)
                .json_body(json!({"used": 3, "limit": 50, "remaining": 47}));
        });

        let (client, _auth) = client_for(&server);
        let quota = client.usage().await.expect("usage");
        assert_eq!(quota, QuotaSnapshot::new(3, 50));
    }

    #[tokio::test]
    async fn unexpected_success_shape_is_a_decode_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path(PATH_ME);
            then.status(200).json_body(json!({"unexpected": true}));
        });

        let (client, _auth) = client_for(&server);
        let err = client.me().await.expect_err("decode failure");
        assert!(matches!(err, ClientError::Decode { status: 200, .. }));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_error() {
        let auth = AuthStore::new(Arc::new(MemoryStorage::new()));
        let client = ApiClient::new(&config_for("http://127.0.0.1:1"), auth).expect("client");
        let err = client.me().await.expect_err("connection refused");
        assert!(matches!(err, ClientError::Transport { .. }));
        assert_eq!(err.status(), None);
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        let auth = AuthStore::new(Arc::new(MemoryStorage::new()));
        let client =
            ApiClient::new(&config_for("https://tagger.example.com/backend/"), auth).expect("client");
        let url = client.endpoint(PATH_TAG).expect("endpoint");
        assert_eq!(url.as_str(), "https://tagger.example.com/backend/api/v1/tag/");
    }

    #[test]
    fn request_id_must_be_a_valid_header() {
        let auth = AuthStore::new(Arc::new(MemoryStorage::new()));
        let err = ApiClient::with_request_id(&config_for("http://localhost:8000"), auth, "bad\nid")
            .expect_err("invalid request id");
        assert!(matches!(err, ClientError::Build(_)));
    }
}
