//! Public client surface + builder.
//! Every request goes through the shared [`RequestGovernor`]; the endpoint key is the resource
//! path and the method decides cache eligibility.

mod constants;

use std::sync::Arc;
use std::time::Duration;

use constants::{DEFAULT_BASE_URL, USER_AGENT};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use url::Url;

use crate::core::Error;
use crate::governor::{GovernorConfig, RequestGovernor, RequestGovernorBuilder};

/// Async client for the time-tracking and invoicing REST API.
///
/// Cloning is cheap; clones share the HTTP connection pool, the bearer token and the governor.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    token: Arc<RwLock<Option<String>>>,
    governor: RequestGovernor<Value>,
}

impl ApiClient {
    /// Create a new builder.
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// The governor every request of this client passes through.
    pub fn governor(&self) -> &RequestGovernor<Value> {
        &self.governor
    }

    /// The API root every request path is resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Use `token` as the bearer credential for subsequent requests (after login).
    ///
    /// Cached reads are scoped to the credential, so nothing cached under the previous token is
    /// served afterwards.
    pub async fn set_token(&self, token: impl Into<String>) {
        *self.token.write().await = Some(token.into());
    }

    /// Stop sending a bearer credential (after logout). Cached reads are dropped as well.
    pub async fn clear_token(&self) {
        *self.token.write().await = None;
        self.governor.clear_cache(None).await;
    }

    /// `GET path`, served from the governor cache while fresh.
    ///
    /// # Errors
    /// [`Error::Status`] for non-2xx answers, [`Error::Json`] if the body does not fit `R`,
    /// [`Error::Http`] for transport failures.
    pub async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, Error> {
        let value = self.request(Method::GET, path, None).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// `POST path` with a JSON body.
    ///
    /// # Errors
    /// See [`get`](Self::get).
    pub async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, Error>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        let value = self.request(Method::POST, path, Some(body)).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// `PUT path` with a JSON body.
    ///
    /// # Errors
    /// See [`get`](Self::get).
    pub async fn put<B, R>(&self, path: &str, body: &B) -> Result<R, Error>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        let value = self.request(Method::PUT, path, Some(body)).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// `DELETE path`.
    ///
    /// # Errors
    /// See [`get`](Self::get).
    pub async fn delete<R: DeserializeOwned>(&self, path: &str) -> Result<R, Error> {
        let value = self.request(Method::DELETE, path, None).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Sends one governed request and returns the raw JSON body (`null` for an empty body).
    ///
    /// A successful mutation evicts the cached read for the same path. The governor key is the
    /// path, scoped to the current bearer token so clients sharing a governor never see each
    /// other's reads.
    ///
    /// # Errors
    /// [`Error::ForeignPath`] if `path` resolves outside the base URL; otherwise see
    /// [`get`](Self::get).
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, body), err))]
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, Error> {
        let path = endpoint_key(path);
        let url = self.base_url.join(path.trim_start_matches('/'))?;
        if url.origin() != self.base_url.origin() || !url.path().starts_with(self.base_url.path())
        {
            return Err(Error::ForeignPath(path));
        }
        let is_read = method == Method::GET;

        let token = self.token.read().await.clone();
        let key = match token.as_deref() {
            Some(t) => format!("{path}@{}", token_fingerprint(t)),
            None => path,
        };

        let value = self
            .governor
            .throttle(&key, &method, || self.send(method.clone(), url, token, body))
            .await?;

        if !is_read {
            self.governor.clear_cache(Some(&key)).await;
        }
        Ok(value)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        token: Option<String>,
        body: Option<Value>,
    ) -> Result<Value, Error> {
        let mut req = self.http.request(method, url.clone());
        if let Some(token) = token {
            req = req.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(body) = &body {
            req = req.json(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                url: url.to_string(),
                message: server_message(&text),
            });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

/// Normalizes a resource path into its governor key: a single leading slash, no surrounding
/// whitespace.
fn endpoint_key(path: &str) -> String {
    format!("/{}", path.trim().trim_start_matches('/'))
}

/// Short, non-reversible tag for a bearer token; keeps the token itself out of governor keys
/// and trace output.
fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    digest[..8].iter().map(|b| format!("{b:02x}")).collect()
}

/// The server reports failures as `{"error": "..."}`; anything else is kept only if non-empty.
fn server_message(body: &str) -> Option<String> {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body)
        && let Some(Value::String(msg)) = map.get("error").or_else(|| map.get("message"))
    {
        return Some(msg.clone());
    }
    let trimmed = body.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/* ----------------------- Builder ----------------------- */

#[derive(Default)]
pub struct ApiClientBuilder {
    base_url: Option<Url>,
    token: Option<String>,
    user_agent: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    governor_config: Option<GovernorConfig>,
    governor: Option<RequestGovernor<Value>>,
}

impl ApiClientBuilder {
    /// Override the API root (e.g., `https://billing.example.com/api/`).
    pub fn base_url(mut self, url: Url) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Start with a bearer token already set.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Override the User-Agent.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Set a global request timeout (overall). Default: none.
    pub fn timeout(mut self, dur: Duration) -> Self {
        self.timeout = Some(dur);
        self
    }

    /// Set a connect timeout. Default: none.
    pub fn connect_timeout(mut self, dur: Duration) -> Self {
        self.connect_timeout = Some(dur);
        self
    }

    /// Limits for the governor this client creates. Ignored if [`governor`](Self::governor) is set.
    pub fn governor_config(mut self, config: GovernorConfig) -> Self {
        self.governor_config = Some(config);
        self
    }

    /// Share an existing governor so several clients draw from one set of rate limits.
    ///
    /// Cached reads stay separate per bearer token.
    pub fn governor(mut self, governor: RequestGovernor<Value>) -> Self {
        self.governor = Some(governor);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    /// [`Error::Url`] for an unparsable default URL, [`Error::InvalidConfig`] for bad governor
    /// limits, [`Error::Http`] if the HTTP client cannot be created.
    pub fn build(self) -> Result<ApiClient, Error> {
        let mut base_url = match self.base_url {
            Some(u) => u,
            None => Url::parse(DEFAULT_BASE_URL)?,
        };
        // `Url::join` drops the last segment unless the base ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let governor = match (self.governor, self.governor_config) {
            (Some(g), _) => g,
            (None, Some(cfg)) => RequestGovernorBuilder::from_config(cfg).build()?,
            (None, None) => RequestGovernor::new(),
        };

        let mut httpb = reqwest::Client::builder()
            .user_agent(self.user_agent.as_deref().unwrap_or(USER_AGENT));
        if let Some(t) = self.timeout {
            httpb = httpb.timeout(t);
        }
        if let Some(ct) = self.connect_timeout {
            httpb = httpb.connect_timeout(ct);
        }
        let http = httpb.build()?;

        Ok(ApiClient {
            http,
            base_url,
            token: Arc::new(RwLock::new(self.token)),
            governor,
        })
    }
}
