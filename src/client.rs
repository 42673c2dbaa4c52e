//! Authenticated Client
//!
//! Executes logical requests with the stored bearer credential, and replays a
//! request once after a coordinated refresh when the server rejects the
//! credential with 401.

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};
use url::Url;

use crate::core::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, ReqwestHttpTransport};
use crate::credentials::{CredentialStore, InMemoryCredentialStore};
use crate::error::{
    create_error_from_response, ClientError, ClientResult, ConfigurationError, ProtocolError,
};
use crate::refresh::RefreshCoordinator;
use crate::telemetry::{ClientMetrics, NoOpMetrics};
use crate::types::{ClientConfig, CredentialPair, LoginRequestBody, LogicalRequest, TokenResponse};

/// Status that triggers the refresh path.
pub const AUTH_FAILURE_STATUS: u16 = 401;

/// One original attempt plus one replay after a successful refresh.
const MAX_ATTEMPTS: u32 = 2;

/// Authenticated HTTP client.
pub struct AuthenticatedClient<
    T: HttpTransport = ReqwestHttpTransport,
    S: CredentialStore = InMemoryCredentialStore,
> {
    config: ClientConfig,
    transport: Arc<T>,
    store: Arc<S>,
    coordinator: RefreshCoordinator<T, S>,
    metrics: Arc<dyn ClientMetrics>,
}

impl AuthenticatedClient<ReqwestHttpTransport, InMemoryCredentialStore> {
    /// Create a client with the reqwest transport and an in-memory store.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        Self::with_store(config, InMemoryCredentialStore::new())
    }
}

impl<S: CredentialStore> AuthenticatedClient<ReqwestHttpTransport, S> {
    /// Create a client with the reqwest transport and a caller-provided store.
    pub fn with_store(config: ClientConfig, store: S) -> ClientResult<Self> {
        let transport =
            ReqwestHttpTransport::with_options(config.timeout, config.max_response_size)?;
        Ok(Self::with_components(config, transport, store))
    }
}

impl<T: HttpTransport, S: CredentialStore> AuthenticatedClient<T, S> {
    /// Create a client with custom implementations.
    pub fn with_components(config: ClientConfig, transport: T, store: S) -> Self {
        Self::from_shared(config, Arc::new(transport), Arc::new(store))
    }

    /// Create a client over a transport and store shared with other owners.
    pub fn from_shared(config: ClientConfig, transport: Arc<T>, store: Arc<S>) -> Self {
        let coordinator = RefreshCoordinator::new(config.clone(), transport.clone(), store.clone());

        Self {
            config,
            transport,
            store,
            coordinator,
            metrics: Arc::new(NoOpMetrics),
        }
    }

    /// Replace the metrics sink (shared with the refresh coordinator).
    pub fn with_metrics(mut self, metrics: Arc<dyn ClientMetrics>) -> Self {
        self.coordinator = self.coordinator.with_metrics(metrics.clone());
        self.metrics = metrics;
        self
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the credential store.
    pub fn credentials(&self) -> &Arc<S> {
        &self.store
    }

    /// Get the refresh coordinator.
    pub fn coordinator(&self) -> &RefreshCoordinator<T, S> {
        &self.coordinator
    }

    // ========== Request Execution ==========

    /// Execute a logical request and return the decoded JSON body.
    ///
    /// An empty success body decodes to `Value::Null`.
    pub async fn execute(&self, request: &LogicalRequest) -> ClientResult<serde_json::Value> {
        self.execute_json(request).await
    }

    /// Execute a logical request and decode the success body into `R`.
    pub async fn execute_json<R: DeserializeOwned>(
        &self,
        request: &LogicalRequest,
    ) -> ClientResult<R> {
        let result = match self.execute_with_refresh(request).await {
            Ok(response) => decode_body(&response.body),
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            self.metrics.record_error(e.error_code());
        }

        result
    }

    /// Attempt the request; on 401, wait for the coordinated refresh and replay
    /// it exactly once. The replay's outcome is returned as-is.
    async fn execute_with_refresh(&self, request: &LogicalRequest) -> ClientResult<HttpResponse> {
        let observed_generation = self.coordinator.generation();
        let mut attempt = 1;

        loop {
            let response = self.attempt(request, attempt).await?;

            if response.status == AUTH_FAILURE_STATUS && attempt < MAX_ATTEMPTS {
                debug!(
                    method = %request.method,
                    path = %request.path,
                    "Credential rejected, entering refresh path"
                );
                self.coordinator
                    .ensure_fresh_after_failure(observed_generation)
                    .await?;
                self.metrics.record_retry();
                attempt += 1;
                continue;
            }

            return classify(response);
        }
    }

    /// Issue one transport call with the currently stored access token.
    async fn attempt(&self, request: &LogicalRequest, attempt: u32) -> ClientResult<HttpResponse> {
        let credentials = self
            .store
            .get()
            .await?
            .filter(|pair| !pair.access_token().is_empty());

        let mut headers = self.base_headers();
        headers.extend(request.headers.clone());
        headers.remove("authorization");
        if let Some(pair) = &credentials {
            headers.insert("authorization".to_string(), pair.authorization_header());
        }

        let http_request = HttpRequest {
            method: request.method,
            url: self.build_url(request)?,
            headers,
            body: request.body.as_ref().map(|body| body.to_string()),
            timeout: Some(self.config.timeout),
        };

        debug!(
            method = %request.method,
            path = %request.path,
            attempt,
            authenticated = credentials.is_some(),
            "Sending request"
        );

        let response = self.transport.send(http_request).await?;
        self.metrics.record_request(request.method.as_str(), response.status);

        debug!(
            method = %request.method,
            path = %request.path,
            attempt,
            status = response.status,
            "Received response"
        );

        Ok(response)
    }

    fn base_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        headers.insert("accept".to_string(), "application/json".to_string());
        headers.extend(self.config.default_headers.clone());
        headers
    }

    fn build_url(&self, request: &LogicalRequest) -> ClientResult<String> {
        let raw = self.config.url_for(&request.path);
        if request.query.is_empty() {
            return Ok(raw);
        }

        let mut url = Url::parse(&raw).map_err(|e| {
            ClientError::Configuration(ConfigurationError::InvalidBaseUrl {
                url: raw.clone(),
                message: e.to_string(),
            })
        })?;
        url.query_pairs_mut().extend_pairs(request.query.iter());
        Ok(url.into())
    }

    // ========== Verb Helpers ==========

    /// `GET path?query`.
    pub async fn get<R: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> ClientResult<R> {
        let mut request = LogicalRequest::get(path);
        for (key, value) in query {
            request = request.with_query(*key, *value);
        }
        self.execute_json(&request).await
    }

    /// `POST path` with a JSON body.
    pub async fn post<B, R>(&self, path: &str, body: &B) -> ClientResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let request = LogicalRequest::post(path).with_json(body)?;
        self.execute_json(&request).await
    }

    /// `PUT path` with a JSON body.
    pub async fn put<B, R>(&self, path: &str, body: &B) -> ClientResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let request = LogicalRequest::put(path).with_json(body)?;
        self.execute_json(&request).await
    }

    /// `PATCH path` with a JSON body.
    pub async fn patch<B, R>(&self, path: &str, body: &B) -> ClientResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let request = LogicalRequest::patch(path).with_json(body)?;
        self.execute_json(&request).await
    }

    /// `DELETE path?query`.
    pub async fn delete<R: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> ClientResult<R> {
        let mut request = LogicalRequest::delete(path);
        for (key, value) in query {
            request = request.with_query(*key, *value);
        }
        self.execute_json(&request).await
    }

    // ========== Session ==========

    /// Exchange username and password for a credential pair and store it.
    ///
    /// The login call never carries a bearer token and never enters the
    /// refresh path.
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<()> {
        let body = serde_json::to_string(&LoginRequestBody { username, password }).map_err(|e| {
            ClientError::Protocol(ProtocolError::InvalidJson {
                message: e.to_string(),
            })
        })?;

        let mut headers = self.base_headers();
        headers.remove("authorization");

        let request = HttpRequest {
            method: HttpMethod::Post,
            url: self.config.login_url(),
            headers,
            body: Some(body),
            timeout: Some(self.config.timeout),
        };

        let response = self.transport.send(request).await?;
        self.metrics.record_request(HttpMethod::Post.as_str(), response.status);

        let token_response: TokenResponse = decode_body(&classify(response)?.body)?;
        let access_token = token_response.access_token().ok_or_else(|| {
            ClientError::Protocol(ProtocolError::MissingField {
                field: "access_token".to_string(),
            })
        })?;
        let refresh_token = token_response.refresh_token().ok_or_else(|| {
            ClientError::Protocol(ProtocolError::MissingField {
                field: "refresh_token".to_string(),
            })
        })?;

        self.store
            .set(CredentialPair::new(access_token, refresh_token))
            .await?;
        info!("Login succeeded, credentials stored");

        Ok(())
    }

    /// Drop the stored credentials.
    pub async fn logout(&self) -> ClientResult<()> {
        self.store.clear().await?;
        info!("Logged out, credentials cleared");
        Ok(())
    }

    /// Whether a credential pair is stored.
    pub async fn is_logged_in(&self) -> ClientResult<bool> {
        Ok(self.store.get().await?.is_some())
    }
}

/// Map a response to success or [`ClientError::Request`].
fn classify(response: HttpResponse) -> ClientResult<HttpResponse> {
    if response.status >= 400 {
        return Err(create_error_from_response(response.status, &response.body));
    }
    Ok(response)
}

fn decode_body<R: DeserializeOwned>(body: &str) -> ClientResult<R> {
    let decoded = if body.trim().is_empty() {
        serde_json::from_value(serde_json::Value::Null)
    } else {
        serde_json::from_str(body)
    };

    decoded.map_err(|e| {
        ClientError::Protocol(ProtocolError::InvalidJson {
            message: e.to_string(),
        })
    })
}

/// Create an authenticated client with default implementations.
pub fn auth_http_client(config: ClientConfig) -> ClientResult<AuthenticatedClient> {
    AuthenticatedClient::new(config)
}
