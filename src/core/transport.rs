//! HTTP Transport
//!
//! HTTP client interface and implementations for authenticated requests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{ClientError, ConfigurationError, NetworkError, ProtocolError};

/// HTTP request definition.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Request URL.
    pub url: String,
    /// Request headers (lowercase names).
    pub headers: HashMap<String, String>,
    /// Request body.
    pub body: Option<String>,
    /// Request timeout.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// Bearer token carried in the Authorization header, if any.
    pub fn bearer_token(&self) -> Option<&str> {
        self.headers
            .get("authorization")
            .and_then(|value| value.strip_prefix("Bearer "))
    }

    /// Path component of the request URL.
    pub fn path(&self) -> String {
        url::Url::parse(&self.url)
            .map(|url| url.path().to_string())
            .unwrap_or_else(|_| self.url.clone())
    }
}

/// HTTP method.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP response definition.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Status text.
    pub status_text: String,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: String,
}

impl HttpResponse {
    /// Build a JSON response.
    pub fn json<T: serde::Serialize + ?Sized>(status: u16, body: &T) -> Self {
        Self {
            status,
            status_text: if (200..300).contains(&status) {
                "OK"
            } else {
                "Error"
            }
            .to_string(),
            headers: [("content-type".to_string(), "application/json".to_string())]
                .into_iter()
                .collect(),
            body: serde_json::to_string(body).unwrap_or_default(),
        }
    }
}

/// HTTP transport interface (for dependency injection).
///
/// One call to [`HttpTransport::send`] is one outbound attempt. Failing to get
/// any response back is a [`ClientError::Network`]; every HTTP status,
/// including 4xx/5xx, is a successful send.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send an HTTP request.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ClientError>;
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// reqwest-backed transport.
///
/// Redirects are never followed: a 3xx is reported as
/// [`ProtocolError::UnexpectedRedirect`] so that a bearer token is only ever
/// sent to the configured host.
pub struct ReqwestHttpTransport {
    client: reqwest::Client,
    default_timeout: Duration,
    max_response_size: usize,
}

impl ReqwestHttpTransport {
    /// Create a transport with a custom timeout and response cap.
    pub fn with_options(timeout: Duration, max_response_size: usize) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| {
                ClientError::Configuration(ConfigurationError::ClientInit {
                    message: e.to_string(),
                })
            })?;

        Ok(Self {
            client,
            default_timeout: timeout,
            max_response_size,
        })
    }

    fn network_error(error: reqwest::Error, timeout: Duration) -> ClientError {
        let network = if error.is_timeout() {
            NetworkError::Timeout { timeout }
        } else if error.is_connect() {
            NetworkError::ConnectionFailed {
                message: error.to_string(),
            }
        } else {
            NetworkError::RequestFailed {
                message: error.to_string(),
            }
        };
        ClientError::Network(network)
    }

    /// Read the body chunk by chunk, giving up as soon as it passes the cap.
    async fn read_body(
        &self,
        mut response: reqwest::Response,
        timeout: Duration,
    ) -> Result<String, ClientError> {
        let too_large =
            |size: usize| ClientError::Protocol(ProtocolError::ResponseTooLarge { size });

        if let Some(declared) = response.content_length() {
            if declared as usize > self.max_response_size {
                return Err(too_large(declared as usize));
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Self::network_error(e, timeout))?
        {
            if body.len() + chunk.len() > self.max_response_size {
                return Err(too_large(body.len() + chunk.len()));
            }
            body.extend_from_slice(&chunk);
        }

        String::from_utf8(body).map_err(|e| {
            ClientError::Protocol(ProtocolError::InvalidResponse {
                message: format!("body is not UTF-8: {}", e),
            })
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestHttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
        let timeout = request.timeout.unwrap_or(self.default_timeout);

        let builder = self
            .client
            .request(request.method.into(), request.url.as_str())
            .timeout(timeout);
        let builder = request
            .headers
            .iter()
            .fold(builder, |builder, (name, value)| builder.header(name, value));
        let builder = match request.body {
            Some(body) => builder.body(body),
            None => builder,
        };

        let response = builder
            .send()
            .await
            .map_err(|e| Self::network_error(e, timeout))?;

        let status = response.status();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                let value = value.to_str().ok()?;
                Some((name.as_str().to_string(), value.to_string()))
            })
            .collect();

        if status.is_redirection() {
            return Err(ClientError::Protocol(ProtocolError::UnexpectedRedirect {
                location: headers.get("location").cloned().unwrap_or_default(),
            }));
        }

        let body = self.read_body(response, timeout).await?;

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}

#[derive(Clone, Debug)]
enum MockReply {
    Response(HttpResponse),
    ConnectionFailure(String),
}

#[derive(Clone, Debug)]
struct MockRoute {
    method: HttpMethod,
    path: String,
    bearer: Option<String>,
    reply: MockReply,
    latency: Option<Duration>,
    /// Removed after answering one request.
    once: bool,
}

impl MockRoute {
    fn new(method: HttpMethod, path: &str, reply: MockReply) -> Self {
        Self {
            method,
            path: path.to_string(),
            bearer: None,
            reply,
            latency: None,
            once: false,
        }
    }

    fn matches(&self, request: &HttpRequest, path: &str) -> bool {
        self.method == request.method
            && self.path == path
            && match &self.bearer {
                Some(token) => request.bearer_token() == Some(token.as_str()),
                None => true,
            }
    }
}

/// Mock HTTP transport for testing.
///
/// Requests are answered by the first registered route whose method and path
/// match (and whose bearer token matches, for routes registered with one).
/// A request no route answers fails as a connection error.
#[derive(Default)]
pub struct MockHttpTransport {
    routes: Mutex<Vec<MockRoute>>,
    request_history: Mutex<Vec<HttpRequest>>,
}

impl MockHttpTransport {
    /// Create new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    fn push_route(&self, route: MockRoute) -> &Self {
        self.routes.lock().unwrap().push(route);
        self
    }

    /// Answer `method path` with a JSON response.
    pub fn on_json<T: serde::Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        path: &str,
        status: u16,
        body: &T,
    ) -> &Self {
        let reply = MockReply::Response(HttpResponse::json(status, body));
        self.push_route(MockRoute::new(method, path, reply))
    }

    /// Answer the next `method path` request with a JSON response, then stop matching.
    pub fn on_json_once<T: serde::Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        path: &str,
        status: u16,
        body: &T,
    ) -> &Self {
        let reply = MockReply::Response(HttpResponse::json(status, body));
        self.push_route(MockRoute {
            once: true,
            ..MockRoute::new(method, path, reply)
        })
    }

    /// Answer `method path` with a JSON response only when `bearer` is presented.
    pub fn on_json_with_bearer<T: serde::Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        path: &str,
        bearer: &str,
        status: u16,
        body: &T,
    ) -> &Self {
        let reply = MockReply::Response(HttpResponse::json(status, body));
        self.push_route(MockRoute {
            bearer: Some(bearer.to_string()),
            ..MockRoute::new(method, path, reply)
        })
    }

    /// Answer `method path` with a JSON response after a delay.
    pub fn on_json_delayed<T: serde::Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        path: &str,
        status: u16,
        body: &T,
        latency: Duration,
    ) -> &Self {
        let reply = MockReply::Response(HttpResponse::json(status, body));
        self.push_route(MockRoute {
            latency: Some(latency),
            ..MockRoute::new(method, path, reply)
        })
    }

    /// Answer `method path` with a raw response.
    pub fn on_response(&self, method: HttpMethod, path: &str, response: HttpResponse) -> &Self {
        self.push_route(MockRoute::new(method, path, MockReply::Response(response)))
    }

    /// Fail `method path` at the transport level.
    pub fn on_connection_failure(&self, method: HttpMethod, path: &str, message: &str) -> &Self {
        let reply = MockReply::ConnectionFailure(message.to_string());
        self.push_route(MockRoute::new(method, path, reply))
    }

    /// Get request history.
    pub fn get_requests(&self) -> Vec<HttpRequest> {
        self.request_history.lock().unwrap().clone()
    }

    /// Get requests sent to `method path`.
    pub fn get_requests_to(&self, method: HttpMethod, path: &str) -> Vec<HttpRequest> {
        self.request_history
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && r.path() == path)
            .cloned()
            .collect()
    }

    /// Get last request.
    pub fn get_last_request(&self) -> Option<HttpRequest> {
        self.request_history.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl HttpTransport for MockHttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
        let path = request.path();
        let route = {
            let mut routes = self.routes.lock().unwrap();
            match routes.iter().position(|route| route.matches(&request, &path)) {
                Some(index) if routes[index].once => Some(routes.remove(index)),
                Some(index) => Some(routes[index].clone()),
                None => None,
            }
        };

        let description = format!("{} {}", request.method, path);
        self.request_history.lock().unwrap().push(request);

        let route = route.ok_or_else(|| {
            ClientError::Network(NetworkError::ConnectionFailed {
                message: format!("No mock route for {}", description),
            })
        })?;

        if let Some(latency) = route.latency {
            tokio::time::sleep(latency).await;
        }

        match route.reply {
            MockReply::Response(response) => Ok(response),
            MockReply::ConnectionFailure(message) => {
                Err(ClientError::Network(NetworkError::ConnectionFailed { message }))
            }
        }
    }
}
