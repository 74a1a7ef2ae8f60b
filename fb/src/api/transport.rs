//! Transport trait and the reqwest-backed implementation

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Json(Value),
    /// `application/x-www-form-urlencoded` pairs (used by the login endpoint)
    Form(Vec<(String, String)>),
}

/// One backend call, independent of how it is sent
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the base URL, starting with `/`
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Body,
    pub token: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: Body::Empty,
            token: None,
        }
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    pub fn token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }
}

/// Sends requests to the backend
///
/// Implementations return the decoded JSON body of a 2xx response (`Null`
/// for an empty body) and map everything else to an [`ApiError`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError>;
}

/// HTTP transport over reqwest
pub struct HttpTransport {
    base_url: String,
    http: Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(%base_url, ?timeout, "HttpTransport::new: called");
        let http = Client::builder().timeout(timeout).build().map_err(ApiError::Network)?;
        Ok(Self {
            base_url,
            http,
            timeout,
        })
    }

    fn map_send_error(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout(self.timeout)
        } else {
            ApiError::Network(err)
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, request.path);
        debug!(method = ?request.method, %url, "HttpTransport::send: called");

        let mut builder = self.http.request(request.method.into(), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &request.token {
            builder = builder.bearer_auth(token);
        }
        builder = match &request.body {
            Body::Empty => builder,
            Body::Json(value) => builder.json(value),
            Body::Form(pairs) => builder.form(pairs),
        };

        let response = builder.send().await.map_err(|e| self.map_send_error(e))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| self.map_send_error(e))?;
        debug!(status = status.as_u16(), body_len = text.len(), "HttpTransport::send: response");

        if !status.is_success() {
            return Err(ApiError::from_status(status.as_u16(), &text));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        // Success is decided by the status; a body that is not JSON is kept as
        // text and fails later, when the caller decodes it.
        match serde_json::from_str(&text) {
            Ok(value) => Ok(value),
            Err(err) => {
                debug!(error = %err, "HttpTransport::send: response body is not JSON");
                Ok(Value::String(text))
            }
        }
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use tracing::debug;

    #[derive(Debug, Clone)]
    enum Reply {
        Ok(Value),
        Status(u16, String),
    }

    /// Route-based transport for unit tests
    ///
    /// Each route holds a queue of replies. Replies are consumed in order
    /// and the last one repeats forever. Unknown routes answer 404.
    #[derive(Default)]
    pub struct MockTransport {
        routes: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
        requests: Mutex<Vec<ApiRequest>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a successful reply for `method path`
        pub fn ok(self, method: Method, path: &str, body: Value) -> Self {
            self.push(method, path, Reply::Ok(body));
            self
        }

        /// Queue a failed reply for `method path`
        pub fn status(self, method: Method, path: &str, status: u16, body: &str) -> Self {
            self.push(method, path, Reply::Status(status, body.to_string()));
            self
        }

        fn push(&self, method: Method, path: &str, reply: Reply) {
            self.routes
                .lock()
                .unwrap()
                .entry((method, path.to_string()))
                .or_default()
                .push_back(reply);
        }

        /// Every request seen so far, in arrival order
        pub fn requests(&self) -> Vec<ApiRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub fn count(&self, method: Method, path: &str) -> usize {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.method == method && r.path == path)
                .count()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
            debug!(method = ?request.method, path = %request.path, "MockTransport::send: called");
            let key = (request.method, request.path.clone());
            self.requests.lock().unwrap().push(request);

            let reply = {
                let mut routes = self.routes.lock().unwrap();
                match routes.get_mut(&key) {
                    Some(queue) if queue.len() > 1 => queue.pop_front(),
                    Some(queue) => queue.front().cloned(),
                    None => None,
                }
            };

            match reply {
                Some(Reply::Ok(value)) => Ok(value),
                Some(Reply::Status(status, body)) => Err(ApiError::from_status(status, &body)),
                None => Err(ApiError::from_status(404, r#"{"detail": "Not Found"}"#)),
            }
        }
    }

    #[tokio::test]
    async fn test_mock_replays_queue_then_repeats_last() {
        let transport = MockTransport::new()
            .ok(Method::Get, "/categories/", serde_json::json!([1]))
            .status(Method::Get, "/categories/", 500, "");

        let req = ApiRequest::new(Method::Get, "/categories/");
        assert!(transport.send(req.clone()).await.is_ok());
        assert!(transport.send(req.clone()).await.is_err());
        assert!(transport.send(req.clone()).await.is_err());
        assert_eq!(transport.count(Method::Get, "/categories/"), 3);

        let missing = transport.send(ApiRequest::new(Method::Get, "/nope")).await;
        assert_eq!(missing.unwrap_err().status(), Some(404));
    }
}
