//! HTTP client used by scenarios.
//!
//! Every request records the built-in `http_reqs`, `http_req_duration` and `http_req_failed`
//! metrics. Requests never return a Rust error: a transport failure becomes a [`Response`] with
//! status `0` and [`Response::error`] set, so scenario code stays straight-line.
use crate::metrics::{observe, Observation};
use crate::transaction::record_http_time;
use loadcheck_core::{base_url_from_env, builtin, ConfigError};
use reqwest::{header::CONTENT_TYPE, Client, Method};
use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, Instant};
#[allow(unused)]
use tracing::{debug, error, trace, warn};

/// A request relative to the client's base URL. Built fresh for every call.
#[derive(Clone, Debug)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub json: Option<Value>,
}

impl Request {
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            json: None,
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: &str) -> Self {
        Self::new(Method::POST, path)
    }

    /// Attach a JSON body, which also sets `Content-Type: application/json`.
    pub fn json(mut self, body: Value) -> Self {
        self.json = Some(body);
        self
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Timings {
    /// Time from sending the request until the whole body was read.
    pub duration: Duration,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    /// HTTP status, or `0` when no response was received.
    pub status: u16,
    pub body: String,
    pub timings: Timings,
    pub error: Option<String>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            timings: Timings::default(),
            error: None,
        }
    }

    fn transport_error(error: String, duration: Duration) -> Self {
        Self {
            status: 0,
            body: String::new(),
            timings: Timings { duration },
            error: Some(error),
        }
    }

    /// Whether this counts toward `http_req_failed`.
    pub fn is_failure(&self) -> bool {
        !(200..=399).contains(&self.status)
    }

    /// The parsed body, or `None` if it is not JSON.
    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }

    /// A top-level field of a JSON object body; `None` if absent or the body is not an object.
    pub fn json_field(&self, field: &str) -> Option<Value> {
        match self.json()? {
            Value::Object(mut map) => map.remove(field),
            _ => None,
        }
    }

    pub fn is_json_array(&self) -> bool {
        matches!(self.json(), Some(Value::Array(_)))
    }

    pub fn body_contains(&self, needle: &str) -> bool {
        self.body.contains(needle)
    }

    pub fn duration_ms(&self) -> f64 {
        self.timings.duration.as_secs_f64() * 1_000.
    }
}

/// Cheap to clone; clones share one connection pool.
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Client for the URL in `BASE_URL`, or the default target.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(&base_url_from_env()?))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get(&self, path: &str) -> Response {
        self.send(Request::get(path)).await
    }

    /// A body that fails to serialize is reported like a transport error.
    pub async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Response {
        match serde_json::to_value(body) {
            Ok(body) => self.send(Request::post(path).json(body)).await,
            Err(err) => {
                error!("POST {path} body did not serialize: {err}");
                let res = Response::transport_error(err.to_string(), Duration::ZERO);
                record(&res);
                res
            }
        }
    }

    pub async fn send(&self, request: Request) -> Response {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.client.request(request.method.clone(), &url);
        if let Some(body) = &request.json {
            builder = builder
                .header(CONTENT_TYPE, "application/json")
                .body(body.to_string());
        }

        let start = Instant::now();
        let res = match builder.send().await {
            Ok(res) => {
                let status = res.status().as_u16();
                match res.text().await {
                    Ok(body) => Response {
                        status,
                        body,
                        timings: Timings {
                            duration: start.elapsed(),
                        },
                        error: None,
                    },
                    Err(err) => Response::transport_error(err.to_string(), start.elapsed()),
                }
            }
            Err(err) => Response::transport_error(err.to_string(), start.elapsed()),
        };

        if let Some(err) = &res.error {
            debug!("{} {url} failed: {err}", request.method);
        } else {
            trace!("{} {url} -> {}", request.method, res.status);
        }

        record(&res);
        res
    }
}

fn record(res: &Response) {
    record_http_time(res.timings.duration);
    observe(builtin::HTTP_REQS, Observation::Counter(1));
    observe(
        builtin::HTTP_REQ_DURATION,
        Observation::Trend(res.duration_ms()),
    );
    observe(builtin::HTTP_REQ_FAILED, Observation::Rate(res.is_failure()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricRegistry;

    #[test]
    fn test_failure_classification() {
        assert!(!Response::new(200, "").is_failure());
        assert!(!Response::new(201, "").is_failure());
        assert!(!Response::new(302, "").is_failure());
        assert!(Response::new(404, "").is_failure());
        assert!(Response::new(500, "").is_failure());
        assert!(Response::new(0, "").is_failure());
    }

    #[test]
    fn test_json_helpers() {
        let res = Response::new(200, r#"{"status":"healthy","result":null}"#);
        assert_eq!(res.json_field("status"), Some(Value::from("healthy")));
        // A present null still counts as a defined field
        assert_eq!(res.json_field("result"), Some(Value::Null));
        assert_eq!(res.json_field("missing"), None);
        assert!(!res.is_json_array());

        assert!(Response::new(200, "[]").is_json_array());
        assert_eq!(Response::new(200, "[1]").json_field("status"), None);

        let garbage = Response::new(200, "<html>oops");
        assert_eq!(garbage.json(), None);
        assert_eq!(garbage.json_field("result"), None);
    }

    #[test]
    fn test_request_builder() {
        let req = Request::post("/api/v1/items").json(serde_json::json!({"name": "Item 1"}));
        assert_eq!(req.method, Method::POST);
        assert_eq!(req.path, "/api/v1/items");
        assert_eq!(req.json, Some(serde_json::json!({"name": "Item 1"})));
    }

    #[test]
    fn test_base_url_trimmed() {
        let client = HttpClient::new("http://localhost:8000/");
        assert_eq!(client.base_url(), "http://localhost:8000");
    }

    #[tokio::test]
    #[ntest::timeout(10_000)]
    async fn test_connection_error_is_recorded() {
        // Port 9 (discard) is essentially never listening on localhost.
        let client = HttpClient::new("http://127.0.0.1:9");
        let registry = MetricRegistry::new();

        let res = registry.scope(client.get("/health")).await;
        assert_eq!(res.status, 0);
        assert!(res.error.is_some());

        let snapshot = registry.snapshot(Duration::from_secs(1), &[]);
        assert_eq!(snapshot.value(builtin::HTTP_REQS, "count"), Some(1.));
        assert_eq!(snapshot.value(builtin::HTTP_REQ_FAILED, "rate"), Some(1.));
        assert!(snapshot.value(builtin::HTTP_REQ_DURATION, "max").is_some());
    }
}
