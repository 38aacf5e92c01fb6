//! Thin HTTP gateway to the marketplace REST backend.
//!
//! Every call goes through [`ApiClient::request`], which attaches the
//! session's bearer token, enforces a deadline, honours a cancellation
//! token, and turns non-2xx responses into [`ApiError::Http`] carrying the
//! body text. Requests are never retried.

pub mod endpoints;

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::errors::ApiError;
use crate::session::Session;

pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    /// Content type (and boundary) are left to reqwest.
    Multipart(reqwest::multipart::Form),
}

pub struct ApiRequest {
    method: Method,
    path: String,
    body: RequestBody,
    timeout: Option<Duration>,
    cancel: Option<CancellationToken>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: RequestBody::Empty,
            timeout: None,
            cancel: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json<B: Serialize>(mut self, body: &B) -> Result<Self, ApiError> {
        let value =
            serde_json::to_value(body).map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    pub fn multipart(mut self, form: reqwest::multipart::Form) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn cancel_with(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    default_timeout: Duration,
    session: Arc<Session>,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, default_timeout: Duration, session: Arc<Session>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            default_timeout,
            session,
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub async fn request<T: DeserializeOwned>(&self, req: ApiRequest) -> Result<T, ApiError> {
        let ApiRequest {
            method,
            path,
            body,
            timeout,
            cancel,
        } = req;

        let url = format!("{}{}", self.base_url, path);
        let deadline = timeout.unwrap_or(self.default_timeout);

        let mut builder = self.client.request(method.clone(), &url);
        if let Some(token) = self.session.token() {
            builder = builder.bearer_auth(token);
        }
        builder = match body {
            RequestBody::Empty => builder.header(CONTENT_TYPE, "application/json"),
            RequestBody::Json(value) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(value.to_string()),
            RequestBody::Multipart(form) => builder.multipart(form),
        };

        tracing::debug!(%method, %path, "sending API request");

        let exchange = async {
            let resp = builder
                .send()
                .await
                .map_err(|e| ApiError::Transport(e.to_string()))?;
            let status = resp.status();
            let text = resp
                .text()
                .await
                .map_err(|e| ApiError::Transport(e.to_string()))?;
            Ok::<_, ApiError>((status, text))
        };
        let bounded = tokio::time::timeout(deadline, exchange);

        let outcome = match cancel {
            Some(token) => tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!(%method, %path, "API request cancelled");
                    return Err(ApiError::Cancelled);
                }
                res = bounded => res,
            },
            None => bounded.await,
        };

        let (status, text) = match outcome {
            Ok(res) => res?,
            Err(_) => {
                tracing::warn!(%method, %path, ?deadline, "API request timed out");
                return Err(ApiError::Timeout(deadline));
            }
        };

        if !status.is_success() {
            tracing::warn!(%method, %path, status = status.as_u16(), "API request failed");
            return Err(ApiError::http(status.as_u16(), &text));
        }

        let payload = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str(payload).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::session::Credentials;
    use wiremock::matchers::{body_json, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn client(server: &MockServer, session: Session) -> ApiClient {
        ApiClient::new(server.uri(), Duration::from_secs(5), Arc::new(session))
    }

    fn logged_in() -> Session {
        let session = Session::in_memory();
        session
            .login(Credentials {
                token: "tok-123".to_string(),
                role: Role::Admin,
            })
            .unwrap();
        session
    }

    #[tokio::test]
    async fn test_injects_bearer_token_and_json_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bookings"))
            .and(header("authorization", "Bearer tok-123"))
            .and(header("content-type", "application/json"))
            .and(body_json(serde_json::json!({"serviceId": 1})))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": 9})))
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server, logged_in());
        let req = ApiRequest::post("/bookings")
            .json(&serde_json::json!({"serviceId": 1}))
            .unwrap();
        let res: serde_json::Value = api.request(req).await.unwrap();
        assert_eq!(res["id"], 9);
    }

    #[tokio::test]
    async fn test_omits_auth_header_without_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/services"))
            .respond_with(|req: &Request| {
                if req.headers.contains_key("authorization") {
                    ResponseTemplate::new(400)
                } else {
                    ResponseTemplate::new(200).set_body_json(serde_json::json!([]))
                }
            })
            .mount(&server)
            .await;

        let api = client(&server, Session::in_memory());
        let res: Vec<serde_json::Value> = api.request(ApiRequest::get("/services")).await.unwrap();
        assert!(res.is_empty());
    }

    #[tokio::test]
    async fn test_multipart_leaves_content_type_to_runtime() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/services"))
            .and(header_exists("content-type"))
            .respond_with(|req: &Request| {
                let ct = req
                    .headers
                    .get("content-type")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                if ct.starts_with("multipart/form-data; boundary=") {
                    ResponseTemplate::new(201).set_body_json(serde_json::json!({"ok": true}))
                } else {
                    ResponseTemplate::new(415)
                }
            })
            .mount(&server)
            .await;

        let api = client(&server, logged_in());
        let form = reqwest::multipart::Form::new().text("name", "Gardening");
        let res: serde_json::Value = api
            .request(ApiRequest::post("/services").multipart(form))
            .await
            .unwrap();
        assert_eq!(res["ok"], true);
    }

    #[tokio::test]
    async fn test_non_success_carries_body_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bookings"))
            .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden: admins only"))
            .mount(&server)
            .await;

        let api = client(&server, logged_in());
        let err = api
            .request::<serde_json::Value>(ApiRequest::get("/bookings"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ApiError::Http {
                status: 403,
                message: "Forbidden: admins only".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_non_success_empty_body_uses_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/reviews/4"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let api = client(&server, logged_in());
        let err = api
            .request::<serde_json::Value>(ApiRequest::delete("/reviews/4"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "API error occurred");
    }

    #[tokio::test]
    async fn test_empty_success_body_decodes_as_null() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/services/2"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let api = client(&server, logged_in());
        let res: serde_json::Value = api.request(ApiRequest::delete("/services/2")).await.unwrap();
        assert!(res.is_null());
    }

    #[tokio::test]
    async fn test_schema_mismatch_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/services/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "x"})))
            .mount(&server)
            .await;

        let api = client(&server, logged_in());
        let err = api
            .request::<crate::models::Service>(ApiRequest::get("/services/1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[tokio::test]
    async fn test_deadline_yields_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/services"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([]))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let api = client(&server, logged_in());
        let err = api
            .request::<serde_json::Value>(
                ApiRequest::get("/services").timeout(Duration::from_millis(50)),
            )
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::Timeout(Duration::from_millis(50)));
    }

    #[tokio::test]
    async fn test_cancel_token_aborts_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bookings"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([]))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let api = client(&server, logged_in());
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = api
            .request::<serde_json::Value>(ApiRequest::get("/bookings").cancel_with(token))
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::Cancelled);
    }
}
