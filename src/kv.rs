//! Client for the remote configuration key-value API.
//!
//! The backend exposes `GET/POST/PUT/DELETE {base}/v1/config/{a/b/c}` and
//! wraps every response in `{"status":"success","data":...}` or
//! `{"status":"error","message":...}`. Every failure (HTTP error, timeout,
//! network, unexpected body) is mapped to one [`ClientApiError`] shape.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP status reported for client-side (network) failures.
pub const STATUS_NETWORK_ERROR: u16 = 0;
/// HTTP status reported when a request times out.
pub const STATUS_TIMEOUT: u16 = 408;
/// HTTP status reported when a received value cannot be decoded.
pub const STATUS_DECODE_ERROR: u16 = 500;

/// Uniform error returned by every API call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (HTTP {http_status})")]
pub struct ClientApiError {
    /// Response status, `0` for network failures, `408` for timeouts.
    pub http_status: u16,
    pub message: String,
}

impl ClientApiError {
    fn new(http_status: u16, message: impl Into<String>) -> Self {
        Self {
            http_status,
            message: message.into(),
        }
    }
}

/// Successful API call: the response status plus the unwrapped `data`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiSuccess<T> {
    pub http_status: u16,
    pub data: T,
}

pub type ApiResult<T> = Result<ApiSuccess<T>, ClientApiError>;

/// Encoding of a stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Json,
    String,
    Base64,
}

/// `data` of a successful GET.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetValueResponse {
    pub key: String,
    pub value: Value,
    #[serde(rename = "type")]
    pub value_type: ValueType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModifyStatus {
    Created,
    Updated,
    Deleted,
}

/// `data` of a successful POST, PUT or DELETE.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyValueResponse {
    pub status: ModifyStatus,
    pub key: String,
}

/// Convert a dotted key into a URL path: `site.title` -> `site/title`.
pub fn key_to_path(key: &str) -> String {
    key.replace('.', "/")
}

/// Decode a base64 value received for `key` into a UTF-8 string.
pub fn decode_base64_value(key: &str, value: &Value) -> Result<String, ClientApiError> {
    let decode_error = || {
        ClientApiError::new(
            STATUS_DECODE_ERROR,
            format!(
                "Failed to decode a malformed base64 value received from the server for key \"{}\".",
                key
            ),
        )
    };

    let encoded = value.as_str().ok_or_else(decode_error)?;
    let bytes = BASE64.decode(encoded.trim()).map_err(|e| {
        error!("Failed to decode base64 value for key \"{}\": {}", key, e);
        decode_error()
    })?;
    String::from_utf8(bytes).map_err(|e| {
        error!("Decoded value for key \"{}\" is not UTF-8: {}", key, e);
        decode_error()
    })
}

/// Remote configuration API client.
#[derive(Debug, Clone)]
pub struct KvClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl KvClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, timeout)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a request and unwrap the backend envelope.
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> ApiResult<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);

        let mut builder = self
            .client
            .request(method, &url)
            .timeout(self.timeout)
            .header("Content-Type", "application/json");
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| self.transport_error(e))?;
        let http_status = response.status().as_u16();
        let envelope: Value = response.json().await.map_err(|e| self.transport_error(e))?;

        if envelope.get("status").and_then(Value::as_str) == Some("success") {
            let data = envelope.get("data").cloned().unwrap_or(Value::Null);
            return serde_json::from_value(data)
                .map(|data| ApiSuccess { http_status, data })
                .map_err(|e| {
                    ClientApiError::new(http_status, format!("Unexpected response data: {}", e))
                });
        }

        let message = envelope
            .get("message")
            .and_then(Value::as_str)
            .filter(|message| !message.is_empty())
            .unwrap_or("An unknown error occurred.");
        Err(ClientApiError::new(http_status, message))
    }

    fn transport_error(&self, e: reqwest::Error) -> ClientApiError {
        if e.is_timeout() {
            ClientApiError::new(
                STATUS_TIMEOUT,
                format!("Request timed out after {} seconds.", self.timeout.as_secs_f64()),
            )
        } else {
            ClientApiError::new(STATUS_NETWORK_ERROR, e.to_string())
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.request(Method::GET, path, None).await
    }

    pub async fn post<T: DeserializeOwned>(&self, path: &str, json: &Value) -> ApiResult<T> {
        self.request(Method::POST, path, Some(json)).await
    }

    pub async fn put<T: DeserializeOwned>(&self, path: &str, json: &Value) -> ApiResult<T> {
        self.request(Method::PUT, path, Some(json)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.request(Method::DELETE, path, None).await
    }

    /// Fetch a value. Base64 values are decoded and reported as strings;
    /// a malformed payload is an error naming the key.
    pub async fn get_value(&self, key: &str) -> ApiResult<GetValueResponse> {
        let mut response: ApiSuccess<GetValueResponse> =
            self.get(&format!("/v1/config/{}", key_to_path(key))).await?;

        if response.data.value_type == ValueType::Base64 {
            let decoded = decode_base64_value(key, &response.data.value)?;
            response.data.value = Value::String(decoded);
            response.data.value_type = ValueType::String;
        }

        Ok(response)
    }

    pub async fn create_value(&self, key: &str, value: &Value) -> ApiResult<ModifyValueResponse> {
        self.post(&format!("/v1/config/{}", key_to_path(key)), value).await
    }

    pub async fn update_value(&self, key: &str, value: &Value) -> ApiResult<ModifyValueResponse> {
        self.put(&format!("/v1/config/{}", key_to_path(key)), value).await
    }

    pub async fn delete_value(&self, key: &str) -> ApiResult<ModifyValueResponse> {
        self.delete(&format!("/v1/config/{}", key_to_path(key))).await
    }

    /// Fetch the raw value for `key`, or `fallback` on any failure, on a
    /// missing/empty value, or when it does not deserialize as `T`.
    pub async fn get_raw_value<T: DeserializeOwned>(&self, key: &str, fallback: T) -> T {
        match self.get::<GetValueResponse>(&format!("/v1/config/{}", key_to_path(key))).await {
            Ok(ApiSuccess { data, .. }) if is_present(&data.value) => {
                serde_json::from_value(data.value).unwrap_or(fallback)
            }
            Ok(_) => fallback,
            Err(e) => {
                debug!("Using fallback for \"{}\": {}", key, e);
                fallback
            }
        }
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> KvClient {
        KvClient::new(server.uri(), Duration::from_secs(2))
    }

    // ==================== Helper Tests ====================

    #[test]
    fn test_key_to_path() {
        assert_eq!(key_to_path("site.title"), "site/title");
        assert_eq!(key_to_path("a.b.c"), "a/b/c");
        assert_eq!(key_to_path("plain"), "plain");
    }

    #[test]
    fn test_decode_base64_value() {
        assert_eq!(
            decode_base64_value("site.quote", &json!("5pyI44GL44GS56m6")).unwrap(),
            "月かげ空"
        );
    }

    #[test]
    fn test_decode_base64_value_rejects_garbage() {
        let err = decode_base64_value("site.quote", &json!("%%% not base64 %%%")).unwrap_err();
        assert_eq!(err.http_status, STATUS_DECODE_ERROR);
        assert!(err.message.contains("\"site.quote\""));
    }

    #[test]
    fn test_decode_base64_value_rejects_non_string() {
        assert!(decode_base64_value("site.quote", &json!(42)).is_err());
    }

    // ==================== GET Tests ====================

    #[tokio::test]
    async fn test_get_value_string() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/config/site/title"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": { "key": "site.title", "value": "月かげ空", "type": "string" }
            })))
            .mount(&server)
            .await;

        let response = client(&server).get_value("site.title").await.unwrap();
        assert_eq!(response.http_status, 200);
        assert_eq!(response.data.value, json!("月かげ空"));
        assert_eq!(response.data.value_type, ValueType::String);
    }

    #[tokio::test]
    async fn test_get_value_decodes_base64() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/config/site/quote"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": { "key": "site.quote", "value": BASE64.encode("致虚无，心を守。"), "type": "base64" }
            })))
            .mount(&server)
            .await;

        let response = client(&server).get_value("site.quote").await.unwrap();
        assert_eq!(response.data.value, json!("致虚无，心を守。"));
        assert_eq!(response.data.value_type, ValueType::String);
    }

    #[tokio::test]
    async fn test_get_value_malformed_base64_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/config/site/quote"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": { "key": "site.quote", "value": "!!!", "type": "base64" }
            })))
            .mount(&server)
            .await;

        let err = client(&server).get_value("site.quote").await.unwrap_err();
        assert_eq!(err.http_status, 500);
        assert!(err.message.contains("site.quote"));
    }

    #[tokio::test]
    async fn test_error_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/config/missing/key"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "status": "error",
                "message": "Key not found"
            })))
            .mount(&server)
            .await;

        let err = client(&server).get_value("missing.key").await.unwrap_err();
        assert_eq!(err, ClientApiError::new(404, "Key not found"));
    }

    #[tokio::test]
    async fn test_unexpected_envelope_uses_generic_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/config/odd"))
            .respond_with(ResponseTemplate::new(502).set_body_json(json!({ "hello": "world" })))
            .mount(&server)
            .await;

        let err = client(&server).get_value("odd").await.unwrap_err();
        assert_eq!(err.http_status, 502);
        assert_eq!(err.message, "An unknown error occurred.");
    }

    #[tokio::test]
    async fn test_non_json_body_is_network_class_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/config/html"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let err = client(&server).get_value("html").await.unwrap_err();
        assert_eq!(err.http_status, STATUS_NETWORK_ERROR);
    }

    #[tokio::test]
    async fn test_timeout_maps_to_408() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/config/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "status": "success", "data": null }))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let client = KvClient::new(server.uri(), Duration::from_millis(200));
        let err = client.get_value("slow").await.unwrap_err();
        assert_eq!(err.http_status, STATUS_TIMEOUT);
        assert_eq!(err.message, "Request timed out after 0.2 seconds.");
    }

    #[tokio::test]
    async fn test_connection_refused_maps_to_0() {
        let client = KvClient::new("http://127.0.0.1:1", Duration::from_secs(1));
        let err = client.get_value("site.title").await.unwrap_err();
        assert_eq!(err.http_status, STATUS_NETWORK_ERROR);
    }

    // ==================== Mutation Tests ====================

    #[tokio::test]
    async fn test_create_update_delete() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/config/site/new"))
            .and(body_json(json!({ "enabled": true })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "status": "success",
                "data": { "status": "created", "key": "site.new" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/v1/config/site/new"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": { "status": "updated", "key": "site.new" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/v1/config/site/new"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": { "status": "deleted", "key": "site.new" }
            })))
            .mount(&server)
            .await;

        let client = client(&server);
        let created = client.create_value("site.new", &json!({ "enabled": true })).await.unwrap();
        assert_eq!(created.http_status, 201);
        assert_eq!(created.data.status, ModifyStatus::Created);

        let updated = client.update_value("site.new", &json!(false)).await.unwrap();
        assert_eq!(updated.data.status, ModifyStatus::Updated);

        let deleted = client.delete_value("site.new").await.unwrap();
        assert_eq!(deleted.data.status, ModifyStatus::Deleted);
        assert_eq!(deleted.data.key, "site.new");
    }

    // ==================== Raw Value Tests ====================

    #[tokio::test]
    async fn test_get_raw_value_returns_value_or_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/config/site/inception"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": { "key": "site.inception", "value": 2019, "type": "json" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/config/owner/name"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": { "key": "owner.name", "value": "", "type": "string" }
            })))
            .mount(&server)
            .await;

        let client = client(&server);
        assert_eq!(client.get_raw_value("site.inception", 2021u32).await, 2019);
        assert_eq!(
            client.get_raw_value("owner.name", "Canmi".to_string()).await,
            "Canmi"
        );
        assert_eq!(client.get_raw_value("not.mounted", 7i64).await, 7);
    }
}
