use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};

use crate::error::AnalyticsError;

/// Response header pointing at a long-running operation.
pub const OPERATION_LOCATION_HEADER: &str = "operation-location";

/// What the pipeline needs from an HTTP response.
#[derive(Debug, Clone)]
pub struct ServiceResponse {
    pub status: u16,
    pub operation_location: Option<String>,
    pub body: String,
}

impl ServiceResponse {
    /// Parse the body as JSON. The service reports errors in the body, so
    /// the status code is only used for diagnostics.
    pub fn json(&self) -> Result<serde_json::Value, AnalyticsError> {
        serde_json::from_str(&self.body).map_err(|e| AnalyticsError::MalformedResponse {
            detail: format!("HTTP {}: body is not JSON ({e})", self.status),
            body: self.body.clone(),
        })
    }
}

/// Outbound transport to the analysis service.
///
/// One instance serves every request of a filter run; implementations
/// attach the credential header themselves.
pub trait ServiceClient: Send + Sync {
    /// POST a JSON body.
    fn post<'a>(
        &'a self,
        url: &'a str,
        body: &'a serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<ServiceResponse, AnalyticsError>> + Send + 'a>>;

    /// GET a JSON resource (operation status).
    fn get<'a>(
        &'a self,
        url: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<ServiceResponse, AnalyticsError>> + Send + 'a>>;
}

/// reqwest-backed client. The connection pool is reused across calls.
pub struct HttpServiceClient {
    http: reqwest::Client,
}

impl HttpServiceClient {
    pub fn new(subscription_key: &str, timeout: Option<Duration>) -> Result<Self, AnalyticsError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(subscription_key.trim())
            .map_err(|e| AnalyticsError::Config(format!("invalid subscription_key: {e}")))?;
        // Ocp-Apim-Subscription-Key
        headers.insert(HeaderName::from_static("ocp-apim-subscription-key"), key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| AnalyticsError::Config(format!("HTTP client: {e}")))?;
        Ok(Self { http })
    }

    async fn read(resp: reqwest::Response) -> Result<ServiceResponse, AnalyticsError> {
        let status = resp.status().as_u16();
        let operation_location = resp
            .headers()
            .get(OPERATION_LOCATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.text().await?;
        Ok(ServiceResponse {
            status,
            operation_location,
            body,
        })
    }
}

impl ServiceClient for HttpServiceClient {
    fn post<'a>(
        &'a self,
        url: &'a str,
        body: &'a serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<ServiceResponse, AnalyticsError>> + Send + 'a>> {
        Box::pin(async move {
            let resp = self.http.post(url).json(body).send().await?;
            Self::read(resp).await
        })
    }

    fn get<'a>(
        &'a self,
        url: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<ServiceResponse, AnalyticsError>> + Send + 'a>> {
        Box::pin(async move {
            let resp = self.http.get(url).send().await?;
            Self::read(resp).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_json_body_is_malformed() {
        let resp = ServiceResponse {
            status: 502,
            operation_location: None,
            body: "<html>bad gateway</html>".into(),
        };
        match resp.json().unwrap_err() {
            AnalyticsError::MalformedResponse { detail, body } => {
                assert!(detail.starts_with("HTTP 502"));
                assert_eq!(body, "<html>bad gateway</html>");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_key_with_control_characters() {
        assert!(matches!(
            HttpServiceClient::new("bad\nkey", None),
            Err(AnalyticsError::Config(_))
        ));
    }
}
