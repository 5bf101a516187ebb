// transport.rs
use super::{ClientConfig, ScannerError, TransportError};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

pub const CLIENT_NAME: &str = "scanner-sdk";
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Authenticated HTTP wrapper. Every call carries the bearer token and client
/// identification headers, and every failure comes back classified.
#[derive(Debug, Clone)]
pub struct Transport {
    client: Client,
    base_url: String,
    debug: bool,
}

impl Transport {
    pub fn new(config: &ClientConfig) -> Result<Self, ScannerError> {
        config.validate()?;

        let client = build_client(config)?;

        Ok(Transport {
            client,
            base_url: config.api_endpoint.trim_end_matches('/').to_string(),
            debug: config.debug,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, format!("{}{}", self.base_url, path))
    }

    /// Sends the request and turns anything but a 2xx into an error.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, TransportError> {
        let request = builder.build()?;

        if self.debug {
            info!(method = %request.method(), url = %request.url(), "sending request");
        }

        let response = self
            .client
            .execute(request)
            .await
            .map_err(classify_send_error)?;

        let status = response.status();
        if self.debug {
            info!(status = status.as_u16(), "response received");
        }

        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            return Err(ScannerError::from_response(status.as_u16(), &body).into());
        }

        Ok(response)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransportError> {
        let response = self.send(self.request(Method::GET, path)).await?;
        decode(response).await
    }

    pub async fn get_json_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T, TransportError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let response = self.send(self.request(Method::GET, path).query(query)).await?;
        decode(response).await
    }

    pub async fn get_bytes_with_query<Q>(&self, path: &str, query: &Q) -> Result<Vec<u8>, TransportError>
    where
        Q: Serialize + ?Sized,
    {
        let response = self.send(self.request(Method::GET, path).query(query)).await?;
        let body = response.bytes().await.map_err(classify_send_error)?;
        Ok(body.to_vec())
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, TransportError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(self.request(Method::POST, path).json(body)).await?;
        decode(response).await
    }

    /// POST without a body; the response body is ignored.
    pub async fn post_empty(&self, path: &str) -> Result<(), TransportError> {
        self.send(self.request(Method::POST, path)).await?;
        Ok(())
    }

    /// GET whose only interesting outcome is the status.
    pub async fn get_empty(&self, path: &str) -> Result<(), TransportError> {
        self.send(self.request(Method::GET, path)).await?;
        Ok(())
    }
}

fn build_client(config: &ClientConfig) -> Result<Client, ScannerError> {
    let mut headers = HeaderMap::new();

    let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
        .map_err(|e| ScannerError::new(format!("Invalid API key: {}", e)))?;
    auth.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth);
    headers.insert("x-client", HeaderValue::from_static(CLIENT_NAME));
    headers.insert("x-client-version", HeaderValue::from_static(CLIENT_VERSION));

    Client::builder()
        .timeout(config.timeout)
        .default_headers(headers)
        .build()
        .map_err(|e| ScannerError::new(format!("Failed to create HTTP client: {}", e)))
}

/// Errors out of `execute` or a body read mean the request left but no full
/// response came back, except for builder errors which never reached the wire.
fn classify_send_error(err: reqwest::Error) -> TransportError {
    if err.is_builder() {
        TransportError::Request(err)
    } else {
        TransportError::Scanner(ScannerError::network())
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, TransportError> {
    let body = response.bytes().await.map_err(classify_send_error)?;
    Ok(serde_json::from_slice(&body)?)
}
