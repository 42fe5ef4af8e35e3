//! Pinning proxy client
//!
//! Talks to an operator-run proxy in front of the pinning service. The proxy
//! holds the upstream credentials; no token material ever ships in this
//! client. Writes go to the pin API, reads come from the content gateway.

use std::time::Duration;

use async_trait::async_trait;
use cid::Cid;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use super::ContentStore;
use crate::error::{ClientError, Result};
use crate::types::ContentHash;

/// Raw codec for CIDv1; only raw blocks can be digest-checked locally.
const RAW_CODEC: u64 = 0x55;

#[derive(Debug, Deserialize)]
struct PinResponse {
    hash: String,
}

pub struct PinningClient {
    http: reqwest::Client,
    api_url: String,
    gateway_url: String,
}

impl PinningClient {
    pub fn new(api_url: &str, gateway_url: &str, timeout_secs: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ClientError::InvalidConfig(e.to_string()))?;
        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            gateway_url: gateway_url.trim_end_matches('/').to_string(),
        })
    }

    async fn parse_pin_response(&self, response: reqwest::Response) -> Result<ContentHash> {
        if !response.status().is_success() {
            return Err(ClientError::StoreUnavailable(format!(
                "pin failed: HTTP {}",
                response.status()
            )));
        }
        let pin: PinResponse = response
            .json()
            .await
            .map_err(|e| ClientError::StoreUnavailable(format!("malformed pin response: {e}")))?;
        ContentHash::parse(&pin.hash)
    }
}

#[async_trait]
impl ContentStore for PinningClient {
    async fn put(&self, bytes: Vec<u8>) -> Result<ContentHash> {
        debug!(size = bytes.len(), "Pinning blob");
        let response = self
            .http
            .post(format!("{}/pins", self.api_url))
            .header("content-type", "application/octet-stream")
            .body(bytes)
            .send()
            .await
            .map_err(|e| ClientError::StoreUnavailable(e.to_string()))?;
        self.parse_pin_response(response).await
    }

    async fn put_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<ContentHash> {
        debug!(file_name, size = bytes.len(), "Pinning file");
        let part = Part::bytes(bytes).file_name(file_name.to_string());
        let form = Form::new().part("file", part);
        let response = self
            .http
            .post(format!("{}/pins/file", self.api_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ClientError::StoreUnavailable(e.to_string()))?;
        self.parse_pin_response(response).await
    }

    async fn get(&self, hash: &ContentHash) -> Result<Vec<u8>> {
        let url = self.public_url(hash);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ClientError::StoreUnavailable(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(ClientError::NotFound(hash.clone())),
            status if !status.is_success() => {
                return Err(ClientError::StoreUnavailable(format!("HTTP {status}")));
            }
            _ => {}
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::StoreUnavailable(e.to_string()))?
            .to_vec();

        // Raw blocks can be checked against their own address.
        if let Ok(cid) = Cid::try_from(hash.as_str()) {
            if cid.codec() == RAW_CODEC && ContentHash::from_bytes(&bytes) != *hash {
                warn!(hash = %hash, "Gateway served bytes that do not match their address");
                return Err(ClientError::StoreUnavailable(
                    "content digest mismatch".to_string(),
                ));
            }
        }

        Ok(bytes)
    }

    fn public_url(&self, hash: &ContentHash) -> String {
        format!("{}/{}", self.gateway_url, hash)
    }
}
