// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! reqwest implementation of the server system API.

use super::{RemoteStatus, ServerApi, ServerApiProvider, UpgradesResponse};
use crate::constants::{
    PING_PATH, PING_RESPONSE, SERVER_API_CONNECT_TIMEOUT_SECS, SERVER_API_REQUEST_TIMEOUT_SECS,
    STATUS_PATH, UPGRADES_PATH,
};
use crate::errors::ServerApiError;
use async_trait::async_trait;
use reqwest::{Client as HttpClient, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Normalizes a server address into a base URL without a trailing slash.
///
/// Bare `host:port` addresses get an `http://` scheme.
///
/// # Errors
///
/// Returns an error if the result does not parse as a URL.
pub fn build_base_url(server: &str) -> Result<String, ServerApiError> {
    let trimmed = server.trim().trim_end_matches('/');
    let base = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };

    Url::parse(&base).map_err(|source| ServerApiError::InvalidUrl {
        url: server.to_string(),
        source,
    })?;
    Ok(base)
}

/// Builds [`HttpServerApi`] handles that share one connection pool.
#[derive(Clone, Debug)]
pub struct HttpServerApiProvider {
    client: HttpClient,
}

impl HttpServerApiProvider {
    /// Create a provider whose requests time out after 5s to connect and 10s overall.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self, ServerApiError> {
        let client = HttpClient::builder()
            .connect_timeout(Duration::from_secs(SERVER_API_CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(SERVER_API_REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(ServerApiError::Client)?;
        Ok(Self { client })
    }
}

impl ServerApiProvider for HttpServerApiProvider {
    fn connect(&self, base_url: &str) -> Result<Box<dyn ServerApi>, ServerApiError> {
        Ok(Box::new(HttpServerApi {
            client: self.client.clone(),
            base_url: build_base_url(base_url)?,
        }))
    }
}

/// System API of one server.
#[derive(Clone, Debug)]
pub struct HttpServerApi {
    client: HttpClient,
    base_url: String,
}

impl HttpServerApi {
    async fn get(&self, path: &str) -> Result<(String, Response), ServerApiError> {
        let url = format!("{}{path}", self.base_url);
        debug!(url = %url, "Querying server API");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| ServerApiError::Request {
                url: url.clone(),
                source,
            })?;
        Ok((url, response))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ServerApiError> {
        let (url, response) = self.get(path).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ServerApiError::UnexpectedStatus {
                url,
                status: status.as_u16(),
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|source| ServerApiError::Request { url, source })
    }
}

#[async_trait]
impl ServerApi for HttpServerApi {
    async fn ping(&self) -> Result<(), ServerApiError> {
        let (url, response) = self.get(PING_PATH).await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(ServerApiError::UnexpectedStatus {
                url,
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| ServerApiError::Request {
                url: url.clone(),
                source,
            })?;
        if body != PING_RESPONSE {
            return Err(ServerApiError::UnexpectedBody { url, body });
        }
        Ok(())
    }

    async fn status(&self) -> Result<RemoteStatus, ServerApiError> {
        self.get_json(STATUS_PATH).await
    }

    async fn upgrades(&self) -> Result<UpgradesResponse, ServerApiError> {
        self.get_json(UPGRADES_PATH).await
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod client_tests;
