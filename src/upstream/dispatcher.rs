//! Outbound dispatcher with credential rotation and failover

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::UpstreamConfig;
use crate::error::{AppError, Result};
use crate::upstream::credentials::{mask_key, CredentialPool};
use crate::upstream::traits::GenerationClient;
use crate::upstream::types::{ApiErrorBody, GenerateContentRequest, GenerateContentResponse};

const ERROR_EXCERPT_LEN: usize = 300;

/// Sends generation requests, rotating through live credentials.
///
/// With credentials configured every call walks the live list once starting at
/// the shared cursor. Without credentials a single fallback URL is used.
pub struct Dispatcher {
    client: Client,
    pool: CredentialPool,
    keyed: bool,
    base_url: String,
    model: String,
    fallback_url: Option<String>,
    bearer_token: Option<String>,
}

/// Result of one outbound attempt
enum AttemptOutcome {
    Success(GenerateContentResponse),
    InvalidCredential,
    Failed(String),
}

impl Dispatcher {
    /// Create a dispatcher from upstream configuration
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        let pool = CredentialPool::new(config.api_keys.iter().cloned());
        let keyed = !pool.is_empty();

        if keyed {
            info!(credentials = pool.len(), model = %config.model, "Dispatcher using rotating credentials");
        } else if let Some(url) = &config.api_url {
            info!(url = %url, "Dispatcher using fallback URL");
        }

        Ok(Self {
            client,
            pool,
            keyed,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            fallback_url: config.api_url.clone(),
            bearer_token: config.bearer_token.clone(),
        })
    }

    /// The live credential pool
    pub fn pool(&self) -> &CredentialPool {
        &self.pool
    }

    /// Send a payload to the remote service
    pub async fn send(&self, payload: &GenerateContentRequest) -> Result<GenerateContentResponse> {
        if self.keyed {
            return self.send_rotating(payload).await;
        }

        match &self.fallback_url {
            Some(url) => self.send_fallback(url, payload).await,
            None => Err(AppError::NoCredentialsConfigured),
        }
    }

    async fn send_rotating(&self, payload: &GenerateContentRequest) -> Result<GenerateContentResponse> {
        let mut tried = HashSet::new();
        let mut last_error = None;

        while let Some(key) = self.pool.next_untried(&tried) {
            tried.insert(key.clone());
            debug!(key = %mask_key(&key), attempt = tried.len(), "Dispatching with credential");

            let request = self
                .client
                .post(self.keyed_endpoint())
                .query(&[("key", key.as_str())]);

            match self.attempt(request, payload).await {
                AttemptOutcome::Success(response) => return Ok(response),
                AttemptOutcome::InvalidCredential => {
                    self.pool.invalidate(&key);
                    last_error = Some(format!("credential {} rejected as invalid", mask_key(&key)));
                }
                AttemptOutcome::Failed(reason) => {
                    warn!(key = %mask_key(&key), error = %reason, "Upstream attempt failed");
                    last_error = Some(reason);
                }
            }
        }

        Err(AppError::AllCredentialsExhausted {
            attempts: tried.len(),
            last_error: last_error.unwrap_or_else(|| "no live credentials".to_string()),
        })
    }

    async fn send_fallback(&self, url: &str, payload: &GenerateContentRequest) -> Result<GenerateContentResponse> {
        debug!(url = %url, "Dispatching to fallback URL");

        match self.attempt(self.client.post(url), payload).await {
            AttemptOutcome::Success(response) => Ok(response),
            AttemptOutcome::InvalidCredential => {
                warn!(url = %url, "Fallback endpoint rejected the request credentials");
                Err(AppError::UpstreamCallFailed(
                    "fallback endpoint rejected credentials".to_string(),
                ))
            }
            AttemptOutcome::Failed(reason) => {
                warn!(url = %url, error = %reason, "Fallback call failed");
                Err(AppError::UpstreamCallFailed(reason))
            }
        }
    }

    fn keyed_endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    /// Issue one call and classify the outcome. Never holds the pool lock.
    async fn attempt(&self, request: RequestBuilder, payload: &GenerateContentRequest) -> AttemptOutcome {
        let request = match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = match request.json(payload).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return AttemptOutcome::Failed(format!("timed out: {}", e)),
            Err(e) => return AttemptOutcome::Failed(format!("request error: {}", e)),
        };

        let status = response.status();
        if status.is_success() {
            return match response.json::<GenerateContentResponse>().await {
                Ok(body) => AttemptOutcome::Success(body),
                Err(e) => AttemptOutcome::Failed(format!("malformed response body: {}", e)),
            };
        }

        let body = response.text().await.unwrap_or_default();
        if status.is_client_error()
            && ApiErrorBody::parse(&body).is_some_and(|b| b.is_invalid_credential())
        {
            return AttemptOutcome::InvalidCredential;
        }

        AttemptOutcome::Failed(format!("status {}: {}", status, excerpt(&body)))
    }
}

fn excerpt(body: &str) -> &str {
    match body.char_indices().nth(ERROR_EXCERPT_LEN) {
        Some((index, _)) => &body[..index],
        None => body,
    }
}

#[async_trait]
impl GenerationClient for Dispatcher {
    async fn generate(&self, request: &GenerateContentRequest) -> Result<GenerateContentResponse> {
        self.send(request).await
    }

    fn live_credentials(&self) -> usize {
        self.pool.len()
    }
}
