//! HTTP implementation of [`DeployerApi`].

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use super::DeployerApi;
use super::wire::{
    DeployRequest, DeployResponse, DeploymentAddressResponse, Envelope, PrecomputeRequest,
    PrecomputeResponse, SignaturePayloadRequest, SignaturePayloadResponse, TaskStatusResponse,
};
use crate::error::{DeployError, RemoteCall, Result};

const PRECOMPUTE_ROUTE: &str = "deployer/public-strategy/precompute";
const SIGNATURE_ROUTE: &str = "deployer/public-strategy/signature";
const COMPUTE_ADDRESS_ROUTE: &str = "deployer/public-strategy/compute-addresses";
const DEPLOY_ROUTE: &str = "deployer/public-strategy/deploy";
const TASK_STATUS_ROUTE: &str = "relayer/tasks/status/";

/// Error bodies longer than this are cut in error messages.
const MAX_ERROR_BODY: usize = 512;

pub(crate) const USER_AGENT: &str = concat!("autosub/", env!("CARGO_PKG_VERSION"));

/// Deployer client over JSON/HTTP.
#[derive(Debug, Clone)]
pub struct HttpDeployerApi {
    client: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpDeployerApi {
    /// Build a client rooted at `base_url` (e.g. `https://host/v1/`).
    pub fn new(base_url: Url, api_key: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: with_trailing_slash(base_url),
            api_key,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, call: RemoteCall, route: &str) -> Result<Url> {
        self.base_url
            .join(route)
            .map_err(|e| DeployError::remote(call, format!("invalid route '{route}': {e}")))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("x-api-key", key),
            None => request,
        }
    }

    async fn post<B, T>(&self, call: RemoteCall, route: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(call, route)?;
        tracing::debug!(%call, %url, "POST");
        let request = self.authorize(self.client.post(url).json(body));
        execute(call, request).await
    }
}

/// Send a request and unwrap the `{"data": ...}` envelope.
pub(crate) async fn execute<T: DeserializeOwned>(
    call: RemoteCall,
    request: reqwest::RequestBuilder,
) -> Result<T> {
    let response = request
        .send()
        .await
        .map_err(|e| DeployError::remote(call, e.to_string()))?;

    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|e| DeployError::remote(call, format!("failed to read body: {e}")))?;

    if !status.is_success() {
        let text = String::from_utf8_lossy(&body);
        return Err(DeployError::RemoteCallFailure {
            call,
            status: Some(status.as_u16()),
            message: format!("HTTP {status}: {}", truncate(&text, MAX_ERROR_BODY)),
        });
    }

    let envelope: Envelope<T> =
        serde_json::from_slice(&body).map_err(|e| DeployError::invalid(call, e.to_string()))?;
    envelope
        .data
        .ok_or_else(|| DeployError::invalid(call, "response has no data"))
}

#[async_trait]
impl DeployerApi for HttpDeployerApi {
    async fn precompute(&self, request: &PrecomputeRequest) -> Result<PrecomputeResponse> {
        self.post(RemoteCall::Precompute, PRECOMPUTE_ROUTE, request)
            .await
    }

    async fn generate_signature_payload(
        &self,
        request: &SignaturePayloadRequest,
    ) -> Result<SignaturePayloadResponse> {
        self.post(RemoteCall::GenerateSignaturePayload, SIGNATURE_ROUTE, request)
            .await
    }

    async fn compute_deployment_address(
        &self,
        request: &DeployRequest,
    ) -> Result<DeploymentAddressResponse> {
        self.post(
            RemoteCall::ComputeDeploymentAddress,
            COMPUTE_ADDRESS_ROUTE,
            request,
        )
        .await
    }

    async fn deploy(&self, request: &DeployRequest) -> Result<DeployResponse> {
        self.post(RemoteCall::Deploy, DEPLOY_ROUTE, request).await
    }

    async fn task_status(&self, task_id: &str) -> Result<TaskStatusResponse> {
        let call = RemoteCall::TaskStatus;
        let mut url = self.endpoint(call, TASK_STATUS_ROUTE)?;
        url.path_segments_mut()
            .map_err(|_| DeployError::remote(call, "base url cannot carry a path"))?
            .pop_if_empty()
            .push(task_id);
        tracing::debug!(%call, %url, "GET");
        let request = self.authorize(self.client.get(url));
        execute(call, request).await
    }
}

pub(crate) fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
