//! Handler service channel over a gRPC-JSON gateway.
//!
//! Each procedure is a `POST {base_url}/xray.app.proxyman.command.HandlerService/{Method}`
//! carrying the request as JSON. Failed calls answer with a non-2xx status and
//! a `{"code": n, "message": "..."}` body.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::service::{
    ALTER_INBOUND, AlterInboundRequest, AlterInboundResponse, Code, GET_INBOUND_USER_STATS,
    GetInboundUserStatsRequest, GetInboundUserStatsResponse, HANDLER_SERVICE, HandlerService,
    Status,
};

/// Gateway channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpChannelConfig {
    /// Gateway base URL, e.g. `http://127.0.0.1:8080`.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// User agent sent with each request.
    pub user_agent: String,
}

impl Default for HttpChannelConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            timeout_secs: 10,
            user_agent: concat!("proxyman/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Errors raised by [`HttpHandlerService`].
#[derive(Debug, Error)]
pub enum HttpChannelError {
    /// The request could not be sent or its response not read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The engine rejected the call.
    #[error("RPC error: {0}")]
    Rpc(Status),

    /// The response body was not the expected JSON.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The channel could not be built from its configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl HttpChannelError {
    /// The engine status, if the engine answered with one.
    pub fn status(&self) -> Option<&Status> {
        match self {
            Self::Rpc(status) => Some(status),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct GatewayError {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

/// A [`HandlerService`] reached through a JSON gateway.
#[derive(Debug, Clone)]
pub struct HttpHandlerService {
    config: HttpChannelConfig,
    client: Client,
}

impl HttpHandlerService {
    /// Builds the channel. No connection is made until the first call.
    pub fn new(config: HttpChannelConfig) -> Result<Self, HttpChannelError> {
        if config.base_url.is_empty() {
            return Err(HttpChannelError::Config("base_url is empty".to_string()));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { config, client })
    }

    /// The configuration this channel was built with.
    pub fn config(&self) -> &HttpChannelConfig {
        &self.config
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            HANDLER_SERVICE,
            method
        )
    }

    async fn call<Req, Resp>(&self, method: &str, request: &Req) -> Result<Resp, HttpChannelError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let url = self.endpoint(method);
        debug!("POST {}", url);

        let response = self.client.post(&url).json(request).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(HttpChannelError::Rpc(gateway_status(status, &body)));
        }
        if body.is_empty() {
            return Ok(serde_json::from_slice(b"{}")?);
        }
        Ok(serde_json::from_slice(&body)?)
    }
}

fn gateway_status(status: reqwest::StatusCode, body: &[u8]) -> Status {
    match serde_json::from_slice::<GatewayError>(body) {
        Ok(err) if err.code != 0 => Status::new(Code::from_i32(err.code), err.message),
        _ => Status::new(
            code_for_http(status),
            String::from_utf8_lossy(body).into_owned(),
        ),
    }
}

fn code_for_http(status: reqwest::StatusCode) -> Code {
    match status.as_u16() {
        400 => Code::InvalidArgument,
        401 => Code::Unauthenticated,
        403 => Code::PermissionDenied,
        404 => Code::NotFound,
        409 => Code::AlreadyExists,
        429 => Code::ResourceExhausted,
        500 => Code::Internal,
        501 => Code::Unimplemented,
        502..=504 => Code::Unavailable,
        _ => Code::Unknown,
    }
}

#[async_trait]
impl HandlerService for HttpHandlerService {
    type Error = HttpChannelError;

    async fn alter_inbound(
        &self,
        request: AlterInboundRequest,
    ) -> Result<AlterInboundResponse, HttpChannelError> {
        self.call(ALTER_INBOUND, &request).await
    }

    async fn get_inbound_user_stats(
        &self,
        request: GetInboundUserStatsRequest,
    ) -> Result<GetInboundUserStatsResponse, HttpChannelError> {
        self.call(GET_INBOUND_USER_STATS, &request).await
    }
}
