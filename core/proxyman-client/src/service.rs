//! The handler service seam.
//!
//! [`HandlerService`] is the RPC channel the client issues calls against. The
//! channel is owned by the caller: connection setup, reconnection and teardown
//! all happen outside this crate.

use async_trait::async_trait;
use proxyman_types::{TypedMessage, User};
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// Fully qualified name of the engine's handler service.
pub const HANDLER_SERVICE: &str = "xray.app.proxyman.command.HandlerService";

/// Procedure name of the inbound alteration call.
pub const ALTER_INBOUND: &str = "AlterInbound";

/// Procedure name of the inbound user listing call.
pub const GET_INBOUND_USER_STATS: &str = "GetInboundUserStats";

/// Request body of `AlterInbound`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlterInboundRequest {
    pub tag: String,
    pub operation: TypedMessage,
}

/// Response body of `AlterInbound`. Carries nothing the client reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlterInboundResponse {}

/// Request body of `GetInboundUserStats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetInboundUserStatsRequest {
    pub tag: String,
}

/// Response body of `GetInboundUserStats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetInboundUserStatsResponse {
    #[serde(default, alias = "userStats")]
    pub user_stats: Vec<User>,
}

/// The remote procedures of the engine's handler service.
#[async_trait]
pub trait HandlerService: Send + Sync {
    /// Transport error raised by this channel.
    type Error: StdError + Send + Sync + 'static;

    /// Applies one operation to an inbound.
    async fn alter_inbound(
        &self,
        request: AlterInboundRequest,
    ) -> Result<AlterInboundResponse, Self::Error>;

    /// Returns the users currently attached to an inbound.
    async fn get_inbound_user_stats(
        &self,
        request: GetInboundUserStatsRequest,
    ) -> Result<GetInboundUserStatsResponse, Self::Error>;
}

#[async_trait]
impl<S: HandlerService + ?Sized> HandlerService for Arc<S> {
    type Error = S::Error;

    async fn alter_inbound(
        &self,
        request: AlterInboundRequest,
    ) -> Result<AlterInboundResponse, Self::Error> {
        (**self).alter_inbound(request).await
    }

    async fn get_inbound_user_stats(
        &self,
        request: GetInboundUserStatsRequest,
    ) -> Result<GetInboundUserStatsResponse, Self::Error> {
        (**self).get_inbound_user_stats(request).await
    }
}

/// Status codes reported by the engine, numbered as on the gRPC wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
    Ok,
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
}

impl Code {
    /// Maps a numeric code; unrecognised values become [`Code::Unknown`].
    pub fn from_i32(value: i32) -> Self {
        match value {
            0 => Self::Ok,
            1 => Self::Cancelled,
            3 => Self::InvalidArgument,
            4 => Self::DeadlineExceeded,
            5 => Self::NotFound,
            6 => Self::AlreadyExists,
            7 => Self::PermissionDenied,
            8 => Self::ResourceExhausted,
            9 => Self::FailedPrecondition,
            10 => Self::Aborted,
            11 => Self::OutOfRange,
            12 => Self::Unimplemented,
            13 => Self::Internal,
            14 => Self::Unavailable,
            15 => Self::DataLoss,
            16 => Self::Unauthenticated,
            _ => Self::Unknown,
        }
    }

    /// The numeric wire value.
    pub fn as_i32(&self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::Cancelled => 1,
            Self::Unknown => 2,
            Self::InvalidArgument => 3,
            Self::DeadlineExceeded => 4,
            Self::NotFound => 5,
            Self::AlreadyExists => 6,
            Self::PermissionDenied => 7,
            Self::ResourceExhausted => 8,
            Self::FailedPrecondition => 9,
            Self::Aborted => 10,
            Self::OutOfRange => 11,
            Self::Unimplemented => 12,
            Self::Internal => 13,
            Self::Unavailable => 14,
            Self::DataLoss => 15,
            Self::Unauthenticated => 16,
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A failed call as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("status {code}: {message}")]
pub struct Status {
    pub code: Code,
    pub message: String,
}

impl Status {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(Code::NotFound, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(Code::Unavailable, message)
    }
}
