//! Core type definitions for the proxyman inbound control client.
//!
//! This crate defines the values that travel inside an inbound alteration:
//! - [`TypedMessage`], the engine's polymorphic "type name + value" wrapper
//! - [`Account`] and its protocol-specific credential ([`ProtocolAccount`])
//! - [`User`], the wire record an account is serialized into
//!
//! Nothing here talks to the network. The RPC seam and the client live in
//! `proxyman-client`.

mod account;
mod message;

pub use account::{Account, ProtocolAccount, ShadowsocksCipher, User, XtlsFlow};
pub use message::{Message, TypedMessage};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or decoding account values.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("account email must not be empty")]
    EmptyEmail,

    #[error("unknown message type: {0}")]
    UnknownType(String),

    #[error("malformed {type_name} value: {source}")]
    Malformed {
        type_name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("unsupported {kind}: {value}")]
    Unsupported { kind: &'static str, value: String },
}
