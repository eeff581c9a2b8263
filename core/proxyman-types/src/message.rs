//! The engine's polymorphic message wrapper.
//!
//! Fields such as an alteration's `operation` or a user's `account` accept any
//! message kind. On the wire they carry the fully qualified type name next to
//! the encoded value, and the receiver dispatches on the name.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A type-tagged message value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedMessage {
    /// Fully qualified type name, e.g. `xray.proxy.vless.Account`.
    #[serde(rename = "type")]
    pub type_name: String,
    /// The message body.
    pub value: serde_json::Value,
}

impl TypedMessage {
    /// Creates a typed message from a name and an already encoded value.
    pub fn new(type_name: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            type_name: type_name.into(),
            value,
        }
    }

    /// Whether this message carries the given type name.
    pub fn is(&self, type_name: &str) -> bool {
        self.type_name == type_name
    }

    /// Decodes the body into `T`, attributing failures to this message's type.
    pub fn decode_value<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.value.clone()).map_err(|source| Error::Malformed {
            type_name: self.type_name.clone(),
            source,
        })
    }
}

/// A value that can be packed into a [`TypedMessage`].
///
/// Implementations must be total: every value of the type has an encoding.
pub trait Message {
    /// The fully qualified wire type name of this value.
    fn type_name(&self) -> &'static str;

    /// The encoded body of this value.
    fn to_value(&self) -> serde_json::Value;

    /// Packs this value into a typed message.
    fn to_typed_message(&self) -> TypedMessage {
        TypedMessage::new(self.type_name(), self.to_value())
    }
}
