//! Inbound alteration operations.
//!
//! The engine's `AlterInbound` procedure takes a single polymorphic
//! `operation` field. [`Operation`] enumerates the kinds this client issues;
//! encoding one yields the [`TypedMessage`] that goes in that field, so the
//! call site never branches on the kind.

use proxyman_types::{Message, TypedMessage, User};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Wire type of the add-user operation.
pub const ADD_USER_OPERATION: &str = "xray.app.proxyman.command.AddUserOperation";

/// Wire type of the remove-user operation.
pub const REMOVE_USER_OPERATION: &str = "xray.app.proxyman.command.RemoveUserOperation";

/// An alteration applied to one inbound.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Add (or replace) a user.
    AddUser { user: User },
    /// Remove the user with this email.
    RemoveUser { email: String },
}

/// An envelope could not be read back as an [`Operation`].
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unknown operation type: {0}")]
    UnknownType(String),

    #[error("malformed operation body: {0}")]
    Malformed(#[from] proxyman_types::Error),
}

#[derive(Deserialize)]
struct AddUserBody {
    user: User,
}

#[derive(Deserialize)]
struct RemoveUserBody {
    email: String,
}

impl Operation {
    /// Packs the operation into its envelope.
    pub fn encode(&self) -> TypedMessage {
        self.to_typed_message()
    }

    /// Reads an envelope back into an operation.
    pub fn decode(message: &TypedMessage) -> Result<Self, DecodeError> {
        match message.type_name.as_str() {
            ADD_USER_OPERATION => {
                let body: AddUserBody = message.decode_value()?;
                Ok(Self::AddUser { user: body.user })
            }
            REMOVE_USER_OPERATION => {
                let body: RemoveUserBody = message.decode_value()?;
                Ok(Self::RemoveUser { email: body.email })
            }
            other => Err(DecodeError::UnknownType(other.to_string())),
        }
    }

    /// Email of the user this operation targets.
    pub fn email(&self) -> &str {
        match self {
            Self::AddUser { user } => &user.email,
            Self::RemoveUser { email } => email,
        }
    }
}

impl Message for Operation {
    fn type_name(&self) -> &'static str {
        match self {
            Self::AddUser { .. } => ADD_USER_OPERATION,
            Self::RemoveUser { .. } => REMOVE_USER_OPERATION,
        }
    }

    fn to_value(&self) -> serde_json::Value {
        match self {
            Self::AddUser { user } => json!({ "user": user }),
            Self::RemoveUser { email } => json!({ "email": email }),
        }
    }
}
