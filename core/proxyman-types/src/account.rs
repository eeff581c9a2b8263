//! Traffic identities and their protocol credentials.
//!
//! An [`Account`] is owned by the caller. It is only ever read: the control
//! client turns it into a wire [`User`] for the duration of one call.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::message::{Message, TypedMessage};
use crate::{Error, Result};

const VMESS_ACCOUNT: &str = "xray.proxy.vmess.Account";
const VLESS_ACCOUNT: &str = "xray.proxy.vless.Account";
const TROJAN_ACCOUNT: &str = "xray.proxy.trojan.Account";
const SHADOWSOCKS_ACCOUNT: &str = "xray.proxy.shadowsocks.Account";

/// A traffic identity on an inbound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Priority level; the engine maps it to a policy level.
    pub level: u32,
    /// Unique identifier of the account on the engine.
    pub email: String,
    /// Protocol-specific credential.
    pub protocol: ProtocolAccount,
}

impl Account {
    /// Creates an account at level 0.
    ///
    /// Fails if `email` is empty, since the engine keys users by it.
    pub fn new(email: impl Into<String>, protocol: ProtocolAccount) -> Result<Self> {
        let email = email.into();
        if email.is_empty() {
            return Err(Error::EmptyEmail);
        }
        Ok(Self {
            level: 0,
            email,
            protocol,
        })
    }

    /// Sets the priority level.
    #[must_use]
    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    /// Builds the wire user record for this account.
    pub fn to_user(&self) -> User {
        User {
            level: self.level,
            email: self.email.clone(),
            account: Some(self.protocol.to_typed_message()),
        }
    }
}

/// The wire shape of a user as the engine reports and accepts it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<TypedMessage>,
}

impl User {
    /// Decodes the protocol credential, if the record carries one.
    pub fn protocol(&self) -> Option<Result<ProtocolAccount>> {
        self.account.as_ref().map(ProtocolAccount::from_typed_message)
    }
}

/// Protocol-specific credential payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "protocol", rename_all = "lowercase")]
pub enum ProtocolAccount {
    Vmess {
        id: Uuid,
    },
    Vless {
        id: Uuid,
        #[serde(default)]
        flow: XtlsFlow,
    },
    Trojan {
        password: String,
    },
    Shadowsocks {
        password: String,
        cipher: ShadowsocksCipher,
    },
}

#[derive(Deserialize)]
struct IdBody {
    id: String,
    #[serde(default)]
    flow: String,
}

#[derive(Deserialize)]
struct PasswordBody {
    password: String,
    #[serde(default)]
    cipher_type: Option<String>,
}

impl ProtocolAccount {
    /// Short protocol name, as used in inbound configuration.
    pub fn protocol_name(&self) -> &'static str {
        match self {
            Self::Vmess { .. } => "vmess",
            Self::Vless { .. } => "vless",
            Self::Trojan { .. } => "trojan",
            Self::Shadowsocks { .. } => "shadowsocks",
        }
    }

    /// Decodes a credential from its typed-message form.
    pub fn from_typed_message(message: &TypedMessage) -> Result<Self> {
        match message.type_name.as_str() {
            VMESS_ACCOUNT => {
                let body: IdBody = message.decode_value()?;
                Ok(Self::Vmess {
                    id: Uuid::parse_str(&body.id)?,
                })
            }
            VLESS_ACCOUNT => {
                let body: IdBody = message.decode_value()?;
                Ok(Self::Vless {
                    id: Uuid::parse_str(&body.id)?,
                    flow: body.flow.parse()?,
                })
            }
            TROJAN_ACCOUNT => {
                let body: PasswordBody = message.decode_value()?;
                Ok(Self::Trojan {
                    password: body.password,
                })
            }
            SHADOWSOCKS_ACCOUNT => {
                let body: PasswordBody = message.decode_value()?;
                let cipher = body
                    .cipher_type
                    .as_deref()
                    .map(ShadowsocksCipher::from_wire_name)
                    .transpose()?
                    .unwrap_or_default();
                Ok(Self::Shadowsocks {
                    password: body.password,
                    cipher,
                })
            }
            other => Err(Error::UnknownType(other.to_string())),
        }
    }
}

impl Message for ProtocolAccount {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Vmess { .. } => VMESS_ACCOUNT,
            Self::Vless { .. } => VLESS_ACCOUNT,
            Self::Trojan { .. } => TROJAN_ACCOUNT,
            Self::Shadowsocks { .. } => SHADOWSOCKS_ACCOUNT,
        }
    }

    fn to_value(&self) -> serde_json::Value {
        match self {
            Self::Vmess { id } => json!({ "id": id.to_string() }),
            Self::Vless { id, flow } => json!({
                "id": id.to_string(),
                "flow": flow.as_str(),
            }),
            Self::Trojan { password } => json!({ "password": password }),
            Self::Shadowsocks { password, cipher } => json!({
                "password": password,
                "cipher_type": cipher.wire_name(),
            }),
        }
    }
}

/// XTLS flow control for VLESS users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum XtlsFlow {
    #[default]
    #[serde(rename = "")]
    None,
    #[serde(rename = "xtls-rprx-vision")]
    Vision,
}

impl XtlsFlow {
    /// The flow string the engine expects.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::Vision => "xtls-rprx-vision",
        }
    }
}

impl fmt::Display for XtlsFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for XtlsFlow {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "" | "none" => Ok(Self::None),
            "xtls-rprx-vision" => Ok(Self::Vision),
            other => Err(Error::Unsupported {
                kind: "xtls flow",
                value: other.to_string(),
            }),
        }
    }
}

/// AEAD ciphers accepted for single-user Shadowsocks accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShadowsocksCipher {
    #[serde(rename = "aes-128-gcm")]
    Aes128Gcm,
    #[serde(rename = "aes-256-gcm")]
    Aes256Gcm,
    #[default]
    #[serde(rename = "chacha20-poly1305")]
    Chacha20Poly1305,
    #[serde(rename = "xchacha20-poly1305")]
    Xchacha20Poly1305,
    #[serde(rename = "none")]
    None,
}

impl ShadowsocksCipher {
    /// Enum name used in the account message body.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Aes128Gcm => "AES_128_GCM",
            Self::Aes256Gcm => "AES_256_GCM",
            Self::Chacha20Poly1305 => "CHACHA20_POLY1305",
            Self::Xchacha20Poly1305 => "XCHACHA20_POLY1305",
            Self::None => "NONE",
        }
    }

    /// Method name used in inbound configuration.
    pub fn method(&self) -> &'static str {
        match self {
            Self::Aes128Gcm => "aes-128-gcm",
            Self::Aes256Gcm => "aes-256-gcm",
            Self::Chacha20Poly1305 => "chacha20-poly1305",
            Self::Xchacha20Poly1305 => "xchacha20-poly1305",
            Self::None => "none",
        }
    }

    fn from_wire_name(name: &str) -> Result<Self> {
        match name {
            "AES_128_GCM" => Ok(Self::Aes128Gcm),
            "AES_256_GCM" => Ok(Self::Aes256Gcm),
            "CHACHA20_POLY1305" => Ok(Self::Chacha20Poly1305),
            "XCHACHA20_POLY1305" => Ok(Self::Xchacha20Poly1305),
            "NONE" => Ok(Self::None),
            other => Err(Error::Unsupported {
                kind: "shadowsocks cipher",
                value: other.to_string(),
            }),
        }
    }
}

impl FromStr for ShadowsocksCipher {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "aes-128-gcm" => Ok(Self::Aes128Gcm),
            "aes-256-gcm" => Ok(Self::Aes256Gcm),
            "chacha20-poly1305" | "chacha20-ietf-poly1305" => Ok(Self::Chacha20Poly1305),
            "xchacha20-poly1305" | "xchacha20-ietf-poly1305" => Ok(Self::Xchacha20Poly1305),
            "none" | "plain" => Ok(Self::None),
            other => Err(Error::Unsupported {
                kind: "shadowsocks cipher",
                value: other.to_string(),
            }),
        }
    }
}
