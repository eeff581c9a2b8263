//! Inbound user control for the Xray proxyman handler service.
//!
//! The engine exposes one procedure for every inbound mutation,
//! `AlterInbound`, which takes a type-tagged operation. This crate packages
//! each mutation as an [`Operation`], sends it over an injected
//! [`HandlerService`] channel, and reports any channel failure as a single
//! error kind, [`RelatedError`].
//!
//! ## Components
//!
//! - **Operation**: the envelope kinds and their encoding
//! - **Service**: the channel seam and its request/response shapes
//! - **Client**: [`Proxyman`], the add/remove/list front end
//! - **Channels**: an in-memory [`mock`] engine and a JSON gateway channel
//!   ([`http`])
//!
//! # Example
//!
//! ```
//! use proxyman_client::mock::MockHandlerService;
//! use proxyman_client::Proxyman;
//! use proxyman_types::{Account, ProtocolAccount};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let engine = Arc::new(MockHandlerService::new());
//! let client = Proxyman::new(engine.clone());
//!
//! let account = Account::new(
//!     "alice",
//!     ProtocolAccount::Trojan { password: "secret".into() },
//! )
//! .unwrap();
//! client.add_inbound_user("trojan-in", &account).await.unwrap();
//!
//! let users = client.list_inbound_users("trojan-in").await.unwrap();
//! assert_eq!(users, vec!["alice".to_string()]);
//! # });
//! ```

mod client;
mod error;
pub mod http;
pub mod mock;
pub mod operation;
pub mod service;

pub use client::Proxyman;
pub use error::{BoxError, ProxymanResult, RelatedError, RemoteOperationError};
pub use http::{HttpChannelConfig, HttpChannelError, HttpHandlerService};
pub use operation::{DecodeError, Operation};
pub use service::{
    AlterInboundRequest, AlterInboundResponse, Code, GetInboundUserStatsRequest,
    GetInboundUserStatsResponse, HandlerService, Status,
};
