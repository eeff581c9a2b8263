//! The inbound control client.

use proxyman_types::{Account, Message};
use tracing::{debug, warn};

use crate::error::{ProxymanResult, RelatedError};
use crate::operation::Operation;
use crate::service::{
    ALTER_INBOUND, AlterInboundRequest, GET_INBOUND_USER_STATS, GetInboundUserStatsRequest,
    HandlerService,
};

/// Adds, removes and lists users on the engine's inbounds.
///
/// Each method issues exactly one remote call. Nothing is retried or cached,
/// and no ordering holds between calls that overlap; callers that need
/// add-then-remove ordering must await the first call before issuing the next.
///
/// Pass an `Arc` of the channel to share it between clients.
#[derive(Debug, Clone)]
pub struct Proxyman<S> {
    service: S,
}

impl<S: HandlerService> Proxyman<S> {
    /// Creates a client issuing calls over `service`.
    pub fn new(service: S) -> Self {
        Self { service }
    }

    /// The underlying channel.
    pub fn service(&self) -> &S {
        &self.service
    }

    /// Adds `account` to the inbound `tag`.
    ///
    /// How the engine treats an email that is already present is up to the
    /// engine.
    pub async fn add_inbound_user(&self, tag: &str, account: &Account) -> ProxymanResult<()> {
        debug!(tag, email = %account.email, level = account.level, "adding inbound user");
        self.alter_inbound(
            tag,
            Operation::AddUser {
                user: account.to_user(),
            },
        )
        .await
    }

    /// Removes the user `email` from the inbound `tag`.
    ///
    /// The response body is not inspected. Whether removing an absent user is
    /// an error is decided by the engine.
    pub async fn remove_inbound_user(&self, tag: &str, email: &str) -> ProxymanResult<()> {
        debug!(tag, email, "removing inbound user");
        self.alter_inbound(
            tag,
            Operation::RemoveUser {
                email: email.to_string(),
            },
        )
        .await
    }

    /// Returns the emails of the users currently attached to `tag`, in the
    /// order the engine reports them.
    pub async fn list_inbound_users(&self, tag: &str) -> ProxymanResult<Vec<String>> {
        let request = GetInboundUserStatsRequest {
            tag: tag.to_string(),
        };
        let response = self
            .service
            .get_inbound_user_stats(request)
            .await
            .map_err(|e| {
                warn!(tag, "listing inbound users failed: {e}");
                RelatedError::new(GET_INBOUND_USER_STATS, e)
            })?;

        let emails: Vec<String> = response
            .user_stats
            .into_iter()
            .map(|user| user.email)
            .collect();
        debug!(tag, count = emails.len(), "listed inbound users");
        Ok(emails)
    }

    async fn alter_inbound(&self, tag: &str, operation: Operation) -> ProxymanResult<()> {
        let request = AlterInboundRequest {
            tag: tag.to_string(),
            operation: operation.encode(),
        };
        self.service
            .alter_inbound(request)
            .await
            .map(|_| ())
            .map_err(|e| {
                warn!(tag, operation = operation.type_name(), "altering inbound failed: {e}");
                RelatedError::new(ALTER_INBOUND, e)
            })
    }
}
