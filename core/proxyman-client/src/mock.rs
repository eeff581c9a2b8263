//! An in-memory handler service for tests and local development.
//!
//! [`MockHandlerService`] keeps per-inbound user lists, records every request
//! it receives, and can be told to fail calls with a given [`Status`].

use async_trait::async_trait;
use proxyman_types::User;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::operation::Operation;
use crate::service::{
    AlterInboundRequest, AlterInboundResponse, Code, GetInboundUserStatsRequest,
    GetInboundUserStatsResponse, HandlerService, Status,
};

/// What the mock does when asked to remove a user that is not present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemovePolicy {
    /// Succeed without changes.
    #[default]
    Ignore,
    /// Fail with [`Code::NotFound`].
    NotFound,
}

/// What the mock does when asked to add an email that is already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Replace the existing user in place.
    #[default]
    Replace,
    /// Fail with [`Code::AlreadyExists`].
    AlreadyExists,
}

#[derive(Debug, Default)]
struct MockState {
    inbounds: HashMap<String, Vec<User>>,
    alter_calls: Vec<AlterInboundRequest>,
    stats_calls: Vec<GetInboundUserStatsRequest>,
    queued_failures: VecDeque<Status>,
    always_fail: Option<Status>,
}

/// An in-memory engine implementing [`HandlerService`].
#[derive(Debug, Default)]
pub struct MockHandlerService {
    state: Mutex<MockState>,
    remove_policy: RemovePolicy,
    duplicate_policy: DuplicatePolicy,
    known_inbounds_only: bool,
}

impl MockHandlerService {
    /// Creates an engine that accepts any inbound tag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how removing an absent user is answered.
    #[must_use]
    pub fn with_remove_policy(mut self, policy: RemovePolicy) -> Self {
        self.remove_policy = policy;
        self
    }

    /// Sets how adding a present email is answered.
    #[must_use]
    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    /// Registers an inbound and rejects calls for tags never registered.
    #[must_use]
    pub fn with_inbound(mut self, tag: impl Into<String>) -> Self {
        self.known_inbounds_only = true;
        self.lock().inbounds.entry(tag.into()).or_default();
        self
    }

    /// Seeds an inbound with users, in order.
    #[must_use]
    pub fn with_users(self, tag: impl Into<String>, users: Vec<User>) -> Self {
        self.lock().inbounds.insert(tag.into(), users);
        self
    }

    /// Fails the next call, of either kind, with `status`.
    pub fn fail_next(&self, status: Status) {
        self.lock().queued_failures.push_back(status);
    }

    /// Fails every call with `status` until [`recover`](Self::recover).
    pub fn fail_always(&self, status: Status) {
        self.lock().always_fail = Some(status);
    }

    /// Stops failing calls and drops queued failures.
    pub fn recover(&self) {
        let mut state = self.lock();
        state.always_fail = None;
        state.queued_failures.clear();
    }

    /// Every `AlterInbound` request received, in arrival order.
    pub fn alter_calls(&self) -> Vec<AlterInboundRequest> {
        self.lock().alter_calls.clone()
    }

    /// Every `GetInboundUserStats` request received, in arrival order.
    pub fn stats_calls(&self) -> Vec<GetInboundUserStatsRequest> {
        self.lock().stats_calls.clone()
    }

    /// Users currently attached to `tag`.
    pub fn users(&self, tag: &str) -> Vec<User> {
        self.lock().inbounds.get(tag).cloned().unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_failure(state: &mut MockState) -> Option<Status> {
        state
            .queued_failures
            .pop_front()
            .or_else(|| state.always_fail.clone())
    }

    fn inbound<'a>(&self, state: &'a mut MockState, tag: &str) -> Result<&'a mut Vec<User>, Status> {
        if self.known_inbounds_only {
            state
                .inbounds
                .get_mut(tag)
                .ok_or_else(|| Status::not_found(format!("handler not found: {tag}")))
        } else {
            Ok(state.inbounds.entry(tag.to_string()).or_default())
        }
    }
}

#[async_trait]
impl HandlerService for MockHandlerService {
    type Error = Status;

    async fn alter_inbound(
        &self,
        request: AlterInboundRequest,
    ) -> Result<AlterInboundResponse, Status> {
        let mut state = self.lock();
        state.alter_calls.push(request.clone());
        if let Some(status) = Self::take_failure(&mut state) {
            return Err(status);
        }

        let operation = Operation::decode(&request.operation)
            .map_err(|e| Status::new(Code::InvalidArgument, e.to_string()))?;
        let users = self.inbound(&mut state, &request.tag)?;

        match operation {
            Operation::AddUser { user } => {
                match users.iter_mut().find(|u| u.email == user.email) {
                    Some(_) if self.duplicate_policy == DuplicatePolicy::AlreadyExists => {
                        return Err(Status::new(
                            Code::AlreadyExists,
                            format!("user {} already exists", user.email),
                        ));
                    }
                    Some(existing) => *existing = user,
                    None => users.push(user),
                }
            }
            Operation::RemoveUser { email } => {
                let before = users.len();
                users.retain(|u| u.email != email);
                if users.len() == before && self.remove_policy == RemovePolicy::NotFound {
                    return Err(Status::not_found(format!("user {email} not found")));
                }
            }
        }
        Ok(AlterInboundResponse::default())
    }

    async fn get_inbound_user_stats(
        &self,
        request: GetInboundUserStatsRequest,
    ) -> Result<GetInboundUserStatsResponse, Status> {
        let mut state = self.lock();
        state.stats_calls.push(request.clone());
        if let Some(status) = Self::take_failure(&mut state) {
            return Err(status);
        }

        let user_stats = self.inbound(&mut state, &request.tag)?.clone();
        Ok(GetInboundUserStatsResponse { user_stats })
    }
}
