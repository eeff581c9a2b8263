use async_trait::async_trait;
use pretty_assertions::assert_eq;
use proxyman_client::mock::{MockHandlerService, RemovePolicy};
use proxyman_client::operation::{ADD_USER_OPERATION, REMOVE_USER_OPERATION};
use proxyman_client::{
    AlterInboundRequest, AlterInboundResponse, Code, GetInboundUserStatsRequest,
    GetInboundUserStatsResponse, HandlerService, Operation, Proxyman, RelatedError, Status,
};
use proxyman_types::{Account, ProtocolAccount, User, XtlsFlow};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

fn account(email: &str) -> Account {
    Account::new(
        email,
        ProtocolAccount::Vless {
            id: Uuid::parse_str("9b1d3c2e-0f4a-4b6e-8d7c-1a2b3c4d5e6f").unwrap(),
            flow: XtlsFlow::Vision,
        },
    )
    .unwrap()
}

fn user(email: &str) -> User {
    User {
        email: email.to_string(),
        ..Default::default()
    }
}

fn client() -> (Arc<MockHandlerService>, Proxyman<Arc<MockHandlerService>>) {
    let engine = Arc::new(MockHandlerService::new());
    let client = Proxyman::new(engine.clone());
    (engine, client)
}

/// A channel with its own error type, to check causes survive wrapping.
#[derive(Debug, thiserror::Error)]
#[error("link down: {0}")]
struct LinkDown(&'static str);

#[derive(Default)]
struct BrokenChannel {
    calls: AtomicUsize,
}

#[async_trait]
impl HandlerService for BrokenChannel {
    type Error = LinkDown;

    async fn alter_inbound(
        &self,
        _request: AlterInboundRequest,
    ) -> Result<AlterInboundResponse, LinkDown> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(LinkDown("alter"))
    }

    async fn get_inbound_user_stats(
        &self,
        _request: GetInboundUserStatsRequest,
    ) -> Result<GetInboundUserStatsResponse, LinkDown> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(LinkDown("stats"))
    }
}

// ── add_inbound_user ────────────────────────────────────────────

#[tokio::test]
async fn add_user_issues_one_add_operation_with_account_fields() {
    let (engine, client) = client();
    let payload = ProtocolAccount::Vless {
        id: Uuid::parse_str("9b1d3c2e-0f4a-4b6e-8d7c-1a2b3c4d5e6f").unwrap(),
        flow: XtlsFlow::Vision,
    };
    let account = Account::new("u1@x", payload.clone()).unwrap();

    client.add_inbound_user("inbound-1", &account).await.unwrap();

    let calls = engine.alter_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].tag, "inbound-1");
    assert_eq!(calls[0].operation.type_name, ADD_USER_OPERATION);

    match Operation::decode(&calls[0].operation).unwrap() {
        Operation::AddUser { user } => {
            assert_eq!(user.level, 0);
            assert_eq!(user.email, "u1@x");
            assert_eq!(user.protocol().unwrap().unwrap(), payload);
        }
        other => panic!("expected AddUser, got {other:?}"),
    }
}

#[tokio::test]
async fn add_user_carries_level() {
    let (engine, client) = client();
    let account = account("leveled").with_level(5);

    client.add_inbound_user("in", &account).await.unwrap();

    let body = &engine.alter_calls()[0].operation.value;
    assert_eq!(body["user"]["level"], json!(5));
    assert_eq!(body["user"]["email"], json!("leveled"));
}

#[tokio::test]
async fn add_user_makes_user_visible_to_engine() {
    let (engine, client) = client();
    client.add_inbound_user("in", &account("a")).await.unwrap();

    let users = engine.users("in");
    assert_eq!(users.len(), 1);
    assert_eq!(users[0], account("a").to_user());
}

#[tokio::test]
async fn add_user_does_not_list() {
    let (engine, client) = client();
    client.add_inbound_user("in", &account("a")).await.unwrap();
    assert!(engine.stats_calls().is_empty());
}

// ── remove_inbound_user ─────────────────────────────────────────

#[tokio::test]
async fn remove_user_issues_one_remove_operation_with_email() {
    let (engine, client) = client();

    client.remove_inbound_user("inbound-1", "u1@x").await.unwrap();

    let calls = engine.alter_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].tag, "inbound-1");
    assert_eq!(calls[0].operation.type_name, REMOVE_USER_OPERATION);
    assert_eq!(
        Operation::decode(&calls[0].operation).unwrap(),
        Operation::RemoveUser {
            email: "u1@x".into()
        }
    );
}

#[tokio::test]
async fn remove_user_drops_it_from_engine() {
    let (engine, client) = client();
    client.add_inbound_user("in", &account("a")).await.unwrap();
    client.add_inbound_user("in", &account("b")).await.unwrap();

    client.remove_inbound_user("in", "a").await.unwrap();

    let emails: Vec<String> = engine.users("in").into_iter().map(|u| u.email).collect();
    assert_eq!(emails, vec!["b".to_string()]);
}

#[tokio::test]
async fn remove_absent_user_succeeds_when_engine_ignores_it() {
    let (_engine, client) = client();
    client.remove_inbound_user("in", "ghost").await.unwrap();
    client.remove_inbound_user("in", "ghost").await.unwrap();
}

#[tokio::test]
async fn remove_twice_fails_with_same_error_kind_when_engine_rejects() {
    let engine = Arc::new(
        MockHandlerService::new()
            .with_remove_policy(RemovePolicy::NotFound)
            .with_users("in", vec![user("a")]),
    );
    let client = Proxyman::new(engine.clone());

    client.remove_inbound_user("in", "a").await.unwrap();
    let err: RelatedError = client.remove_inbound_user("in", "a").await.unwrap_err();

    assert_eq!(err.procedure(), "AlterInbound");
    assert_eq!(err.downcast_ref::<Status>().unwrap().code, Code::NotFound);
}

// ── list_inbound_users ──────────────────────────────────────────

#[tokio::test]
async fn list_users_returns_emails_in_response_order() {
    let engine = Arc::new(MockHandlerService::new().with_users("inbound-1", vec![user("a"), user("b")]));
    let client = Proxyman::new(engine.clone());

    let users = client.list_inbound_users("inbound-1").await.unwrap();

    assert_eq!(users, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(
        engine.stats_calls(),
        vec![GetInboundUserStatsRequest {
            tag: "inbound-1".into()
        }]
    );
}

#[tokio::test]
async fn list_users_keeps_duplicates_and_unsorted_order() {
    let engine = Arc::new(
        MockHandlerService::new().with_users("in", vec![user("z"), user("a"), user("z")]),
    );
    let client = Proxyman::new(engine);

    let users = client.list_inbound_users("in").await.unwrap();
    assert_eq!(users, vec!["z", "a", "z"]);
}

#[tokio::test]
async fn list_users_of_empty_inbound_is_empty() {
    let (_engine, client) = client();
    assert!(client.list_inbound_users("in").await.unwrap().is_empty());
}

#[tokio::test]
async fn list_users_is_never_cached() {
    let (engine, client) = client();
    client.list_inbound_users("in").await.unwrap();
    client.add_inbound_user("in", &account("late")).await.unwrap();

    let users = client.list_inbound_users("in").await.unwrap();
    assert_eq!(users, vec!["late"]);
    assert_eq!(engine.stats_calls().len(), 2);
}

#[tokio::test]
async fn list_users_does_not_alter() {
    let (engine, client) = client();
    client.list_inbound_users("in").await.unwrap();
    assert!(engine.alter_calls().is_empty());
}

// ── Error normalization ─────────────────────────────────────────

#[tokio::test]
async fn add_failure_surfaces_as_related_error_with_cause() {
    let (engine, client) = client();
    engine.fail_next(Status::unavailable("engine restarting"));

    let err = client.add_inbound_user("in", &account("a")).await.unwrap_err();

    assert_eq!(err.procedure(), "AlterInbound");
    let cause = err.downcast_ref::<Status>().unwrap();
    assert_eq!(cause, &Status::unavailable("engine restarting"));
    assert!(engine.users("in").is_empty());
}

#[tokio::test]
async fn remove_failure_surfaces_as_related_error_with_cause() {
    let (engine, client) = client();
    engine.fail_next(Status::new(Code::Internal, "boom"));

    let err = client.remove_inbound_user("in", "a").await.unwrap_err();

    assert_eq!(err.downcast_ref::<Status>().unwrap().message, "boom");
    assert!(err.cause().to_string().contains("boom"));
}

#[tokio::test]
async fn list_failure_surfaces_as_related_error_with_cause() {
    let (engine, client) = client();
    engine.fail_next(Status::new(Code::PermissionDenied, "nope"));

    let err = client.list_inbound_users("in").await.unwrap_err();

    assert_eq!(err.procedure(), "GetInboundUserStats");
    assert_eq!(
        err.downcast_ref::<Status>().unwrap().code,
        Code::PermissionDenied
    );
}

#[tokio::test]
async fn foreign_channel_errors_are_wrapped_not_leaked() {
    let channel = Arc::new(BrokenChannel::default());
    let client = Proxyman::new(channel.clone());

    let add = client.add_inbound_user("in", &account("a")).await.unwrap_err();
    let remove = client.remove_inbound_user("in", "a").await.unwrap_err();
    let list = client.list_inbound_users("in").await.unwrap_err();

    assert_eq!(add.downcast_ref::<LinkDown>().unwrap().0, "alter");
    assert_eq!(remove.downcast_ref::<LinkDown>().unwrap().0, "alter");
    assert_eq!(list.downcast_ref::<LinkDown>().unwrap().0, "stats");
    assert!(list.downcast_ref::<Status>().is_none());
}

#[tokio::test]
async fn failed_calls_are_not_retried() {
    let channel = Arc::new(BrokenChannel::default());
    let client = Proxyman::new(channel.clone());

    let _ = client.add_inbound_user("in", &account("a")).await;
    let _ = client.remove_inbound_user("in", "a").await;
    let _ = client.list_inbound_users("in").await;

    assert_eq!(channel.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn client_recovers_once_engine_recovers() {
    let (engine, client) = client();
    engine.fail_always(Status::unavailable("down"));
    assert!(client.list_inbound_users("in").await.is_err());
    assert!(client.list_inbound_users("in").await.is_err());

    engine.recover();
    assert!(client.list_inbound_users("in").await.is_ok());
}

// ── Sharing and concurrency ─────────────────────────────────────

#[tokio::test]
async fn clients_share_one_channel() {
    let engine = Arc::new(MockHandlerService::new());
    let first = Proxyman::new(engine.clone());
    let second = first.clone();

    first.add_inbound_user("in", &account("a")).await.unwrap();
    let users = second.list_inbound_users("in").await.unwrap();

    assert_eq!(users, vec!["a"]);
    assert_eq!(Arc::strong_count(first.service()), 3);
}

#[tokio::test]
async fn concurrent_adds_each_issue_one_call() {
    let (engine, client) = client();
    let accounts: Vec<Account> = (0..16).map(|i| account(&format!("user-{i}"))).collect();

    let results = futures::future::join_all(
        accounts
            .iter()
            .map(|a| client.add_inbound_user("in", a)),
    )
    .await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(engine.alter_calls().len(), 16);
    assert_eq!(engine.users("in").len(), 16);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn client_futures_are_send() {
    let (engine, client) = client();
    let client = Arc::new(client);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let client = client.clone();
            tokio::spawn(async move {
                client
                    .add_inbound_user("in", &account(&format!("spawned-{i}")))
                    .await
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    assert_eq!(engine.users("in").len(), 8);
}
