//! Tests for the action registry and the per-command handlers.

use std::sync::Arc;

use serde_json::json;

use chatlink::actions::{ActionError, ActionFactory, ActionRegistry, HubAction, MANIFEST};
use chatlink::client::mock::{MockFactory, MockScript};
use chatlink::hub::sink::RecordingSink;
use chatlink::hub::HubEvent;
use chatlink::session::{CancelPolicy, SessionAdapter, SessionError};

fn setup(factory: MockFactory) -> (ActionRegistry, Arc<MockFactory>, Arc<RecordingSink>) {
    let factory = Arc::new(factory);
    let sink = Arc::new(RecordingSink::new());
    let (adapter, _events_rx) =
        SessionAdapter::new(factory.clone(), sink.clone(), CancelPolicy::KeepWaiting);
    let registry = ActionRegistry::from_manifest(Arc::new(adapter));
    (registry, factory, sink)
}

fn silent() -> MockFactory {
    MockFactory::new(MockScript::silent(), "https://qr.test")
}

#[test]
fn manifest_names_every_hub_command() {
    let names: Vec<_> = MANIFEST.iter().map(|(name, _)| *name).collect();
    for expected in [
        "login",
        "logout",
        "resendLoginStatus",
        "tryToSendLoginInfoToHub",
        "isAuthenticated",
    ] {
        assert!(names.contains(&expected), "missing {expected}");
    }
}

#[tokio::test]
async fn registry_exposes_sorted_names() {
    let (registry, _, _) = setup(silent());
    assert_eq!(
        registry.names(),
        vec![
            "isAuthenticated",
            "login",
            "logout",
            "resendLoginStatus",
            "tryToSendLoginInfoToHub",
        ]
    );
    assert!(registry.contains("login"));
    assert!(!registry.contains("reboot"));
}

#[tokio::test]
async fn unknown_action_is_rejected_without_side_effects() {
    let (registry, factory, sink) = setup(silent());
    let err = registry
        .dispatch("reboot", json!(null))
        .await
        .expect_err("unknown");
    assert!(matches!(err, ActionError::Unknown(name) if name == "reboot"));
    assert_eq!(factory.stats().created(), 0);
    assert!(sink.events().is_empty());
}

#[tokio::test]
async fn login_then_duplicate_login() {
    let (registry, factory, sink) = setup(silent());
    let args = json!({ "userId": "u1", "token": "t", "wxData": "" });

    let first = registry.dispatch("login", args.clone()).await.expect("login");
    let second = registry.dispatch("login", args).await.expect("login");

    assert_eq!(first, json!("started"));
    assert_eq!(second, json!("already_active"));
    assert_eq!(factory.stats().created(), 1);
    assert_eq!(
        sink.events(),
        vec![HubEvent::LoginDone {
            user_name: "mockingUser".to_owned()
        }]
    );
}

#[tokio::test]
async fn login_accepts_null_args() {
    let (registry, factory, _) = setup(silent());
    registry
        .dispatch("login", json!(null))
        .await
        .expect("login");
    assert_eq!(factory.stats().started(), 1);
}

#[tokio::test]
async fn login_rejects_malformed_args() {
    let (registry, factory, _) = setup(silent());
    let err = registry
        .dispatch("login", json!({ "userId": 42 }))
        .await
        .expect_err("bad args");
    assert!(matches!(err, ActionError::InvalidArgs { action: "login", .. }));
    assert_eq!(factory.stats().created(), 0);
}

#[tokio::test]
async fn login_start_failure_surfaces_as_session_error() {
    let (registry, _, _) = setup(silent().failing_start("offline"));
    let err = registry
        .dispatch("login", json!({}))
        .await
        .expect_err("start fails");
    assert!(matches!(err, ActionError::Session(SessionError::Client(_))));
    assert_eq!(err.to_string(), "client start failed: offline");
}

#[tokio::test]
async fn logout_returns_null_without_session() {
    let (registry, _, _) = setup(silent());
    let result = registry.dispatch("logout", json!(null)).await.expect("logout");
    assert_eq!(result, serde_json::Value::Null);

    registry.dispatch("login", json!({})).await.expect("login");
    let result = registry.dispatch("logout", json!(null)).await.expect("logout");
    assert_eq!(result, json!(true));
}

#[tokio::test]
async fn resend_aliases_share_behaviour() {
    let (registry, _, sink) = setup(silent());
    assert_eq!(
        registry
            .dispatch("resendLoginStatus", json!(null))
            .await
            .expect("resend"),
        json!(false)
    );

    registry.dispatch("login", json!({})).await.expect("login");
    for name in ["resendLoginStatus", "tryToSendLoginInfoToHub"] {
        let sent = registry.dispatch(name, json!(null)).await.expect("resend");
        assert_eq!(sent, json!(true));
    }
    assert_eq!(sink.named("LOGIN_DONE").len(), 2);
}

#[tokio::test]
async fn is_authenticated_is_false_before_login_event() {
    let (registry, _, _) = setup(silent());
    assert_eq!(
        registry
            .dispatch("isAuthenticated", json!(null))
            .await
            .expect("query"),
        json!(false)
    );
    registry.dispatch("login", json!({})).await.expect("login");
    assert_eq!(
        registry
            .dispatch("isAuthenticated", json!(null))
            .await
            .expect("query"),
        json!(false)
    );
}

struct Echo;

#[async_trait::async_trait]
impl HubAction for Echo {
    async fn invoke(&self, args: serde_json::Value) -> Result<serde_json::Value, ActionError> {
        Ok(args)
    }
}

fn bind_echo(_adapter: Arc<SessionAdapter>) -> Box<dyn HubAction> {
    Box::new(Echo)
}

#[tokio::test]
async fn explicit_entries_later_duplicates_win() {
    let factory = Arc::new(silent());
    let sink = Arc::new(RecordingSink::new());
    let (adapter, _rx) = SessionAdapter::new(factory, sink, CancelPolicy::KeepWaiting);
    let registry = ActionRegistry::from_entries(
        Arc::new(adapter),
        &[
            ("echo", chatlink::actions::logout::bind as ActionFactory),
            ("echo", bind_echo as ActionFactory),
        ],
    );
    assert_eq!(registry.names(), vec!["echo"]);
    let result = registry
        .dispatch("echo", json!({ "x": 1 }))
        .await
        .expect("echo");
    assert_eq!(result, json!({ "x": 1 }));
}
