//! Tests for the event pump driving a SessionAdapter from a scripted client.

use std::sync::Arc;
use std::time::Duration;

use chatlink::client::mock::{MockFactory, MockScript, MockStep};
use chatlink::client::{LoginInfo, ScanStatus};
use chatlink::hub::sink::RecordingSink;
use chatlink::hub::{HubEvent, CONFIRM_ON_PHONE};
use chatlink::session::{spawn_event_pump, CancelPolicy, SessionAdapter, Termination};

type Built = (
    Arc<SessionAdapter>,
    Arc<RecordingSink>,
    tokio::task::JoinHandle<()>,
);

fn build(script: MockScript) -> Built {
    let factory = Arc::new(MockFactory::new(script, "https://qr.test"));
    let sink = Arc::new(RecordingSink::new());
    let (adapter, events_rx) =
        SessionAdapter::new(factory, sink.clone(), CancelPolicy::KeepWaiting);
    let adapter = Arc::new(adapter);
    let pump = spawn_event_pump(Arc::clone(&adapter), events_rx);
    (adapter, sink, pump)
}

#[tokio::test(start_paused = true)]
async fn standard_script_ends_authenticated() {
    let (adapter, sink, _pump) = build(MockScript::standard(Duration::from_millis(500)));
    let info = LoginInfo {
        user_id: "alice".to_owned(),
        ..LoginInfo::default()
    };
    adapter.login(info).await.expect("login");

    tokio::time::sleep(Duration::from_secs(5)).await;

    let names: Vec<_> = sink.events().iter().map(HubEvent::name).collect();
    assert_eq!(names, vec!["LOGIN_SCAN", "LOGIN_SCAN", "LOGIN_DONE"]);
    assert_eq!(
        sink.events()[1],
        HubEvent::LoginScan {
            url: CONFIRM_ON_PHONE.to_owned(),
            status: 1
        }
    );
    assert!(adapter.is_authenticated().await);
    assert_eq!(sink.contact_syncs(), 1);

    // The hub reconnects and re-syncs.
    assert!(adapter.resend_login_status().await);
    assert_eq!(
        sink.events().last(),
        Some(&HubEvent::LoginDone {
            user_name: "alice".to_owned()
        })
    );
}

#[tokio::test(start_paused = true)]
async fn pump_stops_after_scan_expiry() {
    let script = MockScript::silent()
        .then(Duration::ZERO, MockStep::Scan(ScanStatus::NeedScan))
        .then(Duration::from_secs(30), MockStep::Scan(ScanStatus::Expired))
        .then(Duration::from_secs(1), MockStep::Login);
    let (adapter, sink, pump) = build(script);
    let mut termination_rx = adapter.subscribe_termination();
    adapter.login(LoginInfo::default()).await.expect("login");

    termination_rx.changed().await.expect("termination published");
    assert_eq!(*termination_rx.borrow(), Some(Termination::ScanExpired));

    tokio::time::timeout(Duration::from_secs(5), pump)
        .await
        .expect("pump exits")
        .expect("pump joined cleanly");

    tokio::time::sleep(Duration::from_secs(5)).await;
    let names: Vec<_> = sink.events().iter().map(HubEvent::name).collect();
    assert_eq!(names, vec!["LOGIN_SCAN", "LOGOUT_DONE"]);
    assert!(!adapter.is_authenticated().await);
}
