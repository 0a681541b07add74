//! The tokio interface task and its timer service.

mod common;

use std::time::Duration;

use common::*;
use eapgate_core::network::{InterfaceName, NetworkId, NetworkRef};
use eapgate_handler::config::HandlerConfig;
use eapgate_handler::machine::{ApprovalState, Resolution};
use eapgate_handler::runtime::{spawn_interface, InterfaceHandle, RuntimeError};

async fn collect_valid_chain(handle: &InterfaceHandle) {
    handle.prepare_connection(tofu_network()).await.unwrap();
    assert!(handle.submit_certificate(SSID, 2, root_cert()).await.unwrap());
    assert!(handle.submit_certificate(SSID, 0, server_cert()).await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_unanswered_alert_times_out() {
    let recorder = Recorder::new();
    let (handle, worker) = spawn_interface(
        InterfaceName::new(IFACE),
        &HandlerConfig::default(),
        collaborators(&recorder),
    );

    collect_valid_chain(&handle).await;
    assert!(handle.evaluate(false).await.unwrap());

    tokio::time::sleep(Duration::from_secs(9)).await;
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.state, ApprovalState::AwaitingUserApproval);
    assert_eq!(snapshot.negotiating_ssid.as_deref(), Some(SSID));

    tokio::time::sleep(Duration::from_secs(2)).await;
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.state, ApprovalState::Idle);
    assert_eq!(snapshot.last_resolution, Some(Resolution::TimedOut));

    assert!(recorder.contains(&Call::AutoJoin(NETWORK, false)));
    assert!(recorder.contains(&Call::Disconnect(InterfaceName::new(IFACE))));
    assert!(recorder.callbacks().is_empty());

    drop(handle);
    worker.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_configured_timeout_is_used() {
    let recorder = Recorder::new();
    let config = HandlerConfig {
        notification_timeout_ms: 500,
        ..HandlerConfig::default()
    };
    let (handle, _worker) = spawn_interface(InterfaceName::new(IFACE), &config, collaborators(&recorder));

    collect_valid_chain(&handle).await;
    assert!(handle.evaluate(false).await.unwrap());

    tokio::time::sleep(Duration::from_millis(600)).await;
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.last_resolution, Some(Resolution::TimedOut));
}

#[tokio::test(start_paused = true)]
async fn test_accept_cancels_timer() {
    let recorder = Recorder::new();
    let (handle, _worker) = spawn_interface(
        InterfaceName::new(IFACE),
        &HandlerConfig::default(),
        collaborators(&recorder),
    );

    collect_valid_chain(&handle).await;
    assert!(handle.evaluate(false).await.unwrap());
    handle.alert_tapped(SSID).await.unwrap();
    handle.user_accept(SSID).await.unwrap();

    tokio::time::sleep(Duration::from_secs(30)).await;
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.last_resolution, Some(Resolution::Accepted));
    assert_eq!(recorder.callbacks(), vec![Call::Accepted(SSID.into())]);
    assert_eq!(recorder.count(|c| matches!(c, Call::Disconnect(_))), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stale_reject_keeps_timer_armed() {
    let recorder = Recorder::new();
    let (handle, _worker) = spawn_interface(
        InterfaceName::new(IFACE),
        &HandlerConfig::default(),
        collaborators(&recorder),
    );

    collect_valid_chain(&handle).await;
    assert!(handle.evaluate(false).await.unwrap());
    handle.user_reject("guest").await.unwrap();

    tokio::time::sleep(Duration::from_secs(11)).await;
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.last_resolution, Some(Resolution::TimedOut));
    assert!(recorder.callbacks().is_empty());
}

#[tokio::test]
async fn test_interfaces_are_independent() {
    let first = Recorder::new();
    let second = Recorder::new();
    let config = HandlerConfig::default();
    let (wlan0, _w0) = spawn_interface(InterfaceName::new("wlan0"), &config, collaborators(&first));
    let (wlan1, _w1) = spawn_interface(InterfaceName::new("wlan1"), &config, collaborators(&second));

    collect_valid_chain(&wlan0).await;
    wlan1
        .prepare_connection(NetworkRef::enterprise(NetworkId(9), "lab-eap", tofu_flags()))
        .await
        .unwrap();

    assert!(wlan0.evaluate(true).await.unwrap());
    wlan0.user_reject(SSID).await.unwrap();

    let snapshot = wlan0.snapshot().await.unwrap();
    assert_eq!(snapshot.last_resolution, Some(Resolution::Rejected));

    let other = wlan1.snapshot().await.unwrap();
    assert_eq!(other.state, ApprovalState::CollectingCertificates);
    assert_eq!(other.negotiating_ssid.as_deref(), Some("lab-eap"));
    assert_eq!(other.last_resolution, None);

    assert_eq!(first.callbacks(), vec![Call::Rejected(SSID.into())]);
    assert!(second.callbacks().is_empty());
    assert!(!second.contains(&Call::ClearAll(InterfaceName::new("wlan0"))));
}

#[tokio::test]
async fn test_stopped_worker_reports_error() {
    let recorder = Recorder::new();
    let (handle, worker) = spawn_interface(
        InterfaceName::new(IFACE),
        &HandlerConfig::default(),
        collaborators(&recorder),
    );

    worker.abort();
    let _ = worker.await;

    let err = handle.snapshot().await.unwrap_err();
    assert!(matches!(err, RuntimeError::WorkerStopped(ref name) if name.as_str() == IFACE));
}
