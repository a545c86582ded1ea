//! End-to-end session flow against the simulated fleet.

use std::sync::Arc;
use std::time::Duration;

use locker_client::application::adapter_availability::{AdapterAvailabilityMonitor, AdapterState};
use locker_client::application::coordinator::{
    ChannelCapacity, CloseReason, ConnectionCoordinator, CoordinatorEvent,
};
use locker_client::infrastructure::transport::simulated::{SimulatedLocker, SimulatedTransport};
use locker_client::infrastructure::ui_bridge::{get_registry, get_session};
use locker_core::{
    CommandOutcome, DeviceId, DeviceInfoOutcome, DeviceInfoRequestKind, EncryptionState,
    LockerError, OpenLockStatus, TransportError,
};

const LOCKER: DeviceId = DeviceId(1001);

struct Fleet {
    coordinator: ConnectionCoordinator,
    transport: Arc<SimulatedTransport>,
    locker: SimulatedLocker,
}

/// Scanning coordinator with one in-range locker of project 1.
async fn discovered_fleet() -> Fleet {
    let (transport, lifecycle) = SimulatedTransport::new(1, 32);
    let locker = SimulatedLocker::new(LOCKER, 1, 1234);
    transport.add_locker(locker.clone());
    transport.bring_in_range(LOCKER);

    let adapter = AdapterAvailabilityMonitor::new(AdapterState::PoweredOn);
    let coordinator = ConnectionCoordinator::spawn(
        transport.clone(),
        lifecycle,
        adapter,
        ChannelCapacity::default(),
    );
    coordinator.start_scan().await.expect("scan starts");

    let mut snapshots = coordinator.subscribe();
    tokio::time::timeout(
        Duration::from_secs(1),
        snapshots.wait_for(|s| !s.nearby.is_empty()),
    )
    .await
    .expect("locker discovered")
    .expect("coordinator alive");

    Fleet {
        coordinator,
        transport,
        locker,
    }
}

#[tokio::test]
async fn test_full_session_opens_lock_and_validates_identity() {
    // Arrange
    let fleet = discovered_fleet().await;
    let session = fleet.coordinator.connect(LOCKER).await.expect("connect");

    // Act
    let encryption = session.enable_encryption().await;
    let opened = session.open_lock("1234").await;
    let project = session
        .request_device_info(DeviceInfoRequestKind::ProjectKey, &fleet.locker.project_public_key())
        .await;
    let device = session
        .request_device_info(DeviceInfoRequestKind::DeviceKey, &fleet.locker.device_public_key())
        .await;

    // Assert
    assert_eq!(encryption, Ok(EncryptionState::Enabled));
    assert_eq!(opened.unwrap().status, OpenLockStatus::Opened);
    assert_eq!(project.unwrap().signature_valid(), Some(true));
    let device = device.unwrap();
    assert_eq!(device.signature_valid(), Some(true));
    assert!(matches!(
        session.last_result(),
        Some(CommandOutcome::ValidatedDeviceInfo { signature_valid: true, .. })
    ));
}

#[tokio::test]
async fn test_wrong_public_key_yields_invalid_verdict_not_error() {
    let fleet = discovered_fleet().await;
    let session = fleet.coordinator.connect(LOCKER).await.unwrap();

    let result = session
        .request_device_info(DeviceInfoRequestKind::ProjectKey, &fleet.locker.device_public_key())
        .await
        .unwrap();

    assert!(matches!(
        result,
        DeviceInfoOutcome::Validated { signature_valid: false, .. }
    ));
}

#[tokio::test]
async fn test_unlock_before_encryption_is_rejected_by_the_device() {
    let fleet = discovered_fleet().await;
    let session = fleet.coordinator.connect(LOCKER).await.unwrap();

    let result = session.open_lock("1234").await;

    assert!(matches!(
        result,
        Err(LockerError::OpenLockFailed(TransportError::Rejected(_)))
    ));
}

#[tokio::test]
async fn test_session_state_is_visible_through_the_bridge() {
    let fleet = discovered_fleet().await;
    let session = fleet.coordinator.connect(LOCKER).await.unwrap();
    session.enable_encryption().await.unwrap();
    let _ = session.open_lock("not-a-number").await;

    let envelope = get_session(&fleet.coordinator, LOCKER).await;

    let dto = envelope.data.expect("session exists");
    assert_eq!(dto.encryption, EncryptionState::Enabled);
    assert_eq!(dto.last_result.unwrap().title, "Error");
}

#[tokio::test]
async fn test_locker_leaving_range_closes_session() {
    // Arrange
    let fleet = discovered_fleet().await;
    let mut events = fleet.coordinator.events();
    let session = fleet.coordinator.connect(LOCKER).await.unwrap();
    let mut snapshots = fleet.coordinator.subscribe();

    // Act
    fleet.transport.take_out_of_range(LOCKER);
    tokio::time::timeout(
        Duration::from_secs(1),
        snapshots.wait_for(|s| s.nearby.is_empty()),
    )
    .await
    .expect("loss applied")
    .expect("coordinator alive");

    // Assert
    assert!(session.is_retired());
    assert!(matches!(
        events.recv().await.unwrap(),
        CoordinatorEvent::SessionOpened { .. }
    ));
    // The link drop arrives before the loss, so the session closes first
    // for the peripheral disconnect.
    assert!(matches!(
        events.recv().await.unwrap(),
        CoordinatorEvent::SessionClosed { reason: CloseReason::PeripheralDisconnected, .. }
    ));
    let registry = get_registry(&fleet.coordinator).await.data.unwrap();
    assert!(registry.devices.is_empty());
    assert!(registry.scanning);
}

#[tokio::test]
async fn test_disconnect_then_reconnect_opens_fresh_session() {
    let fleet = discovered_fleet().await;
    let first = fleet.coordinator.connect(LOCKER).await.unwrap();

    fleet.coordinator.disconnect(LOCKER).await.unwrap();
    let second = fleet.coordinator.connect(LOCKER).await.unwrap();

    assert!(first.is_retired());
    assert_ne!(first.session_id(), second.session_id());
    assert_eq!(second.encryption_state(), EncryptionState::Disabled);
    assert!(fleet.transport.is_linked(LOCKER));
}
