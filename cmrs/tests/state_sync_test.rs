//! Tests for keeping a `NetworkState` in sync with daemon notifications.
//!
//! The events below follow what `connmand` emits while a user powers on
//! Wi-Fi, scans and connects to a network.

use cmrs::{
    NetworkEvent, NetworkState, ObjectKind, PropValue, PropertyMap, Service, StateChange,
    Technology, TechnologyType,
};

const WIFI: &str = "/net/connman/technology/wifi";
const HOME: &str = "/net/connman/service/wifi_0011_686f6d65_managed_psk";
const CAFE: &str = "/net/connman/service/wifi_0011_63616665_managed_none";
const WIRED: &str = "/net/connman/service/ethernet_0022_cable";

fn initial_state() -> NetworkState {
    NetworkState::from_snapshot(
        PropertyMap::new()
            .with("State", "ready")
            .with("OfflineMode", false),
        vec![
            Technology::new(
                WIFI,
                PropertyMap::new()
                    .with("Name", "WiFi")
                    .with("Type", "wifi")
                    .with("Powered", false)
                    .with("Connected", false),
            ),
            Technology::new(
                "/net/connman/technology/ethernet",
                PropertyMap::new()
                    .with("Name", "Wired")
                    .with("Type", "ethernet")
                    .with("Powered", true)
                    .with("Connected", true),
            ),
        ],
        vec![Service::new(
            WIRED,
            PropertyMap::new()
                .with("Name", "Wired")
                .with("Type", "ethernet")
                .with("State", "online"),
        )],
        None,
    )
}

fn wifi_service(name: &str, strength: u8, security: &str) -> PropertyMap {
    PropertyMap::new()
        .with("Name", name)
        .with("Type", "wifi")
        .with("State", "idle")
        .with("Strength", strength)
        .with("Security", vec![security.to_string()])
}

#[test]
fn power_scan_connect_sequence() {
    let mut state = initial_state();
    assert!(!state.vpn_available());
    assert_eq!(
        state
            .technologies()
            .iter()
            .map(|t| t.kind())
            .collect::<Vec<_>>(),
        vec![TechnologyType::Ethernet, TechnologyType::Wifi]
    );

    // Powering on.
    let changes = state.apply(NetworkEvent::PropertyChanged {
        kind: ObjectKind::Technology,
        path: WIFI.into(),
        name: "Powered".into(),
        value: PropValue::Bool(true),
    });
    assert_eq!(
        changes,
        vec![StateChange::Technology {
            path: WIFI.into(),
            key: "Powered".into()
        }]
    );

    // Scan results.
    let changes = state.apply(NetworkEvent::ServicesChanged {
        changed: vec![
            (WIRED.into(), PropertyMap::new()),
            (HOME.into(), wifi_service("home", 70, "psk")),
            (CAFE.into(), wifi_service("cafe", 40, "none")),
        ],
        removed: vec![],
    });
    assert!(changes.contains(&StateChange::ServiceAdded { path: HOME.into() }));
    assert!(changes.contains(&StateChange::ServiceAdded { path: CAFE.into() }));
    assert!(!changes.contains(&StateChange::ServicesReordered));
    assert_eq!(state.services_of(&TechnologyType::Wifi).len(), 2);

    // Connecting.
    for st in ["association", "configuration", "ready"] {
        state.apply(NetworkEvent::PropertyChanged {
            kind: ObjectKind::Service,
            path: HOME.into(),
            name: "State".into(),
            value: PropValue::Str(st.into()),
        });
    }
    let home = state.service(HOME).unwrap();
    assert!(home.state().is_connected());
    assert!(home.is_secured());

    // The connected network moves ahead of the wired one.
    let changes = state.apply(NetworkEvent::ServicesChanged {
        changed: vec![
            (HOME.into(), PropertyMap::new()),
            (WIRED.into(), PropertyMap::new()),
            (CAFE.into(), PropertyMap::new()),
        ],
        removed: vec![],
    });
    assert_eq!(changes, vec![StateChange::ServicesReordered]);
    assert_eq!(state.services()[0].path, HOME);
}

#[test]
fn out_of_range_network_disappears_with_its_selection() {
    let mut state = initial_state();
    state.apply(NetworkEvent::ServicesChanged {
        changed: vec![
            (WIRED.into(), PropertyMap::new()),
            (CAFE.into(), wifi_service("cafe", 20, "none")),
        ],
        removed: vec![],
    });
    assert!(state.select(CAFE));

    let changes = state.apply(NetworkEvent::ServicesChanged {
        changed: vec![(WIRED.into(), PropertyMap::new())],
        removed: vec![CAFE.into()],
    });
    assert_eq!(
        changes,
        vec![
            StateChange::ServiceRemoved { path: CAFE.into() },
            StateChange::SelectionCleared
        ]
    );
    assert!(state.service(CAFE).is_none());
}

#[test]
fn offline_mode_follows_manager_signal() {
    let mut state = initial_state();
    assert!(!state.offline_mode());
    let changes = state.apply(NetworkEvent::PropertyChanged {
        kind: ObjectKind::Manager,
        path: "/".into(),
        name: "OfflineMode".into(),
        value: PropValue::Bool(true),
    });
    assert_eq!(
        changes,
        vec![StateChange::Manager {
            key: "OfflineMode".into()
        }]
    );
    assert!(state.offline_mode());
}

#[test]
fn vpn_daemon_appearing_requests_reload() {
    let mut state = initial_state();
    let changes = state.apply(NetworkEvent::DaemonPresence {
        vpn: true,
        running: true,
    });
    assert_eq!(changes, vec![StateChange::Reset]);
    assert!(state.vpn_available());
    assert_eq!(state.services().len(), 1);
}
