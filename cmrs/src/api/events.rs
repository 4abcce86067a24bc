//! Daemon notifications and the UI-facing changes they cause.

use crate::api::properties::{PropValue, PropertyMap};

/// Which daemon object a `PropertyChanged` signal came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectKind {
    Manager,
    Technology,
    Service,
    VpnConnection,
}

/// A notification received from `connmand` or `connman-vpnd`.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkEvent {
    /// `PropertyChanged` on any object.
    PropertyChanged {
        kind: ObjectKind,
        path: String,
        name: String,
        value: PropValue,
    },
    TechnologyAdded {
        path: String,
        properties: PropertyMap,
    },
    TechnologyRemoved {
        path: String,
    },
    /// The full ordered service list plus removals.
    ServicesChanged {
        changed: Vec<(String, PropertyMap)>,
        removed: Vec<String>,
    },
    VpnConnectionAdded {
        path: String,
        properties: PropertyMap,
    },
    VpnConnectionRemoved {
        path: String,
    },
    /// A daemon appeared on or vanished from the bus.
    DaemonPresence {
        vpn: bool,
        running: bool,
    },
}

/// What the UI needs to refresh after an event was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateChange {
    Manager { key: String },
    TechnologyAdded { path: String },
    TechnologyRemoved { path: String },
    Technology { path: String, key: String },
    ServiceAdded { path: String },
    ServiceRemoved { path: String },
    Service { path: String, key: String },
    /// The daemon's service order changed.
    ServicesReordered,
    VpnAdded { path: String },
    VpnRemoved { path: String },
    Vpn { path: String, key: String },
    /// The selected service went away.
    SelectionCleared,
    /// A daemon appeared or vanished; everything must be reloaded.
    Reset,
}
