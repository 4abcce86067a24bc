//! In-memory mirror of the daemon's object model.
//!
//! `NetworkState` holds the manager properties, every technology, the
//! ordered service list and the VPN connections. Each daemon notification
//! is applied in place and yields the [`StateChange`]s a view has to
//! redraw. No bus access happens here, which keeps the synchronization
//! rules testable on their own.

use std::collections::{BTreeMap, HashMap};

use log::{debug, warn};

use crate::api::events::{NetworkEvent, ObjectKind, StateChange};
use crate::api::models::{GlobalState, Service, Technology, TechnologyType, VpnConnection};
use crate::api::properties::PropertyMap;
use crate::types::constants::keys;

/// Snapshot of everything the daemons have told us.
#[derive(Debug, Clone, Default)]
pub struct NetworkState {
    manager: PropertyMap,
    technologies: BTreeMap<String, Technology>,
    services: Vec<Service>,
    vpn_connections: BTreeMap<String, VpnConnection>,
    selected: Option<String>,
    vpn_available: bool,
}

impl NetworkState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a state from the results of the initial `Get*` calls.
    pub fn from_snapshot(
        manager: PropertyMap,
        technologies: Vec<Technology>,
        services: Vec<Service>,
        vpn_connections: Option<Vec<VpnConnection>>,
    ) -> Self {
        let vpn_available = vpn_connections.is_some();
        Self {
            manager,
            technologies: technologies
                .into_iter()
                .map(|t| (t.path.clone(), t))
                .collect(),
            services,
            vpn_connections: vpn_connections
                .unwrap_or_default()
                .into_iter()
                .map(|c| (c.path.clone(), c))
                .collect(),
            selected: None,
            vpn_available,
        }
    }

    pub fn global_state(&self) -> GlobalState {
        GlobalState::from(self.manager.str(keys::STATE).unwrap_or("offline"))
    }

    pub fn offline_mode(&self) -> bool {
        self.manager.bool(keys::OFFLINE_MODE).unwrap_or(false)
    }

    /// Whether `connman-vpnd` answered the initial snapshot.
    pub fn vpn_available(&self) -> bool {
        self.vpn_available
    }

    /// Technologies ordered by kind, then path.
    pub fn technologies(&self) -> Vec<&Technology> {
        let mut list: Vec<&Technology> = self.technologies.values().collect();
        list.sort_by(|a, b| a.kind().cmp(&b.kind()).then_with(|| a.path.cmp(&b.path)));
        list
    }

    pub fn technology(&self, path: &str) -> Option<&Technology> {
        self.technologies.get(path)
    }

    pub fn technology_of(&self, kind: &TechnologyType) -> Option<&Technology> {
        self.technologies.values().find(|t| &t.kind() == kind)
    }

    /// Services in daemon preference order.
    pub fn services(&self) -> &[Service] {
        &self.services
    }

    /// Services belonging to one technology, in daemon order.
    pub fn services_of(&self, kind: &TechnologyType) -> Vec<&Service> {
        self.services.iter().filter(|s| &s.kind() == kind).collect()
    }

    pub fn service(&self, path: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.path == path)
    }

    pub fn vpn_connections(&self) -> Vec<&VpnConnection> {
        self.vpn_connections.values().collect()
    }

    pub fn vpn_connection(&self, path: &str) -> Option<&VpnConnection> {
        self.vpn_connections.get(path)
    }

    /// Marks one service as the user's current selection.
    ///
    /// Returns `false` if the service is unknown; the previous selection is
    /// kept in that case.
    pub fn select(&mut self, path: &str) -> bool {
        if self.service(path).is_none() {
            return false;
        }
        self.selected = Some(path.to_string());
        true
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&Service> {
        self.selected.as_deref().and_then(|p| self.service(p))
    }

    /// Applies one notification and returns the resulting changes.
    pub fn apply(&mut self, event: NetworkEvent) -> Vec<StateChange> {
        match event {
            NetworkEvent::PropertyChanged {
                kind,
                path,
                name,
                value,
            } => self.apply_property(kind, path, name, value),
            NetworkEvent::TechnologyAdded { path, properties } => {
                debug!("Technology added: {path}");
                self.technologies
                    .insert(path.clone(), Technology::new(path.clone(), properties));
                vec![StateChange::TechnologyAdded { path }]
            }
            NetworkEvent::TechnologyRemoved { path } => {
                if self.technologies.remove(&path).is_some() {
                    debug!("Technology removed: {path}");
                    vec![StateChange::TechnologyRemoved { path }]
                } else {
                    Vec::new()
                }
            }
            NetworkEvent::ServicesChanged { changed, removed } => {
                self.apply_services_changed(changed, removed)
            }
            NetworkEvent::VpnConnectionAdded { path, properties } => {
                self.vpn_connections
                    .insert(path.clone(), VpnConnection::new(path.clone(), properties));
                vec![StateChange::VpnAdded { path }]
            }
            NetworkEvent::VpnConnectionRemoved { path } => {
                if self.vpn_connections.remove(&path).is_some() {
                    vec![StateChange::VpnRemoved { path }]
                } else {
                    Vec::new()
                }
            }
            NetworkEvent::DaemonPresence { vpn, running } => {
                if vpn {
                    self.vpn_available = running;
                    if !running {
                        self.vpn_connections.clear();
                    }
                } else if !running {
                    self.manager = PropertyMap::new();
                    self.technologies.clear();
                    self.services.clear();
                    self.selected = None;
                }
                vec![StateChange::Reset]
            }
        }
    }

    fn apply_property(
        &mut self,
        kind: ObjectKind,
        path: String,
        name: String,
        value: crate::api::properties::PropValue,
    ) -> Vec<StateChange> {
        let changed = match kind {
            ObjectKind::Manager => self.manager.replace(&name, value),
            ObjectKind::Technology => match self.technologies.get_mut(&path) {
                Some(tech) => tech.properties.replace(&name, value),
                None => {
                    warn!("PropertyChanged for unknown technology {path}");
                    false
                }
            },
            ObjectKind::Service => match self.services.iter_mut().find(|s| s.path == path) {
                Some(service) => service.properties.replace(&name, value),
                None => {
                    debug!("PropertyChanged for unlisted service {path}");
                    false
                }
            },
            ObjectKind::VpnConnection => match self.vpn_connections.get_mut(&path) {
                Some(conn) => conn.properties.replace(&name, value),
                None => false,
            },
        };

        if !changed {
            return Vec::new();
        }

        vec![match kind {
            ObjectKind::Manager => StateChange::Manager { key: name },
            ObjectKind::Technology => StateChange::Technology { path, key: name },
            ObjectKind::Service => StateChange::Service { path, key: name },
            ObjectKind::VpnConnection => StateChange::Vpn { path, key: name },
        }]
    }

    /// Rebuilds the service list from a `ServicesChanged` signal.
    ///
    /// `changed` lists every service in order; an empty dictionary means
    /// the service is known and unchanged.
    fn apply_services_changed(
        &mut self,
        changed: Vec<(String, PropertyMap)>,
        removed: Vec<String>,
    ) -> Vec<StateChange> {
        let mut changes = Vec::new();

        let old_order: Vec<String> = self.services.iter().map(|s| s.path.clone()).collect();
        let mut existing: HashMap<String, Service> = self
            .services
            .drain(..)
            .map(|s| (s.path.clone(), s))
            .collect();

        for path in &removed {
            if existing.remove(path).is_some() {
                changes.push(StateChange::ServiceRemoved { path: path.clone() });
                if self.selected.as_deref() == Some(path.as_str()) {
                    self.selected = None;
                    changes.push(StateChange::SelectionCleared);
                }
            }
        }

        let mut ordered = Vec::with_capacity(changed.len());
        for (path, properties) in changed {
            if removed.contains(&path) {
                continue;
            }
            match existing.remove(&path) {
                Some(mut service) => {
                    for key in service.properties.merge(properties) {
                        changes.push(StateChange::Service {
                            path: path.clone(),
                            key,
                        });
                    }
                    ordered.push(service);
                }
                None => {
                    if properties.is_empty() {
                        warn!("ServicesChanged referenced unknown service {path} without properties");
                    }
                    changes.push(StateChange::ServiceAdded { path: path.clone() });
                    ordered.push(Service::new(path, properties));
                }
            }
        }

        // Services the daemon neither listed nor removed keep their relative order.
        let mut leftovers: Vec<Service> = old_order
            .iter()
            .filter_map(|p| existing.remove(p))
            .collect();
        ordered.append(&mut leftovers);

        let new_order: Vec<&str> = ordered.iter().map(|s| s.path.as_str()).collect();
        let old_kept: Vec<&str> = old_order
            .iter()
            .map(String::as_str)
            .filter(|p| new_order.contains(p))
            .collect();
        let new_kept: Vec<&str> = new_order
            .iter()
            .copied()
            .filter(|p| old_kept.contains(p))
            .collect();
        if old_kept != new_kept {
            changes.push(StateChange::ServicesReordered);
        }

        self.services = ordered;
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::properties::PropValue;

    fn wifi(name: &str, state: &str) -> PropertyMap {
        PropertyMap::new()
            .with("Name", name)
            .with("Type", "wifi")
            .with("State", state)
    }

    fn state_with(services: &[(&str, &str)]) -> NetworkState {
        NetworkState::from_snapshot(
            PropertyMap::new().with("State", "ready"),
            vec![Technology::new(
                "/net/connman/technology/wifi",
                PropertyMap::new()
                    .with("Type", "wifi")
                    .with("Name", "WiFi")
                    .with("Powered", true),
            )],
            services
                .iter()
                .map(|(p, n)| Service::new(*p, wifi(n, "idle")))
                .collect(),
            Some(Vec::new()),
        )
    }

    #[test]
    fn technology_property_change_is_reported_once() {
        let mut st = state_with(&[]);
        let ev = NetworkEvent::PropertyChanged {
            kind: ObjectKind::Technology,
            path: "/net/connman/technology/wifi".into(),
            name: "Powered".into(),
            value: PropValue::Bool(false),
        };
        assert_eq!(
            st.apply(ev.clone()),
            vec![StateChange::Technology {
                path: "/net/connman/technology/wifi".into(),
                key: "Powered".into()
            }]
        );
        assert!(st.apply(ev).is_empty());
        assert!(!st.technology("/net/connman/technology/wifi").unwrap().powered());
    }

    #[test]
    fn service_state_change_updates_in_place() {
        let mut st = state_with(&[("/s/a", "A")]);
        let changes = st.apply(NetworkEvent::PropertyChanged {
            kind: ObjectKind::Service,
            path: "/s/a".into(),
            name: "State".into(),
            value: PropValue::Str("online".into()),
        });
        assert_eq!(changes.len(), 1);
        assert!(st.service("/s/a").unwrap().state().is_connected());
    }

    #[test]
    fn services_changed_adds_orders_and_merges() {
        let mut st = state_with(&[("/s/a", "A"), ("/s/b", "B")]);
        let changes = st.apply(NetworkEvent::ServicesChanged {
            changed: vec![
                ("/s/b".into(), PropertyMap::new()),
                ("/s/c".into(), wifi("C", "idle")),
                ("/s/a".into(), PropertyMap::new().with("State", "ready")),
            ],
            removed: vec![],
        });

        let order: Vec<&str> = st.services().iter().map(|s| s.path.as_str()).collect();
        assert_eq!(order, vec!["/s/b", "/s/c", "/s/a"]);
        assert!(changes.contains(&StateChange::ServiceAdded { path: "/s/c".into() }));
        assert!(changes.contains(&StateChange::Service {
            path: "/s/a".into(),
            key: "State".into()
        }));
        assert!(changes.contains(&StateChange::ServicesReordered));
        assert_eq!(st.service("/s/a").unwrap().name(), "A");
    }

    #[test]
    fn empty_dictionary_never_clears_properties() {
        let mut st = state_with(&[("/s/a", "A")]);
        let changes = st.apply(NetworkEvent::ServicesChanged {
            changed: vec![("/s/a".into(), PropertyMap::new())],
            removed: vec![],
        });
        assert!(changes.is_empty());
        assert_eq!(st.service("/s/a").unwrap().name(), "A");
    }

    #[test]
    fn removing_selected_service_clears_selection() {
        let mut st = state_with(&[("/s/a", "A"), ("/s/b", "B")]);
        assert!(st.select("/s/a"));
        assert!(!st.select("/s/missing"));
        assert_eq!(st.selected().map(|s| s.path.as_str()), Some("/s/a"));

        let changes = st.apply(NetworkEvent::ServicesChanged {
            changed: vec![("/s/b".into(), PropertyMap::new())],
            removed: vec!["/s/a".into()],
        });
        assert!(changes.contains(&StateChange::ServiceRemoved { path: "/s/a".into() }));
        assert!(changes.contains(&StateChange::SelectionCleared));
        assert!(st.selected().is_none());
        assert_eq!(st.services().len(), 1);
    }

    #[test]
    fn selection_is_single() {
        let mut st = state_with(&[("/s/a", "A"), ("/s/b", "B")]);
        st.select("/s/a");
        st.select("/s/b");
        assert_eq!(st.selected().map(|s| s.path.as_str()), Some("/s/b"));
    }

    #[test]
    fn technologies_come_and_go() {
        let mut st = state_with(&[]);
        let changes = st.apply(NetworkEvent::TechnologyAdded {
            path: "/net/connman/technology/bluetooth".into(),
            properties: PropertyMap::new().with("Type", "bluetooth"),
        });
        assert_eq!(changes.len(), 1);
        assert_eq!(st.technologies().len(), 2);
        assert!(st.technology_of(&TechnologyType::Bluetooth).is_some());

        st.apply(NetworkEvent::TechnologyRemoved {
            path: "/net/connman/technology/bluetooth".into(),
        });
        assert_eq!(st.technologies().len(), 1);
        assert!(
            st.apply(NetworkEvent::TechnologyRemoved {
                path: "/nope".into()
            })
            .is_empty()
        );
    }

    #[test]
    fn vpn_connections_tracked() {
        let mut st = state_with(&[]);
        assert!(st.vpn_available());
        st.apply(NetworkEvent::VpnConnectionAdded {
            path: "/net/connman/vpn/connection/work".into(),
            properties: PropertyMap::new()
                .with("Name", "Work")
                .with("Type", "openconnect")
                .with("State", "idle"),
        });
        let changes = st.apply(NetworkEvent::PropertyChanged {
            kind: ObjectKind::VpnConnection,
            path: "/net/connman/vpn/connection/work".into(),
            name: "State".into(),
            value: PropValue::Str("ready".into()),
        });
        assert_eq!(changes.len(), 1);
        assert!(
            st.vpn_connection("/net/connman/vpn/connection/work")
                .unwrap()
                .state()
                .is_connected()
        );
    }

    #[test]
    fn daemon_loss_clears_everything() {
        let mut st = state_with(&[("/s/a", "A")]);
        st.select("/s/a");
        let changes = st.apply(NetworkEvent::DaemonPresence {
            vpn: false,
            running: false,
        });
        assert_eq!(changes, vec![StateChange::Reset]);
        assert!(st.services().is_empty());
        assert!(st.technologies().is_empty());
        assert!(st.selected().is_none());
        assert_eq!(st.global_state(), GlobalState::Offline);
    }

    #[test]
    fn services_of_filters_by_kind() {
        let mut st = state_with(&[("/s/a", "A")]);
        st.apply(NetworkEvent::ServicesChanged {
            changed: vec![
                ("/s/a".into(), PropertyMap::new()),
                (
                    "/s/eth".into(),
                    PropertyMap::new().with("Type", "ethernet").with("Name", "Wired"),
                ),
            ],
            removed: vec![],
        });
        assert_eq!(st.services_of(&TechnologyType::Wifi).len(), 1);
        assert_eq!(st.services_of(&TechnologyType::Ethernet).len(), 1);
    }
}
