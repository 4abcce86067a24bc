//! Manager-level operations: snapshots, offline mode and agents.

use log::{debug, warn};
use zbus::Connection;
use zbus::fdo::DBusProxy;
use zvariant::Value;

use crate::api::models::{ConnectionError, Service, Technology};
use crate::api::properties::PropertyMap;
use crate::core::state::NetworkState;
use crate::core::vpn::list_vpn_connections;
use crate::dbus::ConnmanManagerProxy;
use crate::types::constants::{bus, keys};
use crate::util::utils::{decode_object_list, object_path};
use crate::Result;

/// Returns whether `name` currently has an owner on the bus.
pub(crate) async fn name_has_owner(conn: &Connection, name: &str) -> Result<bool> {
    let dbus = DBusProxy::new(conn).await?;
    let bus_name = zbus::names::BusName::try_from(name)
        .map_err(|e| ConnectionError::InvalidInput(e.to_string()))?;
    dbus.name_has_owner(bus_name)
        .await
        .map_err(|e| ConnectionError::from_call("failed to query bus name owner", e.into()))
}

/// Fetches the manager's global properties.
pub(crate) async fn manager_properties(conn: &Connection) -> Result<PropertyMap> {
    let manager = ConnmanManagerProxy::new(conn).await?;
    let props = manager
        .get_properties()
        .await
        .map_err(|e| ConnectionError::from_call("failed to get manager properties", e))?;
    Ok(PropertyMap::from_dbus(&props))
}

pub(crate) async fn list_technologies(conn: &Connection) -> Result<Vec<Technology>> {
    let manager = ConnmanManagerProxy::new(conn).await?;
    let list = manager
        .get_technologies()
        .await
        .map_err(|e| ConnectionError::from_call("failed to list technologies", e))?;
    Ok(decode_object_list(&list)
        .into_iter()
        .map(|(path, props)| Technology::new(path, props))
        .collect())
}

pub(crate) async fn list_services(conn: &Connection) -> Result<Vec<Service>> {
    let manager = ConnmanManagerProxy::new(conn).await?;
    let list = manager
        .get_services()
        .await
        .map_err(|e| ConnectionError::from_call("failed to list services", e))?;
    Ok(decode_object_list(&list)
        .into_iter()
        .map(|(path, props)| Service::new(path, props))
        .collect())
}

/// Loads a complete snapshot of both daemons.
///
/// A missing `connmand` is an error. A missing `connman-vpnd` only leaves
/// the VPN part empty.
pub(crate) async fn load_state(conn: &Connection) -> Result<NetworkState> {
    if !name_has_owner(conn, bus::CONNMAN).await? {
        return Err(ConnectionError::DaemonUnavailable("connman".into()));
    }

    let manager = manager_properties(conn).await?;
    let technologies = list_technologies(conn).await?;
    let services = list_services(conn).await?;

    let vpn = if name_has_owner(conn, bus::CONNMAN_VPN).await.unwrap_or(false) {
        match list_vpn_connections(conn).await {
            Ok(list) => Some(list),
            Err(e) => {
                warn!("VPN daemon present but not answering: {e}");
                None
            }
        }
    } else {
        debug!("connman-vpnd not running, VPN support disabled");
        None
    };

    debug!(
        "Loaded {} technologies, {} services",
        technologies.len(),
        services.len()
    );
    Ok(NetworkState::from_snapshot(manager, technologies, services, vpn))
}

pub(crate) async fn set_offline_mode(conn: &Connection, enabled: bool) -> Result<()> {
    let manager = ConnmanManagerProxy::new(conn).await?;
    manager
        .set_property(keys::OFFLINE_MODE, &Value::from(enabled))
        .await
        .map_err(|e| ConnectionError::from_call("failed to set offline mode", e))
}

pub(crate) async fn register_agent(conn: &Connection, path: &str) -> Result<()> {
    let manager = ConnmanManagerProxy::new(conn).await?;
    manager
        .register_agent(&object_path(path)?)
        .await
        .map_err(|e| ConnectionError::from_call("failed to register agent", e))?;
    debug!("Registered agent at {path}");
    Ok(())
}

pub(crate) async fn unregister_agent(conn: &Connection, path: &str) -> Result<()> {
    let manager = ConnmanManagerProxy::new(conn).await?;
    manager
        .unregister_agent(&object_path(path)?)
        .await
        .map_err(|e| ConnectionError::from_call("failed to unregister agent", e))
}
