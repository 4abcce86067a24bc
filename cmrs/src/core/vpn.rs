//! VPN daemon operations.
//!
//! `connman-vpnd` keeps its own connection objects under
//! `/net/connman/vpn/connection/*`. Connecting one makes `connmand` publish
//! a matching service of type `vpn`.

use log::debug;
use zbus::Connection;

use crate::api::models::{ConnectionError, VpnConfig, VpnConnection};
use crate::dbus::VpnManagerProxy;
use crate::util::utils::{decode_object_list, object_path, vpn_connection_proxy};
use crate::Result;

pub(crate) async fn list_vpn_connections(conn: &Connection) -> Result<Vec<VpnConnection>> {
    let manager = VpnManagerProxy::new(conn).await?;
    let list = manager
        .get_connections()
        .await
        .map_err(|e| ConnectionError::from_call("failed to list VPN connections", e))?;
    Ok(decode_object_list(&list)
        .into_iter()
        .map(|(path, props)| VpnConnection::new(path, props))
        .collect())
}

pub(crate) async fn connect_vpn(conn: &Connection, path: &str) -> Result<()> {
    debug!("Connecting VPN {path}");
    let vpn = vpn_connection_proxy(conn, path).await?;
    vpn.connect()
        .await
        .map_err(|e| ConnectionError::from_call(format!("failed to connect {path}"), e))
}

pub(crate) async fn disconnect_vpn(conn: &Connection, path: &str) -> Result<()> {
    debug!("Disconnecting VPN {path}");
    let vpn = vpn_connection_proxy(conn, path).await?;
    vpn.disconnect()
        .await
        .map_err(|e| ConnectionError::from_call(format!("failed to disconnect {path}"), e))
}

/// Creates a connection and returns its object path.
pub(crate) async fn create_vpn(conn: &Connection, config: &VpnConfig) -> Result<String> {
    config.validate()?;
    let manager = VpnManagerProxy::new(conn).await?;
    let path = manager
        .create(config.to_map().to_dict())
        .await
        .map_err(|e| ConnectionError::from_call("failed to create VPN connection", e))?;
    debug!("Created VPN connection {}", path.as_str());
    Ok(path.as_str().to_string())
}

pub(crate) async fn remove_vpn(conn: &Connection, path: &str) -> Result<()> {
    let manager = VpnManagerProxy::new(conn).await?;
    manager
        .remove(&object_path(path)?)
        .await
        .map_err(|e| ConnectionError::from_call(format!("failed to remove {path}"), e))
}

pub(crate) async fn register_vpn_agent(conn: &Connection, path: &str) -> Result<()> {
    let manager = VpnManagerProxy::new(conn).await?;
    manager
        .register_agent(&object_path(path)?)
        .await
        .map_err(|e| ConnectionError::from_call("failed to register VPN agent", e))
}

pub(crate) async fn unregister_vpn_agent(conn: &Connection, path: &str) -> Result<()> {
    let manager = VpnManagerProxy::new(conn).await?;
    manager
        .unregister_agent(&object_path(path)?)
        .await
        .map_err(|e| ConnectionError::from_call("failed to unregister VPN agent", e))
}
