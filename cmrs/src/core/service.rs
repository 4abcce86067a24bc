//! Service operations: connecting, editing configuration and forgetting.

use log::debug;
use zbus::Connection;
use zvariant::Value;

use crate::api::models::ConnectionError;
use crate::api::properties::{PropValue, PropertyMap};
use crate::util::utils::{object_path, service_proxy};
use crate::Result;

pub(crate) async fn service_properties(conn: &Connection, path: &str) -> Result<PropertyMap> {
    let svc = service_proxy(conn, path).await?;
    let props = svc
        .get_properties()
        .await
        .map_err(|e| ConnectionError::from_call(format!("failed to read {path}"), e))?;
    Ok(PropertyMap::from_dbus(&props))
}

/// Connects and returns once the daemon reports success or failure.
pub(crate) async fn connect(conn: &Connection, path: &str) -> Result<()> {
    debug!("Connecting service {path}");
    let svc = service_proxy(conn, path).await?;
    svc.connect()
        .await
        .map_err(|e| ConnectionError::from_call(format!("failed to connect {path}"), e))
}

pub(crate) async fn disconnect(conn: &Connection, path: &str) -> Result<()> {
    debug!("Disconnecting service {path}");
    let svc = service_proxy(conn, path).await?;
    svc.disconnect()
        .await
        .map_err(|e| ConnectionError::from_call(format!("failed to disconnect {path}"), e))
}

pub(crate) async fn remove(conn: &Connection, path: &str) -> Result<()> {
    debug!("Removing service {path}");
    let svc = service_proxy(conn, path).await?;
    svc.remove()
        .await
        .map_err(|e| ConnectionError::from_call(format!("failed to forget {path}"), e))
}

/// Writes one service property.
pub(crate) async fn set_property(
    conn: &Connection,
    path: &str,
    name: &str,
    value: PropValue,
) -> Result<()> {
    debug!("Setting {name} on {path}");
    let svc = service_proxy(conn, path).await?;
    let value: Value<'static> = value.to_value();
    svc.set_property(name, &value)
        .await
        .map_err(|e| ConnectionError::from_call(format!("failed to set {name}"), e))
}

pub(crate) async fn clear_property(conn: &Connection, path: &str, name: &str) -> Result<()> {
    let svc = service_proxy(conn, path).await?;
    svc.clear_property(name)
        .await
        .map_err(|e| ConnectionError::from_call(format!("failed to clear {name}"), e))
}

pub(crate) async fn move_before(conn: &Connection, path: &str, other: &str) -> Result<()> {
    let svc = service_proxy(conn, path).await?;
    svc.move_before(&object_path(other)?)
        .await
        .map_err(|e| ConnectionError::from_call("failed to reorder services", e))
}

pub(crate) async fn move_after(conn: &Connection, path: &str, other: &str) -> Result<()> {
    let svc = service_proxy(conn, path).await?;
    svc.move_after(&object_path(other)?)
        .await
        .map_err(|e| ConnectionError::from_call("failed to reorder services", e))
}

pub(crate) async fn reset_counters(conn: &Connection, path: &str) -> Result<()> {
    let svc = service_proxy(conn, path).await?;
    svc.reset_counters()
        .await
        .map_err(|e| ConnectionError::from_call("failed to reset counters", e))
}
