//! Helpers for building proxies and converting daemon data.
//!
//! Provides conversions between the raw `a(oa{sv})` lists ConnMan returns
//! and our property tables, plus input validation done before any bus
//! round trip.

use zbus::Connection;
use zvariant::ObjectPath;

use crate::api::models::ConnectionError;
use crate::api::properties::PropertyMap;
use crate::dbus::{
    ConnmanServiceProxy, ConnmanTechnologyProxy, ObjectList, VpnConnectionProxy,
};
use crate::types::constants::tethering;
use crate::Result;

/// Parses a D-Bus object path supplied by a caller.
pub(crate) fn object_path(path: &str) -> Result<ObjectPath<'_>> {
    ObjectPath::try_from(path)
        .map_err(|e| ConnectionError::InvalidInput(format!("bad object path '{path}': {e}")))
}

/// Converts an object list into `(path, properties)` pairs, keeping order.
pub(crate) fn decode_object_list(list: &ObjectList) -> Vec<(String, PropertyMap)> {
    list.iter()
        .map(|(path, props)| (path.as_str().to_string(), PropertyMap::from_dbus(&props)))
        .collect()
}

pub(crate) async fn technology_proxy<'a>(
    conn: &Connection,
    path: &'a str,
) -> Result<ConnmanTechnologyProxy<'a>> {
    Ok(ConnmanTechnologyProxy::builder(conn)
        .path(object_path(path)?)?
        .build()
        .await?)
}

pub(crate) async fn service_proxy<'a>(
    conn: &Connection,
    path: &'a str,
) -> Result<ConnmanServiceProxy<'a>> {
    Ok(ConnmanServiceProxy::builder(conn)
        .path(object_path(path)?)?
        .build()
        .await?)
}

pub(crate) async fn vpn_connection_proxy<'a>(
    conn: &Connection,
    path: &'a str,
) -> Result<VpnConnectionProxy<'a>> {
    Ok(VpnConnectionProxy::builder(conn)
        .path(object_path(path)?)?
        .build()
        .await?)
}

/// Checks tethering credentials against the daemon's limits.
///
/// The identifier is an SSID (1-32 bytes); the passphrase is a WPA2
/// passphrase (8-63 characters).
pub fn validate_tethering(identifier: &str, passphrase: &str) -> Result<()> {
    if identifier.is_empty() || identifier.len() > tethering::IDENTIFIER_MAX_BYTES {
        return Err(ConnectionError::InvalidInput(format!(
            "network name must be 1-{} bytes",
            tethering::IDENTIFIER_MAX_BYTES
        )));
    }
    let len = passphrase.chars().count();
    if !(tethering::PASSPHRASE_MIN..=tethering::PASSPHRASE_MAX).contains(&len) {
        return Err(ConnectionError::InvalidInput(format!(
            "passphrase must be {}-{} characters",
            tethering::PASSPHRASE_MIN,
            tethering::PASSPHRASE_MAX
        )));
    }
    Ok(())
}

/// Splits user-entered server or domain lists on commas and whitespace.
pub fn split_list(text: &str) -> Vec<String> {
    text.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tethering_limits() {
        assert!(validate_tethering("hotspot", "password").is_ok());
        assert!(validate_tethering("", "password").is_err());
        assert!(validate_tethering(&"a".repeat(33), "password").is_err());
        assert!(validate_tethering("hotspot", "short").is_err());
        assert!(validate_tethering("hotspot", &"p".repeat(63)).is_ok());
        assert!(validate_tethering("hotspot", &"p".repeat(64)).is_err());
    }

    #[test]
    fn split_list_handles_mixed_separators() {
        assert_eq!(
            split_list("8.8.8.8, 1.1.1.1\n9.9.9.9;;"),
            vec!["8.8.8.8", "1.1.1.1", "9.9.9.9"]
        );
        assert!(split_list("  ").is_empty());
    }

    #[test]
    fn object_path_rejects_garbage() {
        assert!(object_path("/net/connman/service/wifi_1").is_ok());
        assert!(matches!(
            object_path("not a path"),
            Err(ConnectionError::InvalidInput(_))
        ));
    }
}
