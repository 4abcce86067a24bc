//! ConnMan VPN daemon proxies.

use std::collections::HashMap;
use zbus::{Result, proxy};
use zvariant::{ObjectPath, OwnedObjectPath, OwnedValue, Value};

use super::ObjectList;

/// Proxy for `net.connman.vpn.Manager` on the `net.connman.vpn` service.
#[proxy(
    interface = "net.connman.vpn.Manager",
    default_service = "net.connman.vpn",
    default_path = "/"
)]
pub trait VpnManager {
    /// Returns every configured VPN connection with its properties.
    fn get_connections(&self) -> Result<ObjectList>;

    /// Creates a new connection from a provider dictionary.
    fn create(&self, properties: HashMap<String, Value<'_>>) -> Result<OwnedObjectPath>;

    /// Removes a connection and its stored configuration.
    fn remove(&self, connection: &ObjectPath<'_>) -> Result<()>;

    fn register_agent(&self, path: &ObjectPath<'_>) -> Result<()>;

    fn unregister_agent(&self, path: &ObjectPath<'_>) -> Result<()>;

    #[zbus(signal)]
    fn connection_added(&self, path: OwnedObjectPath, properties: HashMap<String, OwnedValue>);

    #[zbus(signal)]
    fn connection_removed(&self, path: OwnedObjectPath);
}

/// Proxy for `net.connman.vpn.Connection`.
#[proxy(interface = "net.connman.vpn.Connection", default_service = "net.connman.vpn")]
pub trait VpnConnection {
    fn get_properties(&self) -> Result<HashMap<String, OwnedValue>>;

    fn set_property(&self, name: &str, value: &Value<'_>) -> Result<()>;

    fn clear_property(&self, name: &str) -> Result<()>;

    fn connect(&self) -> Result<()>;

    fn disconnect(&self) -> Result<()>;

    #[zbus(signal, name = "PropertyChanged")]
    fn property_updated(&self, name: String, value: OwnedValue);
}
