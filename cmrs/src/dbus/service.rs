//! ConnMan service proxy.

use std::collections::HashMap;
use zbus::{Result, proxy};
use zvariant::{ObjectPath, OwnedValue, Value};

/// Proxy for `net.connman.Service`.
///
/// `Connect` does not return until the service is connected or failed, and
/// may block on agent input, so callers should not hold UI state across it.
#[proxy(interface = "net.connman.Service", default_service = "net.connman")]
pub trait ConnmanService {
    fn get_properties(&self) -> Result<HashMap<String, OwnedValue>>;

    fn set_property(&self, name: &str, value: &Value<'_>) -> Result<()>;

    /// Resets a property to its default (e.g. `Error`).
    fn clear_property(&self, name: &str) -> Result<()>;

    fn connect(&self) -> Result<()>;

    fn disconnect(&self) -> Result<()>;

    /// Disconnects and forgets the service's stored configuration.
    fn remove(&self) -> Result<()>;

    /// Moves this service before `service` in the preference order.
    fn move_before(&self, service: &ObjectPath<'_>) -> Result<()>;

    /// Moves this service after `service` in the preference order.
    fn move_after(&self, service: &ObjectPath<'_>) -> Result<()>;

    /// Resets the traffic counters.
    fn reset_counters(&self) -> Result<()>;

    /// Emitted when one property of this service changes.
    #[zbus(signal, name = "PropertyChanged")]
    fn property_updated(&self, name: String, value: OwnedValue);
}
