//! ConnMan technology proxy.

use std::collections::HashMap;
use zbus::{Result, proxy};
use zvariant::{OwnedValue, Value};

/// Proxy for `net.connman.Technology`.
///
/// One object per medium (`/net/connman/technology/wifi`, ...). Writable
/// properties are `Powered`, `Tethering`, `TetheringIdentifier`,
/// `TetheringPassphrase` and `TetheringFreq`.
#[proxy(interface = "net.connman.Technology", default_service = "net.connman")]
pub trait ConnmanTechnology {
    fn get_properties(&self) -> Result<HashMap<String, OwnedValue>>;

    fn set_property(&self, name: &str, value: &Value<'_>) -> Result<()>;

    /// Requests a scan; returns once the scan has completed.
    fn scan(&self) -> Result<()>;

    /// Emitted when one property of this technology changes.
    #[zbus(signal, name = "PropertyChanged")]
    fn property_updated(&self, name: String, value: OwnedValue);
}
