//! ConnMan manager proxy.

use std::collections::HashMap;
use zbus::{Result, proxy};
use zvariant::{ObjectPath, OwnedObjectPath, OwnedValue, Value};

use super::ObjectList;

/// Proxy for the `net.connman.Manager` interface at `/`.
///
/// Lists technologies and services, holds the global `State` and
/// `OfflineMode` properties and accepts agent registrations.
///
/// # Signals
///
/// `ServicesChanged` carries the complete, ordered service list. Entries
/// whose dictionary is empty are unchanged; the rest are new or updated.
///
/// ```ignore
/// let mut stream = manager.receive_services_changed().await?;
/// while let Some(signal) = stream.next().await {
///     let args = signal.args()?;
///     println!("{} changed, {} removed", args.changed.len(), args.removed.len());
/// }
/// ```
#[proxy(
    interface = "net.connman.Manager",
    default_service = "net.connman",
    default_path = "/"
)]
pub trait ConnmanManager {
    /// Returns the global properties (`State`, `OfflineMode`, `SessionMode`).
    fn get_properties(&self) -> Result<HashMap<String, OwnedValue>>;

    /// Changes a global property; only `OfflineMode` is writable.
    fn set_property(&self, name: &str, value: &Value<'_>) -> Result<()>;

    /// Returns every technology with its properties.
    fn get_technologies(&self) -> Result<ObjectList>;

    /// Returns every service with its properties, in daemon order.
    fn get_services(&self) -> Result<ObjectList>;

    /// Registers an agent object for credential requests.
    fn register_agent(&self, path: &ObjectPath<'_>) -> Result<()>;

    /// Unregisters a previously registered agent.
    fn unregister_agent(&self, path: &ObjectPath<'_>) -> Result<()>;

    /// Emitted when a global property changes.
    #[zbus(signal, name = "PropertyChanged")]
    fn property_updated(&self, name: String, value: OwnedValue);

    /// Emitted when a technology appears (e.g. an adapter is plugged in).
    #[zbus(signal)]
    fn technology_added(&self, path: OwnedObjectPath, properties: HashMap<String, OwnedValue>);

    /// Emitted when a technology disappears.
    #[zbus(signal)]
    fn technology_removed(&self, path: OwnedObjectPath);

    /// Emitted when the service list or any service's basic properties change.
    #[zbus(signal)]
    fn services_changed(&self, changed: ObjectList, removed: Vec<OwnedObjectPath>);
}
