//! D-Bus proxy interfaces for ConnMan.
//!
//! This module contains low-level D-Bus proxy definitions for communicating
//! with `connmand` and `connman-vpnd` over the system bus.
//!
//! ConnMan does not implement `org.freedesktop.DBus.Properties`. Every object
//! exposes `GetProperties`/`SetProperty` methods and a `PropertyChanged`
//! signal of its own, so none of these proxies declare `#[zbus(property)]`
//! members.

mod manager;
mod service;
mod technology;
mod vpn;

pub(crate) use manager::ConnmanManagerProxy;
pub(crate) use service::ConnmanServiceProxy;
pub(crate) use technology::ConnmanTechnologyProxy;
pub(crate) use vpn::{VpnConnectionProxy, VpnManagerProxy};

use std::collections::HashMap;
use zvariant::{OwnedObjectPath, OwnedValue};

/// Object list returned by `GetTechnologies`, `GetServices` and
/// `GetConnections`.
pub(crate) type ObjectList = Vec<(OwnedObjectPath, HashMap<String, OwnedValue>)>;
