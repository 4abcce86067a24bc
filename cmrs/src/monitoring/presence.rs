//! Daemon presence tracking via `NameOwnerChanged`.

use futures::stream::{Stream, StreamExt};
use log::debug;
use std::pin::Pin;
use zbus::Connection;
use zbus::fdo::DBusProxy;

use crate::api::events::NetworkEvent;
use crate::types::constants::bus;
use crate::Result;

/// Maps an owner change of `name` to a presence event.
///
/// Returns `None` for names other than the two daemons.
pub(crate) fn presence_event(name: &str, has_new_owner: bool) -> Option<NetworkEvent> {
    let vpn = match name {
        bus::CONNMAN => false,
        bus::CONNMAN_VPN => true,
        _ => return None,
    };
    Some(NetworkEvent::DaemonPresence {
        vpn,
        running: has_new_owner,
    })
}

/// Streams presence events for `connmand` and `connman-vpnd`.
pub(crate) async fn presence_events(
    conn: &Connection,
) -> Result<Pin<Box<dyn Stream<Item = NetworkEvent>>>> {
    let dbus = DBusProxy::new(conn).await?;
    let stream = dbus.receive_name_owner_changed().await?;
    debug!("Watching daemon presence");

    Ok(Box::pin(stream.filter_map(|signal| async move {
        let args = signal.args().ok()?;
        let event = presence_event(args.name().as_str(), args.new_owner().is_some())?;
        debug!("Daemon presence changed: {event:?}");
        Some(event)
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_only_connman_names() {
        assert_eq!(
            presence_event("net.connman", true),
            Some(NetworkEvent::DaemonPresence {
                vpn: false,
                running: true
            })
        );
        assert_eq!(
            presence_event("net.connman.vpn", false),
            Some(NetworkEvent::DaemonPresence {
                vpn: true,
                running: false
            })
        );
        assert_eq!(presence_event("org.freedesktop.NetworkManager", true), None);
    }
}
