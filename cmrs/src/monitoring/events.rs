//! Signal subscriptions for every ConnMan object kind.
//!
//! Manager and VPN manager signals come from fixed objects and are received
//! through their proxies. `PropertyChanged` on technologies, services and
//! VPN connections is received with one match rule per interface, covering
//! every object of that kind including ones created later.

use futures::future::{Either, select};
use futures::stream::{Stream, StreamExt};
use log::{debug, warn};
use std::pin::Pin;
use tokio::sync::watch;
use zbus::message::Type as MessageType;
use zbus::{Connection, MatchRule, Message, MessageStream};
use zvariant::OwnedValue;

use crate::api::events::{NetworkEvent, ObjectKind};
use crate::api::models::ConnectionError;
use crate::api::properties::{PropValue, PropertyMap};
use crate::dbus::{ConnmanManagerProxy, VpnManagerProxy};
use crate::monitoring::presence::presence_events;
use crate::types::constants::interface;
use crate::util::utils::decode_object_list;
use crate::Result;

type EventStream = Pin<Box<dyn Stream<Item = NetworkEvent>>>;

/// Decodes a `PropertyChanged(s, v)` signal into an event.
pub(crate) fn decode_property_changed(kind: ObjectKind, msg: &Message) -> Option<NetworkEvent> {
    let header = msg.header();
    let path = header.path()?.as_str().to_string();
    let (name, value): (String, OwnedValue) = msg.body().deserialize().ok()?;
    Some(NetworkEvent::PropertyChanged {
        kind,
        path,
        name,
        value: PropValue::from_value(&value),
    })
}

/// The rule matches on interface only; the interfaces are unique to the two
/// daemons, and the sender would have to be their unique bus name.
async fn property_stream(
    conn: &Connection,
    iface: &'static str,
    kind: ObjectKind,
) -> Result<EventStream> {
    let rule = MatchRule::builder()
        .msg_type(MessageType::Signal)
        .interface(iface)?
        .member("PropertyChanged")?
        .build();
    let stream = MessageStream::for_match_rule(rule, conn, None).await?;
    debug!("Subscribed to PropertyChanged on {iface}");

    Ok(Box::pin(stream.filter_map(move |msg| {
        let kind = kind.clone();
        async move {
            match msg {
                Ok(msg) => decode_property_changed(kind, &msg),
                Err(e) => {
                    warn!("Dropping malformed signal: {e}");
                    None
                }
            }
        }
    })))
}

async fn manager_streams(conn: &Connection, streams: &mut Vec<EventStream>) -> Result<()> {
    let manager = ConnmanManagerProxy::new(conn).await?;

    let props = manager.receive_property_updated().await?;
    streams.push(Box::pin(props.filter_map(|signal| async move {
        let args = signal.args().ok()?;
        Some(NetworkEvent::PropertyChanged {
            kind: ObjectKind::Manager,
            path: "/".into(),
            name: args.name().clone(),
            value: PropValue::from_value(args.value()),
        })
    })));

    let added = manager.receive_technology_added().await?;
    streams.push(Box::pin(added.filter_map(|signal| async move {
        let args = signal.args().ok()?;
        Some(NetworkEvent::TechnologyAdded {
            path: args.path().as_str().to_string(),
            properties: PropertyMap::from_dbus(args.properties()),
        })
    })));

    let removed = manager.receive_technology_removed().await?;
    streams.push(Box::pin(removed.filter_map(|signal| async move {
        let args = signal.args().ok()?;
        Some(NetworkEvent::TechnologyRemoved {
            path: args.path().as_str().to_string(),
        })
    })));

    let services = manager.receive_services_changed().await?;
    streams.push(Box::pin(services.filter_map(|signal| async move {
        let args = signal.args().ok()?;
        Some(NetworkEvent::ServicesChanged {
            changed: decode_object_list(args.changed()),
            removed: args
                .removed()
                .iter()
                .map(|p| p.as_str().to_string())
                .collect(),
        })
    })));

    debug!("Subscribed to manager signals");
    Ok(())
}

async fn vpn_manager_streams(conn: &Connection, streams: &mut Vec<EventStream>) -> Result<()> {
    let manager = VpnManagerProxy::new(conn).await?;

    let added = manager.receive_connection_added().await?;
    streams.push(Box::pin(added.filter_map(|signal| async move {
        let args = signal.args().ok()?;
        Some(NetworkEvent::VpnConnectionAdded {
            path: args.path().as_str().to_string(),
            properties: PropertyMap::from_dbus(args.properties()),
        })
    })));

    let removed = manager.receive_connection_removed().await?;
    streams.push(Box::pin(removed.filter_map(|signal| async move {
        let args = signal.args().ok()?;
        Some(NetworkEvent::VpnConnectionRemoved {
            path: args.path().as_str().to_string(),
        })
    })));

    debug!("Subscribed to VPN manager signals");
    Ok(())
}

/// Delivers every daemon notification to `callback` until `shutdown` fires.
///
/// Signals from both daemons are merged into one stream, so the callback
/// sees them in the order the bus delivered them. Subscriptions to the VPN
/// daemon are made even while it is absent; signals start flowing once it
/// appears.
///
/// Returns `Ok(())` on shutdown and [`ConnectionError::Stuck`] if the bus
/// stream ends.
pub async fn monitor<F>(
    conn: &Connection,
    mut shutdown: watch::Receiver<()>,
    callback: F,
) -> Result<()>
where
    F: Fn(NetworkEvent) + 'static,
{
    let mut streams: Vec<EventStream> = Vec::new();

    manager_streams(conn, &mut streams).await?;
    vpn_manager_streams(conn, &mut streams).await?;
    streams.push(property_stream(conn, interface::TECHNOLOGY, ObjectKind::Technology).await?);
    streams.push(property_stream(conn, interface::SERVICE, ObjectKind::Service).await?);
    streams.push(property_stream(conn, interface::VPN_CONNECTION, ObjectKind::VpnConnection).await?);
    streams.push(presence_events(conn).await?);

    debug!("Monitoring {} signal streams", streams.len());

    let mut merged = futures::stream::select_all(streams);

    loop {
        let stop = Box::pin(shutdown.changed());
        match select(stop, merged.next()).await {
            Either::Left(_) => {
                debug!("Monitoring stopped");
                return Ok(());
            }
            Either::Right((Some(event), _)) => callback(event),
            Either::Right((None, _)) => break,
        }
    }

    warn!("Monitoring stream ended unexpectedly");
    Err(ConnectionError::Stuck("monitoring stream ended".into()))
}
