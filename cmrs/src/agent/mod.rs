//! Agents answering daemon-initiated prompts.
//!
//! ConnMan asks a registered agent for passphrases, hidden network names,
//! VPN credentials and browser logins. Our agents are exported on the
//! application's bus connection and forward each call as an
//! [`AgentRequest`] to whoever owns the receiving end of the channel,
//! usually the GUI. The D-Bus call stays pending until the request's
//! [`Responder`] is used or dropped.

pub mod request;
mod service_agent;
mod vpn_agent;

pub use request::{
    AgentRequest, ErrorAction, FieldType, InputField, Requirement, RequestSource, Responder,
    build_reply, parse_fields,
};
use service_agent::ServiceAgent;
use vpn_agent::VpnAgent;

use futures::channel::mpsc::UnboundedSender;
use log::{debug, warn};
use zbus::Connection;

use crate::core::{manager, vpn};
use crate::types::constants::agent_path;
use crate::Result;

/// Exports the service agent and registers it with `connmand`.
pub(crate) async fn serve_agent(conn: &Connection, tx: UnboundedSender<AgentRequest>) -> Result<()> {
    let added = conn
        .object_server()
        .at(agent_path::SERVICE, ServiceAgent::new(tx))
        .await?;
    if !added {
        debug!("Agent object already exported, replacing registration only");
    }
    manager::register_agent(conn, agent_path::SERVICE).await
}

/// Unregisters the service agent and removes the exported object.
pub(crate) async fn stop_agent(conn: &Connection) -> Result<()> {
    if let Err(e) = manager::unregister_agent(conn, agent_path::SERVICE).await {
        warn!("Failed to unregister agent: {e}");
    }
    conn.object_server()
        .remove::<ServiceAgent, _>(agent_path::SERVICE)
        .await?;
    Ok(())
}

/// Exports the VPN agent and registers it with `connman-vpnd`.
pub(crate) async fn serve_vpn_agent(
    conn: &Connection,
    tx: UnboundedSender<AgentRequest>,
) -> Result<()> {
    conn.object_server()
        .at(agent_path::VPN, VpnAgent::new(tx))
        .await?;
    vpn::register_vpn_agent(conn, agent_path::VPN).await
}

pub(crate) async fn stop_vpn_agent(conn: &Connection) -> Result<()> {
    if let Err(e) = vpn::unregister_vpn_agent(conn, agent_path::VPN).await {
        warn!("Failed to unregister VPN agent: {e}");
    }
    conn.object_server()
        .remove::<VpnAgent, _>(agent_path::VPN)
        .await?;
    Ok(())
}
