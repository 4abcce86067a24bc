use futures::channel::mpsc::UnboundedSender;
use tokio::sync::watch;
use zbus::Connection;

use crate::Result;
use crate::agent::{self, AgentRequest};
use crate::api::events::NetworkEvent;
use crate::api::models::{
    Ipv4Settings, Ipv6Settings, ProxySettings, Service, Technology, VpnConfig, VpnConnection,
};
use crate::api::properties::{PropValue, PropertyMap};
use crate::core::state::NetworkState;
use crate::core::{manager, service, technology, vpn};
use crate::monitoring::events as event_monitor;
use crate::types::constants::{bus, keys};

/// High-level interface to ConnMan over D-Bus.
///
/// This is the main entry point for driving `connmand` and `connman-vpnd`.
/// The handle is cheap to clone; all clones share one system bus connection,
/// which is also where the agents are exported.
///
/// # Creating an Instance
///
/// ```no_run
/// use cmrs::ConnMan;
///
/// # async fn example() -> cmrs::Result<()> {
/// let cm = ConnMan::new().await?;
/// # Ok(())
/// # }
/// ```
///
/// # Capabilities
///
/// - **Snapshots**: technologies, services in daemon order, VPN connections
/// - **Technologies**: power, scanning, tethering
/// - **Services**: connect, disconnect, forget, IP/DNS/proxy configuration
/// - **VPN**: create, remove, connect and disconnect VPN connections
/// - **Agents**: answer passphrase and login prompts from the daemons
/// - **Real-Time Monitoring**: every daemon signal as a [`NetworkEvent`]
///
/// # Examples
///
/// ```no_run
/// use cmrs::{ConnMan, TechnologyType};
///
/// # async fn example() -> cmrs::Result<()> {
/// let cm = ConnMan::new().await?;
/// let state = cm.load_state().await?;
///
/// if let Some(wifi) = state
///     .technologies()
///     .into_iter()
///     .find(|t| t.kind() == TechnologyType::Wifi)
/// {
///     cm.set_powered(&wifi.path, true).await?;
///     cm.scan(&wifi.path).await?;
/// }
///
/// for svc in cm.services().await? {
///     println!("{:<24} {}", svc.name(), svc.state());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ConnMan {
    conn: Connection,
}

impl ConnMan {
    /// Creates a new `ConnMan` connected to the system bus.
    pub async fn new() -> Result<Self> {
        let conn = Connection::system().await?;
        Ok(Self { conn })
    }

    /// Wraps an existing bus connection.
    pub fn with_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// The underlying bus connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Returns whether `connmand` (or `connman-vpnd` if `vpn` is set) is on
    /// the bus.
    pub async fn daemon_running(&self, vpn: bool) -> Result<bool> {
        let name = if vpn { bus::CONNMAN_VPN } else { bus::CONNMAN };
        manager::name_has_owner(&self.conn, name).await
    }

    /// Global properties (`State`, `OfflineMode`).
    pub async fn manager_properties(&self) -> Result<PropertyMap> {
        manager::manager_properties(&self.conn).await
    }

    pub async fn technologies(&self) -> Result<Vec<Technology>> {
        manager::list_technologies(&self.conn).await
    }

    /// Services in the daemon's order (connected and preferred first).
    pub async fn services(&self) -> Result<Vec<Service>> {
        manager::list_services(&self.conn).await
    }

    pub async fn vpn_connections(&self) -> Result<Vec<VpnConnection>> {
        vpn::list_vpn_connections(&self.conn).await
    }

    /// Loads a complete [`NetworkState`] from both daemons.
    ///
    /// Fails with [`ConnectionError::DaemonUnavailable`](crate::ConnectionError::DaemonUnavailable)
    /// if `connmand` is not running. A missing VPN daemon leaves
    /// [`NetworkState::vpn_available`] false.
    pub async fn load_state(&self) -> Result<NetworkState> {
        manager::load_state(&self.conn).await
    }

    /// Re-reads one technology's properties.
    pub async fn technology(&self, path: &str) -> Result<Technology> {
        let props = technology::technology_properties(&self.conn, path).await?;
        Ok(Technology::new(path, props))
    }

    /// Re-reads one service's properties.
    pub async fn service(&self, path: &str) -> Result<Service> {
        let props = service::service_properties(&self.conn, path).await?;
        Ok(Service::new(path, props))
    }

    /// Switches every radio off (or back on).
    pub async fn set_offline_mode(&self, enabled: bool) -> Result<()> {
        manager::set_offline_mode(&self.conn, enabled).await
    }

    pub async fn set_powered(&self, path: &str, powered: bool) -> Result<()> {
        technology::set_powered(&self.conn, path, powered).await
    }

    /// Powers a technology on, then scans it once it has settled.
    pub async fn power_on_and_scan(&self, path: &str) -> Result<()> {
        technology::power_on_and_scan(&self.conn, path).await
    }

    /// Scans for networks; returns when the scan completes.
    ///
    /// Results arrive as `ServicesChanged` signals.
    pub async fn scan(&self, path: &str) -> Result<()> {
        technology::scan(&self.conn, path).await
    }

    pub async fn set_tethering(&self, path: &str, enabled: bool) -> Result<()> {
        technology::set_tethering(&self.conn, path, enabled).await
    }

    /// Sets the access point name and passphrase used when tethering.
    ///
    /// The identifier must be 1-32 bytes and the passphrase 8-63
    /// characters; other input fails with `InvalidInput` without a bus call.
    pub async fn configure_tethering(
        &self,
        path: &str,
        identifier: &str,
        passphrase: &str,
    ) -> Result<()> {
        technology::configure_tethering(&self.conn, path, identifier, passphrase).await
    }

    /// Connects a service.
    ///
    /// The call returns once the daemon has finished trying, which may
    /// include one or more agent round trips for credentials.
    pub async fn connect_service(&self, path: &str) -> Result<()> {
        service::connect(&self.conn, path).await
    }

    pub async fn disconnect_service(&self, path: &str) -> Result<()> {
        service::disconnect(&self.conn, path).await
    }

    /// Forgets a service: disconnects it and drops its stored settings.
    pub async fn remove_service(&self, path: &str) -> Result<()> {
        service::remove(&self.conn, path).await
    }

    pub async fn set_autoconnect(&self, path: &str, enabled: bool) -> Result<()> {
        service::set_property(&self.conn, path, keys::AUTO_CONNECT, enabled.into()).await
    }

    pub async fn set_mdns(&self, path: &str, enabled: bool) -> Result<()> {
        service::set_property(&self.conn, path, keys::MDNS, enabled.into()).await
    }

    pub async fn set_ipv4_config(&self, path: &str, config: &Ipv4Settings) -> Result<()> {
        service::set_property(&self.conn, path, keys::IPV4_CONFIG, config.to_map().into()).await
    }

    pub async fn set_ipv6_config(&self, path: &str, config: &Ipv6Settings) -> Result<()> {
        service::set_property(&self.conn, path, keys::IPV6_CONFIG, config.to_map().into()).await
    }

    /// Sets user nameservers; an empty list reverts to automatic ones.
    pub async fn set_nameservers(&self, path: &str, servers: Vec<String>) -> Result<()> {
        service::set_property(&self.conn, path, keys::NAMESERVERS_CONFIG, servers.into()).await
    }

    pub async fn set_timeservers(&self, path: &str, servers: Vec<String>) -> Result<()> {
        service::set_property(&self.conn, path, keys::TIMESERVERS_CONFIG, servers.into()).await
    }

    pub async fn set_domains(&self, path: &str, domains: Vec<String>) -> Result<()> {
        service::set_property(&self.conn, path, keys::DOMAINS_CONFIG, domains.into()).await
    }

    pub async fn set_proxy_config(&self, path: &str, config: &ProxySettings) -> Result<()> {
        service::set_property(&self.conn, path, keys::PROXY_CONFIG, config.to_map().into()).await
    }

    /// Writes an arbitrary service property.
    pub async fn set_service_property(&self, path: &str, name: &str, value: PropValue) -> Result<()> {
        service::set_property(&self.conn, path, name, value).await
    }

    /// Resets a `*.Configuration` property to its default.
    pub async fn clear_service_property(&self, path: &str, name: &str) -> Result<()> {
        service::clear_property(&self.conn, path, name).await
    }

    /// Prefers `path` over `other` when both are available.
    pub async fn move_service_before(&self, path: &str, other: &str) -> Result<()> {
        service::move_before(&self.conn, path, other).await
    }

    pub async fn move_service_after(&self, path: &str, other: &str) -> Result<()> {
        service::move_after(&self.conn, path, other).await
    }

    pub async fn reset_counters(&self, path: &str) -> Result<()> {
        service::reset_counters(&self.conn, path).await
    }

    pub async fn connect_vpn(&self, path: &str) -> Result<()> {
        vpn::connect_vpn(&self.conn, path).await
    }

    pub async fn disconnect_vpn(&self, path: &str) -> Result<()> {
        vpn::disconnect_vpn(&self.conn, path).await
    }

    /// Creates a VPN connection and returns its object path.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use cmrs::{ConnMan, VpnConfig};
    ///
    /// # async fn example() -> cmrs::Result<()> {
    /// let cm = ConnMan::new().await?;
    /// let config = VpnConfig::new("openconnect", "Work", "vpn.example.com", "example.com")
    ///     .with_option("OpenConnect.Usergroup", "staff");
    /// let path = cm.create_vpn(&config).await?;
    /// cm.connect_vpn(&path).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn create_vpn(&self, config: &VpnConfig) -> Result<String> {
        vpn::create_vpn(&self.conn, config).await
    }

    pub async fn remove_vpn(&self, path: &str) -> Result<()> {
        vpn::remove_vpn(&self.conn, path).await
    }

    /// Exports the service agent and registers it with `connmand`.
    ///
    /// Every prompt arrives on `tx`'s receiver as an [`AgentRequest`]. The
    /// daemon's call stays pending until the request's responder is used;
    /// dropping the request answers `Canceled`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use cmrs::{AgentRequest, ConnMan};
    /// use futures::StreamExt;
    /// use std::collections::HashMap;
    ///
    /// # async fn example() -> cmrs::Result<()> {
    /// let cm = ConnMan::new().await?;
    /// let (tx, mut rx) = futures::channel::mpsc::unbounded();
    /// cm.register_agent(tx).await?;
    ///
    /// while let Some(request) = rx.next().await {
    ///     if let AgentRequest::RequestInput { responder, .. } = request {
    ///         let mut answers = HashMap::new();
    ///         answers.insert("Passphrase".to_string(), "secret123".to_string());
    ///         responder.respond(answers);
    ///     }
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn register_agent(&self, tx: UnboundedSender<AgentRequest>) -> Result<()> {
        agent::serve_agent(&self.conn, tx).await
    }

    pub async fn unregister_agent(&self) -> Result<()> {
        agent::stop_agent(&self.conn).await
    }

    /// Exports the VPN agent and registers it with `connman-vpnd`.
    pub async fn register_vpn_agent(&self, tx: UnboundedSender<AgentRequest>) -> Result<()> {
        agent::serve_vpn_agent(&self.conn, tx).await
    }

    pub async fn unregister_vpn_agent(&self) -> Result<()> {
        agent::stop_vpn_agent(&self.conn).await
    }

    /// Delivers every daemon notification until `shutdown` changes.
    ///
    /// Feed the events to [`NetworkState::apply`] to keep a model current.
    /// This function runs until shutdown or until the bus stream ends. Run
    /// it in a background task.
    ///
    /// # Example
    ///
    /// ```ignore
    /// # use cmrs::ConnMan;
    /// # async fn example() -> cmrs::Result<()> {
    /// let cm = ConnMan::new().await?;
    /// let (_stop, shutdown) = tokio::sync::watch::channel(());
    ///
    /// glib::MainContext::default().spawn_local({
    ///     let cm = cm.clone();
    ///     async move {
    ///         cm.monitor(shutdown, |event| {
    ///             println!("{event:?}");
    ///         })
    ///         .await
    ///     }
    /// });
    /// # Ok(())
    /// # }
    /// ```
    pub async fn monitor<F>(&self, shutdown: watch::Receiver<()>, callback: F) -> Result<()>
    where
        F: Fn(NetworkEvent) + 'static,
    {
        event_monitor::monitor(&self.conn, shutdown, callback).await
    }
}
