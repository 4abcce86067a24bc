use std::fmt::{Display, Formatter};
use thiserror::Error;

use crate::api::properties::PropertyMap;
use crate::types::constants::{EXPECTED_ERRORS, keys, signal_strength};

/// Global connectivity state reported by the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlobalState {
    Offline,
    Idle,
    Ready,
    Online,
    Unknown(String),
}

impl From<&str> for GlobalState {
    fn from(s: &str) -> Self {
        match s {
            "offline" => Self::Offline,
            "idle" => Self::Idle,
            "ready" => Self::Ready,
            "online" => Self::Online,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl Display for GlobalState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Offline => write!(f, "Offline"),
            Self::Idle => write!(f, "Not connected"),
            Self::Ready => write!(f, "Connected"),
            Self::Online => write!(f, "Online"),
            Self::Unknown(s) => write!(f, "Unknown ({s})"),
        }
    }
}

/// Kind of network medium a technology (or service) uses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TechnologyType {
    Ethernet,
    Wifi,
    Bluetooth,
    Cellular,
    P2p,
    Gadget,
    Wireguard,
    Vpn,
    Other(String),
}

impl TechnologyType {
    /// Whether the daemon can share connectivity over this medium.
    pub fn supports_tethering(&self) -> bool {
        matches!(
            self,
            Self::Wifi | Self::Bluetooth | Self::Ethernet | Self::Gadget
        )
    }

    /// Whether services of this kind are discovered by scanning.
    pub fn supports_scanning(&self) -> bool {
        matches!(self, Self::Wifi | Self::P2p)
    }

    /// Whether tethering needs an identifier and passphrase.
    pub fn needs_tethering_credentials(&self) -> bool {
        matches!(self, Self::Wifi)
    }

    /// The `Type` string ConnMan uses.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Ethernet => "ethernet",
            Self::Wifi => "wifi",
            Self::Bluetooth => "bluetooth",
            Self::Cellular => "cellular",
            Self::P2p => "p2p",
            Self::Gadget => "gadget",
            Self::Wireguard => "wireguard",
            Self::Vpn => "vpn",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for TechnologyType {
    fn from(s: &str) -> Self {
        match s {
            "ethernet" => Self::Ethernet,
            "wifi" => Self::Wifi,
            "bluetooth" => Self::Bluetooth,
            "cellular" => Self::Cellular,
            "p2p" => Self::P2p,
            "gadget" => Self::Gadget,
            "wireguard" => Self::Wireguard,
            "vpn" => Self::Vpn,
            other => Self::Other(other.to_string()),
        }
    }
}

impl Display for TechnologyType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ethernet => write!(f, "Wired"),
            Self::Wifi => write!(f, "Wireless"),
            Self::Bluetooth => write!(f, "Bluetooth"),
            Self::Cellular => write!(f, "Cellular"),
            Self::P2p => write!(f, "P2P"),
            Self::Gadget => write!(f, "USB Gadget"),
            Self::Wireguard => write!(f, "WireGuard"),
            Self::Vpn => write!(f, "VPN"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

/// Connection state of a service.
///
/// ConnMan moves a service through
/// `idle -> association -> configuration -> ready -> online`, falling back to
/// `disconnect`/`idle` on a user disconnect and to `failure` on error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceState {
    Idle,
    Association,
    Configuration,
    Ready,
    Online,
    Disconnect,
    Failure,
    Unknown(String),
}

impl ServiceState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Ready | Self::Online)
    }

    pub fn is_connecting(&self) -> bool {
        matches!(self, Self::Association | Self::Configuration)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failure)
    }

    /// Whether a `Disconnect` call makes sense in this state.
    pub fn can_disconnect(&self) -> bool {
        self.is_connected() || self.is_connecting()
    }
}

impl From<&str> for ServiceState {
    fn from(s: &str) -> Self {
        match s {
            "idle" => Self::Idle,
            "association" => Self::Association,
            "configuration" => Self::Configuration,
            "ready" => Self::Ready,
            "online" => Self::Online,
            "disconnect" => Self::Disconnect,
            "failure" => Self::Failure,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl Display for ServiceState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Not connected"),
            Self::Association => write!(f, "Associating"),
            Self::Configuration => write!(f, "Configuring"),
            Self::Ready => write!(f, "Connected"),
            Self::Online => write!(f, "Online"),
            Self::Disconnect => write!(f, "Disconnecting"),
            Self::Failure => write!(f, "Failed"),
            Self::Unknown(s) => write!(f, "Unknown ({s})"),
        }
    }
}

/// Connection state of a VPN connection (`net.connman.vpn.Connection`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VpnState {
    Idle,
    Configuration,
    Ready,
    Disconnect,
    Failure,
    Unknown(String),
}

impl VpnState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Ready)
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Configuration | Self::Disconnect)
    }
}

impl From<&str> for VpnState {
    fn from(s: &str) -> Self {
        match s {
            "idle" => Self::Idle,
            "configuration" => Self::Configuration,
            "ready" => Self::Ready,
            "disconnect" => Self::Disconnect,
            "failure" => Self::Failure,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl Display for VpnState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Not connected"),
            Self::Configuration => write!(f, "Connecting"),
            Self::Ready => write!(f, "Connected"),
            Self::Disconnect => write!(f, "Disconnecting"),
            Self::Failure => write!(f, "Failed"),
            Self::Unknown(s) => write!(f, "Unknown ({s})"),
        }
    }
}

/// Security method advertised by a Wi-Fi service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Security {
    None,
    Wep,
    Psk,
    Ieee8021x,
    Wps,
    Other(String),
}

impl From<&str> for Security {
    fn from(s: &str) -> Self {
        match s {
            "none" => Self::None,
            "wep" => Self::Wep,
            "psk" => Self::Psk,
            "ieee8021x" => Self::Ieee8021x,
            "wps" => Self::Wps,
            other => Self::Other(other.to_string()),
        }
    }
}

impl Display for Security {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Wep => write!(f, "WEP"),
            Self::Psk => write!(f, "WPA/WPA2 Personal"),
            Self::Ieee8021x => write!(f, "WPA/WPA2 Enterprise"),
            Self::Wps => write!(f, "WPS"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

/// Contents of the `IPv4` / `IPv4.Configuration` dictionaries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ipv4Settings {
    /// "dhcp", "manual", "off" or "fixed".
    pub method: Option<String>,
    pub address: Option<String>,
    pub netmask: Option<String>,
    pub gateway: Option<String>,
}

impl Ipv4Settings {
    pub fn from_map(map: &PropertyMap) -> Self {
        Self {
            method: map.str("Method").map(str::to_string),
            address: map.str("Address").map(str::to_string),
            netmask: map.str("Netmask").map(str::to_string),
            gateway: map.str("Gateway").map(str::to_string),
        }
    }

    /// Encodes the settings for `SetProperty("IPv4.Configuration", ..)`.
    ///
    /// Only `manual` carries addresses; ConnMan rejects them otherwise.
    pub fn to_map(&self) -> PropertyMap {
        let method = self.method.as_deref().unwrap_or("dhcp");
        let mut map = PropertyMap::new().with("Method", method);
        if method == "manual" {
            for (key, value) in [
                ("Address", &self.address),
                ("Netmask", &self.netmask),
                ("Gateway", &self.gateway),
            ] {
                if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
                    map.insert(key, v);
                }
            }
        }
        map
    }
}

/// Contents of the `IPv6` / `IPv6.Configuration` dictionaries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ipv6Settings {
    /// "auto", "manual", "off" or "6to4".
    pub method: Option<String>,
    pub address: Option<String>,
    pub prefix_length: Option<u8>,
    pub gateway: Option<String>,
    /// "disabled", "enabled" or "preferred".
    pub privacy: Option<String>,
}

impl Ipv6Settings {
    pub fn from_map(map: &PropertyMap) -> Self {
        Self {
            method: map.str("Method").map(str::to_string),
            address: map.str("Address").map(str::to_string),
            prefix_length: map.u32("PrefixLength").and_then(|n| u8::try_from(n).ok()),
            gateway: map.str("Gateway").map(str::to_string),
            privacy: map.str("Privacy").map(str::to_string),
        }
    }

    pub fn to_map(&self) -> PropertyMap {
        let method = self.method.as_deref().unwrap_or("auto");
        let mut map = PropertyMap::new().with("Method", method);
        match method {
            "manual" => {
                if let Some(a) = self.address.as_deref().filter(|a| !a.is_empty()) {
                    map.insert("Address", a);
                }
                if let Some(p) = self.prefix_length {
                    map.insert("PrefixLength", p);
                }
                if let Some(g) = self.gateway.as_deref().filter(|g| !g.is_empty()) {
                    map.insert("Gateway", g);
                }
            }
            "auto" => {
                if let Some(p) = self.privacy.as_deref() {
                    map.insert("Privacy", p);
                }
            }
            _ => {}
        }
        map
    }
}

/// Contents of the `Proxy` / `Proxy.Configuration` dictionaries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxySettings {
    /// "direct", "auto" or "manual".
    pub method: Option<String>,
    pub url: Option<String>,
    pub servers: Vec<String>,
    pub excludes: Vec<String>,
}

impl ProxySettings {
    pub fn from_map(map: &PropertyMap) -> Self {
        Self {
            method: map.str("Method").map(str::to_string),
            url: map.str("URL").map(str::to_string),
            servers: map.str_list("Servers"),
            excludes: map.str_list("Excludes"),
        }
    }

    pub fn to_map(&self) -> PropertyMap {
        let method = self.method.as_deref().unwrap_or("direct");
        let mut map = PropertyMap::new().with("Method", method);
        match method {
            "auto" => {
                if let Some(url) = self.url.as_deref().filter(|u| !u.is_empty()) {
                    map.insert("URL", url);
                }
            }
            "manual" => {
                map.insert("Servers", self.servers.clone());
                map.insert("Excludes", self.excludes.clone());
            }
            _ => {}
        }
        map
    }
}

/// Contents of the read-only `Ethernet` dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EthernetInfo {
    pub method: Option<String>,
    pub interface: Option<String>,
    pub address: Option<String>,
    pub mtu: Option<u32>,
}

impl EthernetInfo {
    pub fn from_map(map: &PropertyMap) -> Self {
        Self {
            method: map.str("Method").map(str::to_string),
            interface: map.str("Interface").map(str::to_string),
            address: map.str("Address").map(str::to_string),
            mtu: map.u32("MTU"),
        }
    }
}

/// Contents of the `Provider` dictionary of VPN services.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderInfo {
    pub host: Option<String>,
    pub domain: Option<String>,
    pub name: Option<String>,
    pub kind: Option<String>,
}

impl ProviderInfo {
    pub fn from_map(map: &PropertyMap) -> Self {
        Self {
            host: map.str("Host").map(str::to_string),
            domain: map.str("Domain").map(str::to_string),
            name: map.str("Name").map(str::to_string),
            kind: map.str("Type").map(str::to_string),
        }
    }
}

/// A network medium managed by ConnMan (`net.connman.Technology`).
///
/// # Example
///
/// ```no_run
/// use cmrs::ConnMan;
///
/// # async fn example() -> cmrs::Result<()> {
/// let cm = ConnMan::new().await?;
/// for tech in cm.technologies().await? {
///     println!("{} powered={}", tech.name(), tech.powered());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Technology {
    /// D-Bus object path
    pub path: String,
    /// Raw property table
    pub properties: PropertyMap,
}

impl Technology {
    pub fn new(path: impl Into<String>, properties: PropertyMap) -> Self {
        Self {
            path: path.into(),
            properties,
        }
    }

    pub fn name(&self) -> &str {
        self.properties.str(keys::NAME).unwrap_or_default()
    }

    pub fn kind(&self) -> TechnologyType {
        TechnologyType::from(self.properties.str(keys::TYPE).unwrap_or_default())
    }

    pub fn powered(&self) -> bool {
        self.properties.bool(keys::POWERED).unwrap_or(false)
    }

    pub fn connected(&self) -> bool {
        self.properties.bool(keys::CONNECTED).unwrap_or(false)
    }

    pub fn tethering(&self) -> bool {
        self.properties.bool(keys::TETHERING).unwrap_or(false)
    }

    pub fn tethering_identifier(&self) -> Option<&str> {
        self.properties.str(keys::TETHERING_IDENTIFIER)
    }

    pub fn tethering_passphrase(&self) -> Option<&str> {
        self.properties.str(keys::TETHERING_PASSPHRASE)
    }

    pub fn tethering_freq(&self) -> Option<u32> {
        self.properties.u32(keys::TETHERING_FREQ)
    }

    /// Short human-readable status line for the technology page.
    pub fn status_text(&self) -> &'static str {
        if !self.powered() {
            "Disabled"
        } else if self.tethering() {
            "Sharing connection"
        } else if self.connected() {
            "Connected"
        } else {
            "Not connected"
        }
    }
}

/// A daemon-managed connection instance (`net.connman.Service`).
#[derive(Debug, Clone, PartialEq)]
pub struct Service {
    /// D-Bus object path
    pub path: String,
    /// Raw property table
    pub properties: PropertyMap,
}

impl Service {
    pub fn new(path: impl Into<String>, properties: PropertyMap) -> Self {
        Self {
            path: path.into(),
            properties,
        }
    }

    /// Display name; hidden Wi-Fi networks have none.
    pub fn name(&self) -> &str {
        match self.properties.str(keys::NAME) {
            Some(name) if !name.is_empty() => name,
            _ => "Hidden network",
        }
    }

    pub fn kind(&self) -> TechnologyType {
        TechnologyType::from(self.properties.str(keys::TYPE).unwrap_or_default())
    }

    pub fn state(&self) -> ServiceState {
        ServiceState::from(self.properties.str(keys::STATE).unwrap_or("idle"))
    }

    /// Last error, if any. ConnMan reports an empty string once it clears.
    pub fn error(&self) -> Option<&str> {
        self.properties.str(keys::ERROR).filter(|e| !e.is_empty())
    }

    pub fn strength(&self) -> Option<u8> {
        self.properties.byte(keys::STRENGTH)
    }

    pub fn security(&self) -> Vec<Security> {
        self.properties
            .str_list(keys::SECURITY)
            .iter()
            .map(|s| Security::from(s.as_str()))
            .collect()
    }

    pub fn is_secured(&self) -> bool {
        self.security()
            .iter()
            .any(|s| !matches!(s, Security::None | Security::Wps))
    }

    pub fn favorite(&self) -> bool {
        self.properties.bool(keys::FAVORITE).unwrap_or(false)
    }

    pub fn immutable(&self) -> bool {
        self.properties.bool(keys::IMMUTABLE).unwrap_or(false)
    }

    pub fn autoconnect(&self) -> bool {
        self.properties.bool(keys::AUTO_CONNECT).unwrap_or(false)
    }

    pub fn roaming(&self) -> bool {
        self.properties.bool(keys::ROAMING).unwrap_or(false)
    }

    pub fn nameservers(&self) -> Vec<String> {
        self.properties.str_list(keys::NAMESERVERS)
    }

    pub fn nameservers_config(&self) -> Vec<String> {
        self.properties.str_list(keys::NAMESERVERS_CONFIG)
    }

    pub fn timeservers(&self) -> Vec<String> {
        self.properties.str_list(keys::TIMESERVERS)
    }

    pub fn timeservers_config(&self) -> Vec<String> {
        self.properties.str_list(keys::TIMESERVERS_CONFIG)
    }

    pub fn domains(&self) -> Vec<String> {
        self.properties.str_list(keys::DOMAINS)
    }

    pub fn domains_config(&self) -> Vec<String> {
        self.properties.str_list(keys::DOMAINS_CONFIG)
    }

    pub fn ipv4(&self) -> Ipv4Settings {
        self.group(keys::IPV4, Ipv4Settings::from_map)
    }

    pub fn ipv4_config(&self) -> Ipv4Settings {
        self.group(keys::IPV4_CONFIG, Ipv4Settings::from_map)
    }

    pub fn ipv6(&self) -> Ipv6Settings {
        self.group(keys::IPV6, Ipv6Settings::from_map)
    }

    pub fn ipv6_config(&self) -> Ipv6Settings {
        self.group(keys::IPV6_CONFIG, Ipv6Settings::from_map)
    }

    pub fn proxy(&self) -> ProxySettings {
        self.group(keys::PROXY, ProxySettings::from_map)
    }

    pub fn proxy_config(&self) -> ProxySettings {
        self.group(keys::PROXY_CONFIG, ProxySettings::from_map)
    }

    pub fn ethernet(&self) -> EthernetInfo {
        self.group(keys::ETHERNET, EthernetInfo::from_map)
    }

    pub fn provider(&self) -> ProviderInfo {
        self.group(keys::PROVIDER, ProviderInfo::from_map)
    }

    /// Signal quality bucket, 0 (weak) to 3 (excellent).
    pub fn signal_level(&self) -> Option<u8> {
        let s = self.strength()?;
        Some(match s {
            0..=signal_strength::WEAK_MAX => 0,
            _ if s <= signal_strength::OK_MAX => 1,
            _ if s <= signal_strength::GOOD_MAX => 2,
            _ => 3,
        })
    }

    fn group<T: Default>(&self, key: &str, decode: fn(&PropertyMap) -> T) -> T {
        self.properties.dict(key).map(decode).unwrap_or_default()
    }
}

/// A connection managed by the VPN daemon (`net.connman.vpn.Connection`).
#[derive(Debug, Clone, PartialEq)]
pub struct VpnConnection {
    /// D-Bus object path
    pub path: String,
    /// Raw property table
    pub properties: PropertyMap,
}

impl VpnConnection {
    pub fn new(path: impl Into<String>, properties: PropertyMap) -> Self {
        Self {
            path: path.into(),
            properties,
        }
    }

    pub fn name(&self) -> &str {
        self.properties.str(keys::NAME).unwrap_or_default()
    }

    /// Provider type, e.g. "openconnect", "openvpn", "wireguard".
    pub fn provider_type(&self) -> &str {
        self.properties.str(keys::TYPE).unwrap_or_default()
    }

    pub fn state(&self) -> VpnState {
        VpnState::from(self.properties.str(keys::STATE).unwrap_or("idle"))
    }

    pub fn host(&self) -> Option<&str> {
        self.properties.str(keys::HOST)
    }

    pub fn domain(&self) -> Option<&str> {
        self.properties.str(keys::DOMAIN)
    }

    pub fn immutable(&self) -> bool {
        self.properties.bool(keys::IMMUTABLE).unwrap_or(false)
    }

    pub fn index(&self) -> Option<i32> {
        match self.properties.get(keys::INDEX)? {
            crate::api::properties::PropValue::Int32(n) => Some(*n),
            _ => None,
        }
    }

    pub fn ipv4(&self) -> Ipv4Settings {
        self.properties
            .dict(keys::IPV4)
            .map(Ipv4Settings::from_map)
            .unwrap_or_default()
    }

    pub fn nameservers(&self) -> Vec<String> {
        self.properties.str_list(keys::NAMESERVERS)
    }
}

/// Settings for a new VPN connection passed to `net.connman.vpn.Manager.Create`.
#[derive(Debug, Clone, PartialEq)]
pub struct VpnConfig {
    /// Provider type, e.g. "openconnect".
    pub provider_type: String,
    pub name: String,
    pub host: String,
    /// Domain of the VPN network; required by the daemon.
    pub domain: String,
    /// Extra provider-specific keys (e.g. "OpenConnect.Protocol").
    pub extra: Vec<(String, String)>,
}

impl VpnConfig {
    pub fn new(provider_type: &str, name: &str, host: &str, domain: &str) -> Self {
        Self {
            provider_type: provider_type.to_string(),
            name: name.to_string(),
            host: host.to_string(),
            domain: domain.to_string(),
            extra: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_option(mut self, key: &str, value: &str) -> Self {
        self.extra.push((key.to_string(), value.to_string()));
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ConnectionError> {
        for (field, value) in [
            ("type", &self.provider_type),
            ("name", &self.name),
            ("host", &self.host),
            ("domain", &self.domain),
        ] {
            if value.trim().is_empty() {
                return Err(ConnectionError::InvalidInput(format!(
                    "VPN {field} must not be empty"
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn to_map(&self) -> PropertyMap {
        let mut map = PropertyMap::new()
            .with(keys::TYPE, self.provider_type.as_str())
            .with(keys::NAME, self.name.as_str())
            .with(keys::HOST, self.host.as_str())
            .with(keys::VPN_DOMAIN, self.domain.as_str());
        for (k, v) in &self.extra {
            map.insert(k, v.as_str());
        }
        map
    }
}

/// Errors that can occur while talking to ConnMan.
///
/// Use [`ConnectionError::is_expected`] to filter out cancellation-style
/// errors before showing them to a user.
///
/// # Example
///
/// ```no_run
/// use cmrs::{ConnMan, ConnectionError};
///
/// # async fn example() -> cmrs::Result<()> {
/// let cm = ConnMan::new().await?;
/// match cm.connect_service("/net/connman/service/wifi_x").await {
///     Ok(()) => println!("connected"),
///     Err(e) if e.is_expected() => {}
///     Err(e) => eprintln!("connect failed: {e}"),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// A D-Bus communication error occurred.
    #[error("D-Bus error: {0}")]
    Dbus(zbus::Error),

    /// A D-Bus operation failed, with context about what was attempted.
    #[error("{context}: {source}")]
    DbusOperation {
        context: String,
        #[source]
        source: zbus::Error,
    },

    /// The daemon answered a method call with an error.
    #[error("{message}")]
    Daemon { name: String, message: String },

    /// The ConnMan (or ConnMan VPN) daemon is not on the bus.
    #[error("{0} is not running")]
    DaemonUnavailable(String),

    /// The referenced object is not known.
    #[error("not found: {0}")]
    NotFound(String),

    /// Input rejected before reaching the daemon.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An agent could not be exported or registered.
    #[error("agent error: {0}")]
    Agent(String),

    /// The VPN credential helper failed.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The user dismissed a prompt the operation depended on.
    #[error("canceled by user")]
    Canceled,

    /// A monitoring stream ended unexpectedly.
    #[error("stream ended: {0}")]
    Stuck(String),
}

impl ConnectionError {
    /// Builds an error from a failed call, keeping daemon error names intact.
    pub(crate) fn from_call(context: impl Into<String>, err: zbus::Error) -> Self {
        match err {
            zbus::Error::MethodError(name, message, _) => Self::Daemon {
                message: message.unwrap_or_else(|| name.as_str().to_string()),
                name: name.as_str().to_string(),
            },
            source => Self::DbusOperation {
                context: context.into(),
                source,
            },
        }
    }

    /// The D-Bus error name, for daemon errors.
    pub fn error_name(&self) -> Option<&str> {
        match self {
            Self::Daemon { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Whether this is a cancellation-style error that should not be shown.
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::Canceled) || self.error_name().is_some_and(is_expected_error_name)
    }
}

impl From<zbus::Error> for ConnectionError {
    fn from(err: zbus::Error) -> Self {
        match err {
            zbus::Error::MethodError(name, message, _) => Self::Daemon {
                message: message.unwrap_or_else(|| name.as_str().to_string()),
                name: name.as_str().to_string(),
            },
            other => Self::Dbus(other),
        }
    }
}

impl From<zvariant::Error> for ConnectionError {
    fn from(err: zvariant::Error) -> Self {
        Self::Dbus(zbus::Error::Variant(err))
    }
}

/// Whether a D-Bus error name belongs to the suppressed set.
pub fn is_expected_error_name(name: &str) -> bool {
    EXPECTED_ERRORS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wifi_service() -> Service {
        Service::new(
            "/net/connman/service/wifi_abc_managed_psk",
            PropertyMap::new()
                .with("Name", "Home")
                .with("Type", "wifi")
                .with("State", "online")
                .with("Strength", 80u8)
                .with("Security", vec!["psk".to_string()])
                .with("AutoConnect", true)
                .with(
                    "IPv4",
                    PropertyMap::new()
                        .with("Method", "dhcp")
                        .with("Address", "192.168.1.20")
                        .with("Netmask", "255.255.255.0")
                        .with("Gateway", "192.168.1.1"),
                )
                .with(
                    "Ethernet",
                    PropertyMap::new()
                        .with("Interface", "wlan0")
                        .with("Address", "aa:bb:cc:dd:ee:ff")
                        .with("MTU", 1500u16),
                ),
        )
    }

    #[test]
    fn service_state_from_str() {
        assert_eq!(ServiceState::from("idle"), ServiceState::Idle);
        assert_eq!(ServiceState::from("association"), ServiceState::Association);
        assert_eq!(ServiceState::from("configuration"), ServiceState::Configuration);
        assert_eq!(ServiceState::from("ready"), ServiceState::Ready);
        assert_eq!(ServiceState::from("online"), ServiceState::Online);
        assert_eq!(ServiceState::from("disconnect"), ServiceState::Disconnect);
        assert_eq!(ServiceState::from("failure"), ServiceState::Failure);
        assert_eq!(
            ServiceState::from("bogus"),
            ServiceState::Unknown("bogus".into())
        );
    }

    #[test]
    fn service_state_predicates() {
        assert!(ServiceState::Online.is_connected());
        assert!(ServiceState::Ready.is_connected());
        assert!(!ServiceState::Idle.is_connected());
        assert!(ServiceState::Association.is_connecting());
        assert!(ServiceState::Configuration.can_disconnect());
        assert!(!ServiceState::Failure.can_disconnect());
        assert!(ServiceState::Failure.is_failed());
    }

    #[test]
    fn technology_type_capabilities() {
        assert!(TechnologyType::Wifi.supports_tethering());
        assert!(TechnologyType::Bluetooth.supports_tethering());
        assert!(!TechnologyType::Cellular.supports_tethering());
        assert!(TechnologyType::Wifi.supports_scanning());
        assert!(!TechnologyType::Ethernet.supports_scanning());
        assert_eq!(
            TechnologyType::from("lora"),
            TechnologyType::Other("lora".into())
        );
        assert_eq!(TechnologyType::from("wifi").as_str(), "wifi");
    }

    #[test]
    fn service_accessors_read_nested_groups() {
        let svc = wifi_service();
        assert_eq!(svc.name(), "Home");
        assert_eq!(svc.kind(), TechnologyType::Wifi);
        assert_eq!(svc.state(), ServiceState::Online);
        assert_eq!(svc.security(), vec![Security::Psk]);
        assert!(svc.is_secured());
        assert!(svc.autoconnect());
        assert_eq!(svc.ipv4().address.as_deref(), Some("192.168.1.20"));
        assert_eq!(svc.ipv4().gateway.as_deref(), Some("192.168.1.1"));
        assert_eq!(svc.ethernet().interface.as_deref(), Some("wlan0"));
        assert_eq!(svc.ethernet().mtu, Some(1500));
        assert_eq!(svc.ipv6(), Ipv6Settings::default());
        assert_eq!(svc.signal_level(), Some(3));
    }

    #[test]
    fn hidden_service_has_placeholder_name() {
        let svc = Service::new("/s", PropertyMap::new().with("Name", ""));
        assert_eq!(svc.name(), "Hidden network");
        assert_eq!(svc.state(), ServiceState::Idle);
        assert_eq!(svc.error(), None);
    }

    #[test]
    fn ipv4_manual_keeps_addresses_dhcp_drops_them() {
        let manual = Ipv4Settings {
            method: Some("manual".into()),
            address: Some("10.0.0.2".into()),
            netmask: Some("255.0.0.0".into()),
            gateway: Some(String::new()),
        };
        let map = manual.to_map();
        assert_eq!(map.str("Address"), Some("10.0.0.2"));
        assert_eq!(map.str("Gateway"), None);

        let dhcp = Ipv4Settings {
            method: Some("dhcp".into()),
            ..manual
        };
        let map = dhcp.to_map();
        assert_eq!(map.str("Method"), Some("dhcp"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn ipv6_auto_carries_privacy() {
        let s = Ipv6Settings {
            method: Some("auto".into()),
            privacy: Some("preferred".into()),
            ..Default::default()
        };
        let map = s.to_map();
        assert_eq!(map.str("Privacy"), Some("preferred"));
        assert!(!map.contains("PrefixLength"));
    }

    #[test]
    fn proxy_manual_lists_servers() {
        let p = ProxySettings {
            method: Some("manual".into()),
            servers: vec!["proxy:3128".into()],
            ..Default::default()
        };
        let map = p.to_map();
        assert_eq!(map.str_list("Servers"), vec!["proxy:3128"]);
        assert!(map.str_list("Excludes").is_empty());
    }

    #[test]
    fn technology_status_text() {
        let off = Technology::new("/t", PropertyMap::new().with("Powered", false));
        assert_eq!(off.status_text(), "Disabled");
        let tether = Technology::new(
            "/t",
            PropertyMap::new()
                .with("Powered", true)
                .with("Tethering", true),
        );
        assert_eq!(tether.status_text(), "Sharing connection");
    }

    #[test]
    fn vpn_config_requires_all_fields() {
        let ok = VpnConfig::new("openconnect", "Work", "vpn.example.com", "example.com");
        assert!(ok.validate().is_ok());
        let map = ok.to_map();
        assert_eq!(map.str("VPN.Domain"), Some("example.com"));

        let bad = VpnConfig::new("openconnect", "Work", " ", "example.com");
        assert!(matches!(
            bad.validate(),
            Err(ConnectionError::InvalidInput(_))
        ));
    }

    #[test]
    fn expected_errors_are_suppressed() {
        let aborted = ConnectionError::Daemon {
            name: "net.connman.Error.OperationAborted".into(),
            message: "Operation aborted".into(),
        };
        assert!(aborted.is_expected());

        let invalid = ConnectionError::Daemon {
            name: "net.connman.Error.InvalidArguments".into(),
            message: "Invalid arguments".into(),
        };
        assert!(!invalid.is_expected());
        assert!(!ConnectionError::NotFound("x".into()).is_expected());
        assert!(ConnectionError::Canceled.is_expected());
        assert!(is_expected_error_name("net.connman.Agent.Error.Canceled"));
    }

    #[test]
    fn daemon_error_displays_message() {
        let e = ConnectionError::Daemon {
            name: "net.connman.Error.Failed".into(),
            message: "Input/output error".into(),
        };
        assert_eq!(e.to_string(), "Input/output error");
        assert_eq!(e.error_name(), Some("net.connman.Error.Failed"));
    }
}
