//! Constants for ConnMan D-Bus names, paths and values.
//!
//! These correspond to the service names, object paths and property keys
//! used by ConnMan's D-Bus API (`doc/*-api.txt` in the ConnMan tree).

/// Well-known bus names.
pub mod bus {
    pub const CONNMAN: &str = "net.connman";
    pub const CONNMAN_VPN: &str = "net.connman.vpn";
}

/// D-Bus interface names.
pub mod interface {
    pub const MANAGER: &str = "net.connman.Manager";
    pub const TECHNOLOGY: &str = "net.connman.Technology";
    pub const SERVICE: &str = "net.connman.Service";
    pub const VPN_MANAGER: &str = "net.connman.vpn.Manager";
    pub const VPN_CONNECTION: &str = "net.connman.vpn.Connection";
}

/// Object paths where our agents are exported.
pub mod agent_path {
    pub const SERVICE: &str = "/net/connman/cmrs/agent";
    pub const VPN: &str = "/net/connman/cmrs/vpn_agent";
}

/// Property keys shared by several objects.
pub mod keys {
    pub const NAME: &str = "Name";
    pub const TYPE: &str = "Type";
    pub const STATE: &str = "State";
    pub const POWERED: &str = "Powered";
    pub const CONNECTED: &str = "Connected";
    pub const OFFLINE_MODE: &str = "OfflineMode";
    pub const TETHERING: &str = "Tethering";
    pub const TETHERING_IDENTIFIER: &str = "TetheringIdentifier";
    pub const TETHERING_PASSPHRASE: &str = "TetheringPassphrase";
    pub const TETHERING_FREQ: &str = "TetheringFreq";
    pub const ERROR: &str = "Error";
    pub const STRENGTH: &str = "Strength";
    pub const SECURITY: &str = "Security";
    pub const FAVORITE: &str = "Favorite";
    pub const IMMUTABLE: &str = "Immutable";
    pub const AUTO_CONNECT: &str = "AutoConnect";
    pub const ROAMING: &str = "Roaming";
    pub const MDNS: &str = "mDNS";
    pub const NAMESERVERS: &str = "Nameservers";
    pub const NAMESERVERS_CONFIG: &str = "Nameservers.Configuration";
    pub const TIMESERVERS: &str = "Timeservers";
    pub const TIMESERVERS_CONFIG: &str = "Timeservers.Configuration";
    pub const DOMAINS: &str = "Domains";
    pub const DOMAINS_CONFIG: &str = "Domains.Configuration";
    pub const IPV4: &str = "IPv4";
    pub const IPV4_CONFIG: &str = "IPv4.Configuration";
    pub const IPV6: &str = "IPv6";
    pub const IPV6_CONFIG: &str = "IPv6.Configuration";
    pub const PROXY: &str = "Proxy";
    pub const PROXY_CONFIG: &str = "Proxy.Configuration";
    pub const ETHERNET: &str = "Ethernet";
    pub const PROVIDER: &str = "Provider";
    pub const HOST: &str = "Host";
    pub const DOMAIN: &str = "Domain";
    pub const VPN_DOMAIN: &str = "VPN.Domain";
    pub const INDEX: &str = "Index";
}

/// Agent input field names the VPN helper answers.
pub mod openconnect {
    pub const COOKIE: &str = "OpenConnect.Cookie";
    pub const SERVER_CERT: &str = "OpenConnect.ServerCert";
    pub const VPN_HOST: &str = "OpenConnect.VPNHost";
    pub const USERGROUP: &str = "OpenConnect.Usergroup";
}

/// Daemon error names that indicate a cancelled or redundant request.
///
/// Errors with these names are never surfaced to the user.
pub const EXPECTED_ERRORS: &[&str] = &[
    "net.connman.Error.AlreadyConnected",
    "net.connman.Error.NotConnected",
    "net.connman.Error.InProgress",
    "net.connman.Error.OperationAborted",
    "net.connman.Error.OperationCanceled",
    "net.connman.Error.AlreadyEnabled",
    "net.connman.Error.AlreadyDisabled",
    "net.connman.Agent.Error.Canceled",
    "net.connman.vpn.Agent.Error.Canceled",
];

/// Tethering credential limits enforced by the daemon.
pub mod tethering {
    pub const IDENTIFIER_MAX_BYTES: usize = 32;
    pub const PASSPHRASE_MIN: usize = 8;
    pub const PASSPHRASE_MAX: usize = 63;
}

/// Signal strength thresholds for icon display.
pub mod signal_strength {
    pub const WEAK_MAX: u8 = 24;
    pub const OK_MAX: u8 = 49;
    pub const GOOD_MAX: u8 = 74;
}

/// Timeouts used by monitoring and the credential bridge.
pub mod timeouts {
    use std::time::Duration;

    /// Delay before a monitoring loop is restarted after its stream ends.
    const MONITOR_RESTART_SECS: u64 = 5;

    /// Upper bound for a single `openconnect --authenticate` run.
    const AUTH_HELPER_SECS: u64 = 120;

    /// Settle time between powering a radio and scanning on it.
    const SCAN_AFTER_POWER_MS: u64 = 1000;

    /// Returns the monitor restart delay.
    pub fn monitor_restart() -> Duration {
        Duration::from_secs(MONITOR_RESTART_SECS)
    }

    /// Returns the delay before the first scan on a freshly powered radio.
    pub fn scan_after_power() -> Duration {
        Duration::from_millis(SCAN_AFTER_POWER_MS)
    }

    /// Returns the authentication helper timeout.
    pub fn auth_helper() -> Duration {
        Duration::from_secs(AUTH_HELPER_SECS)
    }
}
