//! Technology operations: power, scanning and tethering.

use futures_timer::Delay;
use log::{debug, warn};
use zbus::Connection;
use zvariant::Value;

use crate::api::models::ConnectionError;
use crate::api::properties::PropertyMap;
use crate::types::constants::{keys, timeouts};
use crate::util::utils::{technology_proxy, validate_tethering};
use crate::Result;

pub(crate) async fn technology_properties(conn: &Connection, path: &str) -> Result<PropertyMap> {
    let tech = technology_proxy(conn, path).await?;
    let props = tech
        .get_properties()
        .await
        .map_err(|e| ConnectionError::from_call(format!("failed to read {path}"), e))?;
    Ok(PropertyMap::from_dbus(&props))
}

pub(crate) async fn set_powered(conn: &Connection, path: &str, powered: bool) -> Result<()> {
    debug!("Setting {path} Powered={powered}");
    let tech = technology_proxy(conn, path).await?;
    tech.set_property(keys::POWERED, &Value::from(powered))
        .await
        .map_err(|e| ConnectionError::from_call(format!("failed to power {path}"), e))
}

/// Scans and waits for the daemon to finish.
pub(crate) async fn scan(conn: &Connection, path: &str) -> Result<()> {
    debug!("Scanning on {path}");
    let tech = technology_proxy(conn, path).await?;
    tech.scan()
        .await
        .map_err(|e| ConnectionError::from_call(format!("scan on {path} failed"), e))
}

/// Powers a technology on and scans once the radio has settled.
///
/// A failed scan is only logged; the technology stays powered.
pub(crate) async fn power_on_and_scan(conn: &Connection, path: &str) -> Result<()> {
    set_powered(conn, path, true).await?;
    Delay::new(timeouts::scan_after_power()).await;
    if let Err(e) = scan(conn, path).await {
        warn!("Initial scan on {path} failed: {e}");
    }
    Ok(())
}

pub(crate) async fn set_tethering(conn: &Connection, path: &str, enabled: bool) -> Result<()> {
    debug!("Setting {path} Tethering={enabled}");
    let tech = technology_proxy(conn, path).await?;
    tech.set_property(keys::TETHERING, &Value::from(enabled))
        .await
        .map_err(|e| ConnectionError::from_call(format!("failed to toggle tethering on {path}"), e))
}

/// Stores the access point name and passphrase used for Wi-Fi tethering.
///
/// The daemon only applies new credentials the next time tethering is
/// enabled, so a running access point keeps its old settings.
pub(crate) async fn configure_tethering(
    conn: &Connection,
    path: &str,
    identifier: &str,
    passphrase: &str,
) -> Result<()> {
    validate_tethering(identifier, passphrase)?;
    let tech = technology_proxy(conn, path).await?;
    tech.set_property(keys::TETHERING_IDENTIFIER, &Value::from(identifier))
        .await
        .map_err(|e| ConnectionError::from_call("failed to set tethering name", e))?;
    tech.set_property(keys::TETHERING_PASSPHRASE, &Value::from(passphrase))
        .await
        .map_err(|e| ConnectionError::from_call("failed to set tethering passphrase", e))
}
