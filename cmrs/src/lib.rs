//! A Rust library for driving ConnMan over D-Bus.
//!
//! This crate provides a high-level async API over `connmand` and
//! `connman-vpnd`:
//!
//! - Listing technologies, services and VPN connections
//! - Powering technologies, scanning and tethering
//! - Connecting, disconnecting and configuring services
//! - Answering the daemons' credential prompts through agents
//! - Following every daemon notification to keep a local model current
//!
//! # Example
//!
//! ```no_run
//! use cmrs::ConnMan;
//!
//! # async fn example() -> cmrs::Result<()> {
//! let cm = ConnMan::new().await?;
//!
//! // Services come back in the daemon's preference order
//! for svc in cm.services().await? {
//!     println!("{} [{}] {}", svc.name(), svc.kind(), svc.state());
//! }
//!
//! // Connect to the first Wi-Fi network
//! if let Some(svc) = cm
//!     .services()
//!     .await?
//!     .into_iter()
//!     .find(|s| s.kind() == cmrs::TechnologyType::Wifi)
//! {
//!     cm.connect_service(&svc.path).await?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Keeping State Current
//!
//! ConnMan announces every change with signals. [`ConnMan::monitor`]
//! delivers them as [`NetworkEvent`]s and [`NetworkState::apply`] folds them
//! into a model, returning the [`StateChange`]s a view must redraw:
//!
//! ```ignore
//! let mut state = cm.load_state().await?;
//! cm.monitor(shutdown, move |event| {
//!     for change in state.apply(event) {
//!         redraw(change);
//!     }
//! })
//! .await?;
//! ```
//!
//! # Error Handling
//!
//! All operations return `Result<T, ConnectionError>`. Errors raised by the
//! daemon keep their D-Bus name; [`ConnectionError::is_expected`] tells
//! cancellation-style errors that need no user attention apart from real
//! failures.
//!
//! # Logging
//!
//! This crate uses the [`log`](https://docs.rs/log) facade for logging. To see
//! log output, add a logging implementation like `env_logger`. For example:
//!
//! ```no_run,ignore
//! env_logger::init();
//! // ...
//! ```

// Internal implementation modules
mod core;
mod dbus;
mod monitoring;
mod types;
mod util;

// Public API modules
pub mod agent;
pub mod api;
pub mod auth;

pub use api::connman::ConnMan;
pub use api::events::{NetworkEvent, ObjectKind, StateChange};
pub use api::models::{
    ConnectionError, EthernetInfo, GlobalState, Ipv4Settings, Ipv6Settings, ProviderInfo,
    ProxySettings, Security, Service, ServiceState, Technology, TechnologyType, VpnConfig,
    VpnConnection, VpnState, is_expected_error_name,
};
pub use api::properties::{PropValue, PropertyMap};
pub use agent::{AgentRequest, ErrorAction, RequestSource, Responder};
pub use crate::core::state::NetworkState;
pub use util::utils::{split_list, validate_tethering};

/// Constants the front-end needs for display and validation.
pub mod constants {
    pub use crate::types::constants::{keys, openconnect, signal_strength, tethering, timeouts};
}

/// A specialized `Result` type for ConnMan operations.
pub type Result<T> = std::result::Result<T, ConnectionError>;
