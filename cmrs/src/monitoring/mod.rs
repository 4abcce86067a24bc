//! Real-time monitoring of both ConnMan daemons.
//!
//! This module turns bus signals into [`NetworkEvent`](crate::NetworkEvent)
//! values and tracks whether the daemons are present on the bus.

pub(crate) mod events;
pub(crate) mod presence;
