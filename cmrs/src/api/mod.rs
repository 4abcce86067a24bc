//! Public API module.
//!
//! This module contains the high-level user-facing API for the `cmrs` crate.

pub mod connman;
pub mod events;
pub mod models;
pub mod properties;
