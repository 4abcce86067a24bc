//! Core internal logic for talking to the daemons.
//!
//! This module contains the internal implementation of every method call
//! the public API makes, plus the in-memory state model.

pub(crate) mod manager;
pub(crate) mod service;
pub mod state;
pub(crate) mod technology;
pub(crate) mod vpn;
