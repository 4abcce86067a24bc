//! Type definitions and constants.
//!
//! This module contains ConnMan constants and type definitions.

pub mod constants;
