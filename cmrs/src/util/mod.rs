//! Internal helpers shared by the core modules.

pub(crate) mod utils;
