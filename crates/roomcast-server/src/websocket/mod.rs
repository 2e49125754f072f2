//! Room membership, broadcast fan-out, and per-connection session handling.

pub mod participant;
pub mod registry;
pub mod session;
