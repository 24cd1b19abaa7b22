//! Outbound adapters implementing the infrastructure ports.

pub mod memory;
pub mod redis;
