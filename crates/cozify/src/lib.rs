//! The data exchanged between a Cozify client, the Cozify cloud and a
//! Cozify hub.
//!
//! This crate provides APIs to:
//!
//! - Describe the fixed endpoints of the cloud identity and relay service
//!   and of the hub `REST` interface.
//! - Decode the descriptor a hub returns about itself.
//! - Decode the device map a hub returns and filter it by [`Capability`].
//! - Encode the commands a hub accepts on its device command route.
//!
//! No network code lives here. Every structure is serializable and
//! deserializable so that the same definitions can be shared by the client
//! and by test servers standing in for a hub.
//!
//! This crate can be compiled for both `std` and `no_std` environments.
//!
//! [`Capability`]: crate::device::Capability

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![no_std]

extern crate alloc;

/// Fixed endpoints and headers of the cloud and hub APIs.
pub mod api;
/// Device commands accepted by a hub.
pub mod command;
/// Device data and capability filtering.
pub mod device;
/// Hub descriptor.
pub mod hub;

#[cfg(test)]
pub(crate) fn serialize<T: serde::Serialize>(value: T) -> serde_json::Value {
    serde_json::to_value(value).unwrap()
}

#[cfg(test)]
pub(crate) fn deserialize<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> T {
    serde_json::from_value(value).unwrap()
}
