//! The `cozify-client` library crate keeps a program authenticated against
//! the Cozify cloud and routes its calls to Cozify hubs.
//!
//! Core functionalities of this crate include:
//!
//! - Logging in to the cloud with an emailed one-time passcode, then
//!   keeping the cloud token alive by refreshing it before it expires
//! - Obtaining the token of every hub of the account and telling which
//!   hubs answer on the local network
//! - Routing each hub call either directly to the hub or through the cloud
//!   relay, and switching between the two when a hub stops answering
//! - Persisting every credential in a private state file, so that
//!   interaction is only needed on the first run
//!
//! Every network call is blocking and made by a single thread. A program
//! sharing the same state file between several processes must coordinate
//! them itself.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(test, allow(unused_results))]

/// A facade over a session exposing hub calls.
pub mod client;
/// One-to-one calls to the Cozify cloud.
pub mod cloud_api;
/// Client configuration.
pub mod config;
/// Error management.
pub mod error;
/// One-to-one calls to a Cozify hub.
pub mod hub_api;
/// Human interaction needed by the one-time passcode login.
pub mod prompt;
/// Successful responses and their decoding.
pub mod response;
/// Address and header construction of cloud and hub calls.
pub mod router;
/// The authentication state machine and its credential repair policies.
pub mod session;
/// The persistent credential store.
pub mod store;
/// Request sending and outcome classification.
pub mod transport;
