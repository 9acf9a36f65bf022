//! statusbot - WhatsApp status automation bot.
//!
//! A thin bot on top of an external WhatsApp protocol client: keeps a
//! persistent session alive, auto-views and auto-reacts to contact
//! statuses, and rotates the profile bio from templates on a timer.
//!
//! The protocol library itself (socket, handshake, encryption) sits behind
//! the [`wa::WaConnector`]/[`wa::WaClient`] traits; the rest of the crate is
//! the session bootstrap, the connection lifecycle, and the two watchers.

pub mod config;
pub mod deploy;
pub mod server;
pub mod wa;
