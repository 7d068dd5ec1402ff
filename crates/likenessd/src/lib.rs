//! likenessd — Stateful two-photo face comparison daemon.
//!
//! Receives classified chat events from a gateway bridge, walks each user
//! through a two-photo comparison session, and reports a similarity
//! percentage with a confidence tier. Sessions and photos are ephemeral:
//! nothing biometric outlives a session.

pub mod config;
pub mod controller;
pub mod engine_client;
pub mod intake;
pub mod reply;
pub mod session;
pub mod transport;
