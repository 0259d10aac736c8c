//! MeshNode firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod events;
pub mod fsm;
pub mod session;
pub mod signals;

pub mod error;
pub mod pins;

// Platform-facing modules; the real implementations are cfg-gated inside,
// with simulation backends on every other target.
pub mod adapters;
pub mod drivers;
pub mod sensors;
