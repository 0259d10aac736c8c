//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the rules of the sensor node: event routing,
//! alerting, persistence policy and acquisition sequencing.  All
//! interaction with hardware happens through **port traits** defined in
//! [`ports`], keeping this layer fully testable without real peripherals.

pub mod ports;
pub mod service;
