//! Mock device providers for testing without the in-memory model.
//!
//! Provides a snapshot-backed provider plus builders for the standard
//! degraded and nominal lab scenarios.

pub mod devices;

pub use devices::*;
