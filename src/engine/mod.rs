//! Orchestration engine.
//!
//! Runs checks against devices, classifies failures into defects, and
//! aggregates everything into a finalized run report.

pub mod classifier;
pub mod orchestrator;
pub mod result;
