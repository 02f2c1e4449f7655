//! Data module for netverify
//!
//! Contains rated specifications for the supported device kinds.

pub mod specs;
