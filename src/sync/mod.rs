// src/sync/mod.rs
//! Deciding when and how GPS time reaches the system clock

pub mod controller;
pub mod reconciler;

pub use controller::{AcquisitionConfig, AcquisitionController, AcquisitionPhase};
pub use reconciler::{reconcile, ReconciliationDecision};
