//! Offline detection backend.
//!
//! [`Simulator`] answers detection requests locally with plausible results
//! drawn from a small catalog of cafeteria foods. It implements
//! [`client::DetectionBackend`], so it can stand in for a live
//! [`client::ConnectionManager`] when no detection service is reachable.

pub mod catalog;
pub mod simulator;

pub use catalog::{CATALOG, CatalogEntry, lookup};
pub use simulator::{Simulator, SimulatorConfig};
