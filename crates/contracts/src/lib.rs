//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the trajectory
//! streaming pipeline. Business crates depend on this crate only, never on
//! each other's internals.
//!
//! ## Frame model
//! - `absolute_frame` counts every frame physically read, across all files
//! - `valid_frame` counts only frames accepted by the selection policy
//! - Simulation time is in picoseconds (f64), coordinates in nm (f32)

mod consumer;
mod error;
mod frame;
mod reader;
mod run_config;
mod selection;
mod system;

pub use consumer::Consumer;
pub use error::*;
pub use frame::*;
pub use reader::{SystemLoader, TrajectoryOpener, TrajectoryReader};
pub use run_config::*;
pub use selection::{SelectionRange, TimeOverride};
pub use system::{Atom, MolecularSystem};
