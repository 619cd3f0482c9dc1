//! MolecularSystem - per-consumer molecular state
//!
//! Consumer #0's system is loaded from the structure/topology files; every
//! other consumer receives a deep copy (`Clone`) before streaming starts,
//! so worker threads never share mutable system state.

use nalgebra::Vector3;

use crate::{Frame, PeriodicBox};

/// Atom record
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub name: String,
    pub resname: String,
    pub resid: i32,
    pub mass: f32,
}

/// Molecular system: topology plus the current coordinates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MolecularSystem {
    atoms: Vec<Atom>,
    coords: Vec<Vector3<f32>>,
    periodic_box: PeriodicBox,
    sources: Vec<String>,
}

impl MolecularSystem {
    /// Create empty system
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove all atoms, coordinates and load history
    pub fn clear(&mut self) {
        self.atoms.clear();
        self.coords.clear();
        self.periodic_box = PeriodicBox::none();
        self.sources.clear();
    }

    /// Append an atom with its coordinate
    pub fn push_atom(&mut self, atom: Atom, coord: Vector3<f32>) {
        self.atoms.push(atom);
        self.coords.push(coord);
    }

    /// Record that a file contributed to this system
    pub fn record_source(&mut self, source: impl Into<String>) {
        self.sources.push(source.into());
    }

    pub fn set_box(&mut self, periodic_box: PeriodicBox) {
        self.periodic_box = periodic_box;
    }

    /// Replace coordinates and box with those of a frame
    ///
    /// Returns false (and leaves the system untouched) if the atom count differs.
    pub fn set_frame(&mut self, frame: &Frame) -> bool {
        if frame.coords.len() != self.atoms.len() {
            return false;
        }
        self.coords.clone_from(&frame.coords);
        self.periodic_box = frame.periodic_box;
        true
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn coords(&self) -> &[Vector3<f32>] {
        &self.coords
    }

    pub fn periodic_box(&self) -> &PeriodicBox {
        &self.periodic_box
    }

    /// Files loaded into this system, in load order
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn num_atoms(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Total mass of all atoms
    pub fn total_mass(&self) -> f32 {
        self.atoms.iter().map(|a| a.mass).sum()
    }
}
