#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Movement orders for a single mover.
//!
//! A [`GotoTask`] turns a [`waypoint_core::GotoOrder`] into per-frame motor
//! speeds. Long moves plan a path on the mover's occupancy grid and follow
//! it; short moves head straight for the goal with reactive repulsion and
//! sidestep after collisions.

mod avoid;
mod target;
mod task;

use waypoint_core::{ObjectRegistry, Terrain};

pub use task::{GotoTask, Phase};

/// Read-only view of the world a task steers through.
#[derive(Clone, Copy)]
pub struct Surroundings<'a> {
    /// Terrain queries.
    pub terrain: &'a dyn Terrain,
    /// Every object, sorted by identifier.
    pub objects: &'a dyn ObjectRegistry,
}
