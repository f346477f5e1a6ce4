#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Grid path planning for a single mover.
//!
//! An [`OccupancyGrid`] rasterises terrain and obstacles into a blocked
//! plane, a [`PathSearch`] explores it from the goal back to the mover a few
//! hundred cells per call, and the resulting [`WaypointPath`] is shortened on
//! the fly with straight-line visibility tests.

mod bitgrid;
mod grid;
mod path;
mod queue;
mod search;
#[cfg(test)]
mod testing;

pub use bitgrid::BitGrid;
pub use grid::{GridGeometry, ObstacleScan, OccupancyGrid, Plane, RayCells, TerrainRules};
pub use path::WaypointPath;
pub use queue::{BucketQueue, QueueStats, NUM_QUEUE_BUCKETS};
pub use search::{heuristic, PathSearch};
