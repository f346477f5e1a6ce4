//! Waypoint polyline produced by a search and consumed by a mover.

use glam::Vec3;
use waypoint_core::Terrain;

use crate::grid::OccupancyGrid;

/// Ordered waypoints from the search start to the goal, with a cursor on the
/// point currently targeted.
#[derive(Clone, Debug, PartialEq)]
pub struct WaypointPath {
    points: Vec<Vec3>,
    index: usize,
}

impl WaypointPath {
    /// Wraps reconstructed points, targeting the first one.
    #[must_use]
    pub fn new(points: Vec<Vec3>) -> Self {
        Self { points, index: 0 }
    }

    /// Every waypoint, start first.
    #[must_use]
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Index of the last waypoint.
    #[must_use]
    pub fn total(&self) -> usize {
        self.points.len().saturating_sub(1)
    }

    /// Index of the waypoint currently targeted.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Moves the cursor.
    pub fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    /// Waypoint under the cursor, if the cursor is still on the path.
    #[must_use]
    pub fn current(&self) -> Option<Vec3> {
        self.points.get(self.index).copied()
    }

    /// Reports whether the cursor targets the final waypoint.
    #[must_use]
    pub fn at_last(&self) -> bool {
        self.index == self.total()
    }

    /// Index of the farthest waypoint visible in a straight line from the
    /// waypoint under the cursor.
    ///
    /// Falls back to the next waypoint when no farther one is visible. The
    /// result exceeds [`WaypointPath::total`] once the cursor is on the goal.
    pub fn shortcut(&self, grid: &mut OccupancyGrid, terrain: &dyn Terrain) -> usize {
        let Some(from) = self.current() else {
            return self.index + 1;
        };
        for candidate in (self.index + 2..=self.total()).rev() {
            if grid.test_line(terrain, from, self.points[candidate]) {
                return candidate;
            }
        }
        self.index + 1
    }

    /// Waypoints a mover actually visits when it shortcuts from the start.
    pub fn compressed(&self, grid: &mut OccupancyGrid, terrain: &dyn Terrain) -> Vec<Vec3> {
        let mut walker = Self::new(self.points.clone());
        let mut visited = Vec::new();
        while let Some(point) = walker.current() {
            visited.push(point);
            let next = walker.shortcut(grid, terrain);
            walker.set_index(next);
        }
        visited
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        grid::{Plane, TerrainRules},
        testing::{grid_config, FlatTerrain},
    };

    fn grid() -> OccupancyGrid {
        OccupancyGrid::new(
            &grid_config(),
            TerrainRules {
                slope_limit: 20f32.to_radians(),
                accepts_water: false,
                flies: false,
            },
        )
    }

    fn staircase() -> WaypointPath {
        WaypointPath::new(vec![
            Vec3::new(-40.0, 0.0, -40.0),
            Vec3::new(-20.0, 0.0, -40.0),
            Vec3::new(-20.0, 0.0, -20.0),
            Vec3::new(0.0, 0.0, -20.0),
            Vec3::new(0.0, 0.0, 0.0),
        ])
    }

    #[test]
    fn clear_field_jumps_to_the_goal() {
        let mut grid = grid();
        let terrain = FlatTerrain::default();
        let path = staircase();
        assert_eq!(path.shortcut(&mut grid, &terrain), 4);
        assert_eq!(
            path.compressed(&mut grid, &terrain),
            vec![Vec3::new(-40.0, 0.0, -40.0), Vec3::new(0.0, 0.0, 0.0)]
        );
    }

    #[test]
    fn blocked_line_falls_back_to_the_next_point() {
        let mut grid = grid();
        let terrain = FlatTerrain::default();
        for x in 0..20 {
            for y in 0..20 {
                grid.set(Plane::Blocked, x, y);
            }
        }
        let path = staircase();
        assert_eq!(path.shortcut(&mut grid, &terrain), 1);
    }

    #[test]
    fn shortcut_past_the_goal_ends_the_walk() {
        let mut grid = grid();
        let terrain = FlatTerrain::default();
        let mut path = staircase();
        path.set_index(4);
        assert!(path.at_last());
        assert_eq!(path.shortcut(&mut grid, &terrain), 5);
        path.set_index(5);
        assert!(path.current().is_none());
    }
}
