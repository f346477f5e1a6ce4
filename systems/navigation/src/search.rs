//! Resumable goal-to-start grid search.

use glam::Vec3;
use log::{debug, trace};
use waypoint_core::{geometry::distance_projected, SearchStatus, Terrain};

use crate::{
    grid::{OccupancyGrid, Plane},
    path::WaypointPath,
    queue::BucketQueue,
};

/// Offsets of the eight neighbours, in enumeration order.
const NEIGHBOURS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Cost of the step towards each neighbour.
const EDGE_COST: [i32; 8] = [7, 5, 7, 5, 5, 7, 5, 7];

const BISECTIONS: usize = 10;

/// Octile estimate between two cells: diagonal steps cost 7, straight ones 5.
#[must_use]
pub fn heuristic(x: i32, y: i32, to_x: i32, to_y: i32) -> i32 {
    let dx = (x - to_x).abs();
    let dy = (y - to_y).abs();
    let smaller = dx.min(dy);
    let bigger = dx.max(dy);
    smaller * (7 - 5) + bigger * 5
}

/// Incremental best-first search from a goal back to a start cell.
///
/// Each call to [`PathSearch::step`] performs a bounded number of pops and
/// keeps the queue, the distances and the enqueued plane of the grid intact
/// for the next call.
#[derive(Clone, Debug, Default)]
pub struct PathSearch {
    queue: BucketQueue,
    distances: Vec<i32>,
    start: Vec3,
    goal: Vec3,
    goal_radius: f32,
    start_cell: (i32, i32),
    goal_cell: (i32, i32),
    steps: u32,
    cost: Option<i32>,
    path: Option<WaypointPath>,
}

impl PathSearch {
    /// Prepares a new search between two world positions.
    ///
    /// Cells within `goal_radius` of the goal are accepted as targets. The
    /// grid's enqueued plane is cleared.
    pub fn begin(&mut self, grid: &mut OccupancyGrid, start: Vec3, goal: Vec3, goal_radius: f32) {
        let geometry = grid.geometry();
        if self.distances.len() != geometry.cell_count() {
            self.distances = vec![0; geometry.cell_count()];
        }
        self.start_cell = geometry.cell(start);
        self.goal_cell = geometry.cell(goal);
        self.start = start;
        self.goal = goal;
        self.goal_radius = goal_radius;
        self.queue.clear();
        self.steps = 0;
        self.cost = None;
        self.path = None;
        grid.clear_enqueued();
    }

    /// Cost of the found path, in edge-cost units.
    #[must_use]
    pub const fn cost(&self) -> Option<i32> {
        self.cost
    }

    /// Path found by the last successful step.
    #[must_use]
    pub const fn path(&self) -> Option<&WaypointPath> {
        self.path.as_ref()
    }

    /// Moves the found path out of the search.
    pub fn take_path(&mut self) -> Option<WaypointPath> {
        self.path.take()
    }

    /// Number of calls to [`PathSearch::step`] since [`PathSearch::begin`].
    #[must_use]
    pub const fn steps(&self) -> u32 {
        self.steps
    }

    /// Runs at most `budget` pops of the search.
    pub fn step(
        &mut self,
        grid: &mut OccupancyGrid,
        terrain: &dyn Terrain,
        budget: u32,
        max_points: usize,
    ) -> SearchStatus {
        self.steps += 1;

        if self.queue.is_fresh() {
            if self.start_cell == self.goal_cell {
                self.cost = Some(0);
                self.path = Some(WaypointPath::new(vec![self.start, self.goal]));
                return SearchStatus::Found;
            }
            self.seed(grid, terrain);
        }

        let (start_x, start_y) = self.start_cell;
        let geometry = *grid.geometry();
        let mut iterations = 0;

        loop {
            let distances = &self.distances;
            let key_of = |index: u32| {
                let (x, y) = geometry.cell_at(index as usize);
                distances[index as usize] + heuristic(x, y, start_x, start_y)
            };
            let Some(index) = self.queue.pop(key_of) else {
                return SearchStatus::Unreachable;
            };

            let (x, y) = geometry.cell_at(index as usize);
            let distance = self.distances[index as usize];
            let key = distance + heuristic(x, y, start_x, start_y);
            let min = self.queue.min();

            if key != min {
                if key < min {
                    self.queue.note_skipped();
                } else {
                    trace!("re-queueing cell ({x}, {y}) at cost {key} behind cursor {min}");
                    self.queue.reinsert(index, key);
                }
                continue;
            }

            if (x, y) == self.start_cell {
                return self.reconstruct(grid, key, max_points);
            }

            for (&(dx, dy), &edge) in NEIGHBOURS.iter().zip(EDGE_COST.iter()) {
                let (nx, ny) = (x + dx, y + dy);
                if !grid.is_visitable(terrain, nx, ny) {
                    continue;
                }
                let Some(neighbour) = geometry.index(nx, ny) else {
                    continue;
                };
                let candidate = distance + edge;
                if grid.peek(Plane::Enqueued, nx, ny) {
                    if candidate < self.distances[neighbour] {
                        self.queue.note_repeated();
                    } else {
                        continue;
                    }
                }
                self.distances[neighbour] = candidate;
                self.queue.push(
                    neighbour as u32,
                    candidate + heuristic(nx, ny, start_x, start_y),
                );
                grid.set(Plane::Enqueued, nx, ny);
            }

            iterations += 1;
            if iterations >= budget {
                return SearchStatus::Continue;
            }
        }
    }

    fn seed(&mut self, grid: &mut OccupancyGrid, terrain: &dyn Terrain) {
        let geometry = *grid.geometry();
        let (start_x, start_y) = self.start_cell;
        let (goal_x, goal_y) = self.goal_cell;

        match geometry.index(goal_x, goal_y) {
            Some(index) => {
                let key = heuristic(goal_x, goal_y, start_x, start_y);
                self.queue.set_min(key);
                self.distances[index] = 0;
                self.queue.push(index as u32, key);
                grid.set(Plane::Enqueued, goal_x, goal_y);
            }
            None => self.queue.set_min(i32::MAX),
        }

        if self.goal_radius <= 0.0 {
            return;
        }

        let last = geometry.side() - 1;
        let min_x = geometry.cell_of(self.goal.x - self.goal_radius).max(0);
        let min_y = geometry.cell_of(self.goal.z - self.goal_radius).max(0);
        let max_x = geometry.cell_of(self.goal.x + self.goal_radius).min(last);
        let max_y = geometry.cell_of(self.goal.z + self.goal_radius).min(last);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let center_x = geometry.center_of(x);
                let center_y = geometry.center_of(y);
                let reach = (center_x - self.goal.x).hypot(center_y - self.goal.z);
                if reach > self.goal_radius {
                    continue;
                }
                if !grid.is_visitable(terrain, x, y) || grid.peek(Plane::Enqueued, x, y) {
                    continue;
                }
                let Some(index) = geometry.index(x, y) else {
                    continue;
                };
                let key = heuristic(x, y, start_x, start_y);
                self.queue.set_min(self.queue.min().min(key));
                self.distances[index] = 0;
                self.queue.push(index as u32, key);
                grid.set(Plane::Enqueued, x, y);
            }
        }
    }

    fn reconstruct(&mut self, grid: &OccupancyGrid, cost: i32, max_points: usize) -> SearchStatus {
        let geometry = *grid.geometry();
        let mut points = Vec::with_capacity(16);
        points.push(self.start);
        let (mut x, mut y) = self.start_cell;

        loop {
            if points.len() >= max_points {
                debug!("path reconstruction exceeded {max_points} points");
                return SearchStatus::Inconsistent;
            }

            let mut best: Option<(i32, i32, i32)> = None;
            for (dx, dy) in NEIGHBOURS {
                let (nx, ny) = (x + dx, y + dy);
                if !grid.peek(Plane::Enqueued, nx, ny) {
                    continue;
                }
                let Some(index) = geometry.index(nx, ny) else {
                    continue;
                };
                let distance = self.distances[index];
                if best.map_or(true, |(_, _, known)| distance < known) {
                    best = Some((nx, ny, distance));
                }
            }

            let Some((bx, by, distance)) = best else {
                debug!("failed to find the parent of cell ({x}, {y})");
                return SearchStatus::Inconsistent;
            };
            (x, y) = (bx, by);

            let point = if (x, y) == self.goal_cell {
                self.goal
            } else {
                Vec3::new(geometry.center_of(x), self.goal.y, geometry.center_of(y))
            };
            points.push(point);

            if distance == 0 {
                break;
            }
        }

        if self.goal_radius > 0.0 {
            self.refine_last(&mut points);
        }

        let stats = *self.queue.stats();
        let last = points.last().copied().unwrap_or(self.goal);
        debug!(
            "found path with {} points and cost {cost}, {:.2} from goal after {} steps",
            points.len(),
            distance_projected(last, self.goal),
            self.steps,
        );
        debug!(
            "queue: pushed {} popped {} repeated {} skipped {} redistributed {}",
            stats.pushed, stats.popped, stats.repeated, stats.skipped, stats.redistributed,
        );
        for (slot, len) in self.queue.occupancy() {
            trace!("bucket {slot}: {len} entries left");
        }

        self.cost = Some(cost);
        self.path = Some(WaypointPath::new(points));
        SearchStatus::Found
    }

    /// Moves the last point onto the goal circle by bisecting towards the
    /// point before it.
    fn refine_last(&self, points: &mut [Vec3]) {
        let count = points.len();
        if count < 2 {
            return;
        }
        let r2 = self.goal_radius * self.goal_radius;
        let mut inside = points[count - 1] - self.goal;
        let mut outside = points[count - 2] - self.goal;
        let mut mid = (inside + outside) * 0.5;
        for _ in 0..BISECTIONS {
            if mid.x * mid.x + mid.z * mid.z < r2 {
                inside = mid;
            } else {
                outside = mid;
            }
            mid = (inside + outside) * 0.5;
        }
        points[count - 1] = mid + self.goal;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        grid::TerrainRules,
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

    fn world(grid: &OccupancyGrid, x: i32, y: i32) -> Vec3 {
        let geometry = grid.geometry();
        Vec3::new(geometry.center_of(x), 0.0, geometry.center_of(y))
    }

    fn run(search: &mut PathSearch, grid: &mut OccupancyGrid, budget: u32) -> SearchStatus {
        let terrain = FlatTerrain::default();
        loop {
            match search.step(grid, &terrain, budget, 500) {
                SearchStatus::Continue => continue,
                status => return status,
            }
        }
    }

    #[test]
    fn heuristic_prefers_diagonals() {
        assert_eq!(heuristic(0, 0, 10, 0), 50);
        assert_eq!(heuristic(0, 0, 3, 3), 21);
        assert_eq!(heuristic(0, 0, 4, 1), 22);
    }

    #[test]
    fn same_cell_returns_two_points() {
        let mut grid = grid();
        let mut search = PathSearch::default();
        let start = Vec3::new(1.0, 0.0, 1.0);
        let goal = Vec3::new(2.0, 0.0, 2.0);
        search.begin(&mut grid, start, goal, 0.0);
        assert_eq!(run(&mut search, &mut grid, 200), SearchStatus::Found);
        let path = search.path().expect("path");
        assert_eq!(path.points(), &[start, goal]);
    }

    #[test]
    fn open_grid_cost_matches_octile_distance() {
        for (sx, sy, gx, gy) in [(0, 0, 10, 0), (2, 3, 17, 9), (19, 19, 0, 4), (5, 5, 5, 14)] {
            let mut grid = grid();
            let mut search = PathSearch::default();
            let start = world(&grid, sx, sy);
            let goal = world(&grid, gx, gy);
            search.begin(&mut grid, start, goal, 0.0);
            assert_eq!(run(&mut search, &mut grid, 200), SearchStatus::Found);
            assert_eq!(search.cost(), Some(heuristic(sx, sy, gx, gy)));
            let path = search.path().expect("path");
            assert_eq!(path.points().first(), Some(&start));
            assert_eq!(path.points().last(), Some(&goal));
        }
    }

    #[test]
    fn goal_outside_grid_is_unreachable() {
        let mut grid = grid();
        let mut search = PathSearch::default();
        let start = world(&grid, 1, 1);
        search.begin(&mut grid, start, Vec3::new(500.0, 0.0, 0.0), 0.0);
        assert_eq!(run(&mut search, &mut grid, 200), SearchStatus::Unreachable);
    }

    #[test]
    fn goal_radius_stops_on_the_circle() {
        let mut grid = grid();
        let mut search = PathSearch::default();
        let start = world(&grid, 2, 10);
        let goal = world(&grid, 16, 10);
        search.begin(&mut grid, start, goal, 12.0);
        assert_eq!(run(&mut search, &mut grid, 200), SearchStatus::Found);

        let last = *search.path().and_then(|p| p.points().last()).expect("point");
        let reach = distance_projected(last, goal);
        assert!(reach <= 12.0 + 0.05, "final point {reach} from goal");
        assert!(reach >= 12.0 - 0.1, "final point {reach} from goal");
    }

    #[test]
    fn small_budget_needs_several_steps() {
        let mut grid = grid();
        let mut search = PathSearch::default();
        let (start, goal) = (world(&grid, 0, 0), world(&grid, 19, 19));
        search.begin(&mut grid, start, goal, 0.0);
        assert_eq!(run(&mut search, &mut grid, 1), SearchStatus::Found);
        assert!(search.steps() > 1);
    }
}
