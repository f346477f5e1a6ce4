//! Two-plane occupancy grid rasterised lazily from terrain and obstacles.

use glam::{Vec2, Vec3};
use waypoint_core::{GridConfig, LocomotionProfile, ObjectId, ObjectRegistry, Terrain};

use crate::bitgrid::BitGrid;

/// Bit plane selector of an [`OccupancyGrid`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Plane {
    /// Cells a mover cannot enter.
    Blocked,
    /// Cells the running search has enqueued at least once.
    Enqueued,
}

/// Mapping between world coordinates and grid cells.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridGeometry {
    cell_size: f32,
    half_extent: f32,
    side: i32,
}

impl GridGeometry {
    /// Derives the geometry from the grid configuration.
    #[must_use]
    pub fn new(config: &GridConfig) -> Self {
        Self {
            cell_size: config.cell_size,
            half_extent: config.half_extent,
            side: config.side(),
        }
    }

    /// Edge length of a cell.
    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of cells along one side.
    #[must_use]
    pub const fn side(&self) -> i32 {
        self.side
    }

    /// Cell index along one axis containing a world coordinate.
    #[must_use]
    pub fn cell_of(&self, coord: f32) -> i32 {
        ((coord + self.half_extent) / self.cell_size).floor() as i32
    }

    /// Cell containing the planar projection of a world position.
    #[must_use]
    pub fn cell(&self, position: Vec3) -> (i32, i32) {
        (self.cell_of(position.x), self.cell_of(position.z))
    }

    /// Fractional grid coordinates of a world position.
    #[must_use]
    pub fn grid_point(&self, position: Vec3) -> Vec2 {
        Vec2::new(
            (position.x + self.half_extent) / self.cell_size,
            (position.z + self.half_extent) / self.cell_size,
        )
    }

    /// World coordinate of the centre of a cell along one axis.
    #[must_use]
    pub fn center_of(&self, cell: i32) -> f32 {
        (cell as f32 + 0.5) * self.cell_size - self.half_extent
    }

    /// World coordinate of the low corner of a cell along one axis.
    #[must_use]
    pub fn corner_of(&self, cell: i32) -> f32 {
        cell as f32 * self.cell_size - self.half_extent
    }

    /// Reports whether a cell lies inside the grid.
    #[must_use]
    pub const fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.side && y < self.side
    }

    /// Row-major index of an in-range cell.
    #[must_use]
    pub fn index(&self, x: i32, y: i32) -> Option<usize> {
        if !self.contains(x, y) {
            return None;
        }
        usize::try_from(y * self.side + x).ok()
    }

    /// Cell addressed by a row-major index.
    #[must_use]
    pub fn cell_at(&self, index: usize) -> (i32, i32) {
        let side = usize::try_from(self.side).unwrap_or(1).max(1);
        let x = i32::try_from(index % side).unwrap_or(0);
        let y = i32::try_from(index / side).unwrap_or(0);
        (x, y)
    }

    /// Number of cells in the grid.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        usize::try_from(self.side).unwrap_or(0).pow(2)
    }
}

/// Terrain acceptance rules of one mover.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TerrainRules {
    /// Steepest slope, in radians, the mover can drive on.
    pub slope_limit: f32,
    /// Whether the mover may drive under water.
    pub accepts_water: bool,
    /// Whether the mover flies over slopes and water.
    pub flies: bool,
}

impl From<&LocomotionProfile> for TerrainRules {
    fn from(profile: &LocomotionProfile) -> Self {
        Self {
            slope_limit: profile.slope_limit(),
            accepts_water: profile.accepts_water,
            flies: profile.flies,
        }
    }
}

/// Mover description used when rasterising other objects.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObstacleScan {
    /// Mover doing the scan, never rasterised.
    pub mover: ObjectId,
    /// Object the mover wants to pick up, never rasterised.
    pub cargo: Option<ObjectId>,
    /// Radius of the mover's own crash sphere.
    pub radius: f32,
    /// Cruise altitude when the mover flies, zero on the ground.
    pub altitude: f32,
    /// Whether the mover is a flyer.
    pub flies: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct KnownRect {
    min_x: i32,
    min_y: i32,
    max_x: i32,
    max_y: i32,
}

impl KnownRect {
    const fn empty(side: i32) -> Self {
        Self {
            min_x: side,
            min_y: side,
            max_x: 0,
            max_y: 0,
        }
    }

    const fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

/// Per-mover occupancy grid with a blocked plane and an enqueued plane.
///
/// The blocked plane is filled lazily: a query outside the rectangle already
/// computed first rasterises the terrain around it.
#[derive(Clone, Debug)]
pub struct OccupancyGrid {
    geometry: GridGeometry,
    rules: TerrainRules,
    safety_margin: f32,
    rescan_margin: i32,
    blocked: BitGrid,
    enqueued: BitGrid,
    known: KnownRect,
}

impl OccupancyGrid {
    /// Allocates an empty grid for a mover with the provided rules.
    #[must_use]
    pub fn new(config: &GridConfig, rules: TerrainRules) -> Self {
        let geometry = GridGeometry::new(config);
        Self {
            geometry,
            rules,
            safety_margin: config.safety_margin,
            rescan_margin: config.rescan_margin,
            blocked: BitGrid::new(geometry.side()),
            enqueued: BitGrid::new(geometry.side()),
            known: KnownRect::empty(geometry.side()),
        }
    }

    /// Coordinate mapping of the grid.
    #[must_use]
    pub const fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    /// Terrain rules applied when rasterising.
    #[must_use]
    pub const fn rules(&self) -> &TerrainRules {
        &self.rules
    }

    /// Clears both planes and forgets every computed region.
    pub fn open(&mut self) {
        self.blocked.clear_all();
        self.enqueued.clear_all();
        self.known = KnownRect::empty(self.geometry.side());
    }

    /// Reads a bit, computing the surrounding terrain first if it is unknown.
    ///
    /// Out-of-range cells read as unset.
    pub fn test(&mut self, terrain: &dyn Terrain, plane: Plane, x: i32, y: i32) -> bool {
        if !self.geometry.contains(x, y) {
            return false;
        }
        self.ensure_known(terrain, x, y);
        self.plane(plane).test(x, y)
    }

    /// Reports whether a mover may enter the cell.
    ///
    /// Out-of-range cells are never visitable.
    pub fn is_visitable(&mut self, terrain: &dyn Terrain, x: i32, y: i32) -> bool {
        if !self.geometry.contains(x, y) {
            return false;
        }
        self.ensure_known(terrain, x, y);
        !self.blocked.test(x, y)
    }

    /// Reads a bit without touching the terrain.
    #[must_use]
    pub fn peek(&self, plane: Plane, x: i32, y: i32) -> bool {
        self.plane(plane).test(x, y)
    }

    /// Raises a bit. Out-of-range cells are ignored.
    pub fn set(&mut self, plane: Plane, x: i32, y: i32) {
        self.plane_mut(plane).set(x, y);
    }

    /// Lowers a bit. Out-of-range cells are ignored.
    pub fn clear(&mut self, plane: Plane, x: i32, y: i32) {
        self.plane_mut(plane).clear(x, y);
    }

    /// Clears the enqueued plane ahead of a new search.
    pub fn clear_enqueued(&mut self) {
        self.enqueued.clear_all();
    }

    /// Blocks every cell of a disk.
    pub fn set_circle(&mut self, center: Vec3, radius: f32) {
        self.for_each_in_circle(center, radius, |grid, x, y| grid.blocked.set(x, y));
    }

    /// Unblocks every cell of a disk.
    pub fn clear_circle(&mut self, center: Vec3, radius: f32) {
        self.for_each_in_circle(center, radius, |grid, x, y| grid.blocked.clear(x, y));
    }

    fn for_each_in_circle(
        &mut self,
        center: Vec3,
        radius: f32,
        mut visit: impl FnMut(&mut Self, i32, i32),
    ) {
        let (cx, cy) = self.geometry.cell(center);
        let r = radius / self.geometry.cell_size();
        let reach = r as i32;
        for iy in cy - reach..=cy + reach {
            for ix in cx - reach..=cx + reach {
                let offset = Vec2::new((ix - cx) as f32, (iy - cy) as f32);
                if offset.length() > r {
                    continue;
                }
                visit(self, ix, iy);
            }
        }
    }

    /// Rasterises terrain between two world positions, in any order.
    pub fn compute_terrain_between(&mut self, terrain: &dyn Terrain, a: Vec3, b: Vec3) {
        let (ax, ay) = self.geometry.cell(a);
        let (bx, by) = self.geometry.cell(b);
        self.compute_terrain_region(terrain, ax, ay, bx, by);
    }

    /// Rasterises terrain over a cell rectangle and grows the known region.
    ///
    /// Cells already inside the known region are skipped.
    pub fn compute_terrain_region(
        &mut self,
        terrain: &dyn Terrain,
        min_x: i32,
        min_y: i32,
        max_x: i32,
        max_y: i32,
    ) {
        let last = self.geometry.side() - 1;
        let (mut min_x, mut max_x) = (min_x.min(max_x), min_x.max(max_x));
        let (mut min_y, mut max_y) = (min_y.min(max_y), min_y.max(max_y));
        min_x = min_x.max(0);
        min_y = min_y.max(0);
        max_x = max_x.min(last);
        max_y = max_y.min(last);

        let old = self.known;
        min_x = min_x.min(old.min_x);
        min_y = min_y.min(old.min_y);
        max_x = max_x.max(old.max_x);
        max_y = max_y.max(old.max_y);

        if min_x >= old.min_x && max_x <= old.max_x && min_y >= old.min_y && max_y <= old.max_y {
            return;
        }

        let water = terrain.water_level();
        let ceiling = terrain.flying_max_height();

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                if old.contains(x, y) {
                    continue;
                }

                let corner = Vec3::new(self.geometry.corner_of(x), 0.0, self.geometry.corner_of(y));

                if self.rules.flies {
                    if terrain.floor_level(corner) >= ceiling - 5.0 {
                        self.blocked.set(x, y);
                    }
                    continue;
                }

                if !self.rules.accepts_water && terrain.floor_level(corner) < water - 2.0 {
                    let cell = self.geometry.cell_size();
                    self.set_circle(corner, cell);
                    continue;
                }

                if terrain.fine_slope(corner) > self.rules.slope_limit {
                    self.blocked.set(x, y);
                }
            }
        }

        self.known = KnownRect {
            min_x,
            min_y,
            max_x,
            max_y,
        };
    }

    /// Rasterises the crash spheres of every other object.
    ///
    /// Spheres are inflated by the mover radius plus the safety margin.
    /// Spheres entirely above the mover's band, or below it for a cruising
    /// flyer, are skipped.
    pub fn compute_objects_region(
        &mut self,
        terrain: &dyn Terrain,
        objects: &dyn ObjectRegistry,
        scan: &ObstacleScan,
    ) {
        let cruising = scan.flies && scan.altitude > 0.0;

        for object in objects.objects() {
            if object.id == scan.mover || Some(object.id) == scan.cargo {
                continue;
            }
            if object.transported || !object.active {
                continue;
            }

            let mut band = terrain.floor_level(object.position);
            if cruising {
                band += scan.altitude;
            }

            for sphere in &object.crash_spheres {
                let top = sphere.center.y + sphere.radius;
                let bottom = sphere.center.y - sphere.radius;
                if bottom > band + 8.0 {
                    continue;
                }
                if cruising && top < band - 8.0 {
                    continue;
                }
                self.set_circle(
                    sphere.center,
                    sphere.radius + scan.radius + self.safety_margin,
                );
            }
        }
    }

    /// Tests whether the straight segment between two points crosses no
    /// blocked cell.
    pub fn test_line(&mut self, terrain: &dyn Terrain, start: Vec3, goal: Vec3) -> bool {
        let ray = RayCells::new(&self.geometry, start, goal);
        for (x, y) in ray {
            if self.test(terrain, Plane::Blocked, x, y) {
                return false;
            }
        }
        true
    }

    fn ensure_known(&mut self, terrain: &dyn Terrain, x: i32, y: i32) {
        if !self.known.contains(x, y) {
            let margin = self.rescan_margin;
            self.compute_terrain_region(terrain, x - margin, y - margin, x + margin, y + margin);
        }
    }

    fn plane(&self, plane: Plane) -> &BitGrid {
        match plane {
            Plane::Blocked => &self.blocked,
            Plane::Enqueued => &self.enqueued,
        }
    }

    fn plane_mut(&mut self, plane: Plane) -> &mut BitGrid {
        match plane {
            Plane::Blocked => &mut self.blocked,
            Plane::Enqueued => &mut self.enqueued,
        }
    }
}

/// Cells entered by a straight segment, one grid-line crossing at a time.
///
/// The start cell is not yielded. A segment inside a single cell yields
/// nothing; otherwise the last cell yielded contains the goal.
#[derive(Clone, Debug)]
pub struct RayCells {
    x: i32,
    y: i32,
    step_x: i32,
    step_y: i32,
    t_max_x: f32,
    t_max_y: f32,
    t_delta_x: f32,
    t_delta_y: f32,
    remaining: i32,
}

impl RayCells {
    /// Prepares the traversal between two world positions.
    #[must_use]
    pub fn new(geometry: &GridGeometry, start: Vec3, goal: Vec3) -> Self {
        let from = geometry.grid_point(start);
        let to = geometry.grid_point(goal);
        let (start_x, start_y) = (from.x.floor() as i32, from.y.floor() as i32);
        let (goal_x, goal_y) = (to.x.floor() as i32, to.y.floor() as i32);

        let dir = (to - from).normalize_or_zero();
        let step_x = if dir.x > 0.0 { 1 } else { -1 };
        let step_y = if dir.y > 0.0 { 1 } else { -1 };

        Self {
            x: start_x,
            y: start_y,
            step_x,
            step_y,
            t_max_x: boundary_distance(from.x, dir.x),
            t_max_y: boundary_distance(from.y, dir.y),
            t_delta_x: step_x as f32 / dir.x,
            t_delta_y: step_y as f32 / dir.y,
            remaining: (goal_x - start_x).abs() + (goal_y - start_y).abs(),
        }
    }
}

impl Iterator for RayCells {
    type Item = (i32, i32);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining <= 0 {
            return None;
        }
        self.remaining -= 1;
        if self.t_max_x < self.t_max_y {
            self.t_max_x += self.t_delta_x;
            self.x += self.step_x;
        } else {
            self.t_max_y += self.t_delta_y;
            self.y += self.step_y;
        }
        Some((self.x, self.y))
    }
}

fn boundary_distance(origin: f32, dir: f32) -> f32 {
    if dir > 0.0 {
        (origin.floor() - origin + 1.0) / dir
    } else if dir < 0.0 {
        (origin.floor() - origin) / dir
    } else {
        f32::INFINITY
    }
}
