use glam::Vec3;
use waypoint_core::{GridConfig, SearchStatus, Terrain};
use waypoint_system_navigation::{
    heuristic, OccupancyGrid, PathSearch, Plane, RayCells, TerrainRules, WaypointPath,
};

struct Flat;

impl Terrain for Flat {
    fn floor_level(&self, _position: Vec3) -> f32 {
        0.0
    }

    fn fine_slope(&self, _position: Vec3) -> f32 {
        0.0
    }

    fn normal(&self, _position: Vec3) -> Vec3 {
        Vec3::Y
    }

    fn water_level(&self) -> f32 {
        -100.0
    }

    fn flying_limit(&self, _position: Vec3, _small_flyer: bool) -> f32 {
        200.0
    }

    fn flying_max_height(&self) -> f32 {
        200.0
    }
}

fn config() -> GridConfig {
    GridConfig {
        half_extent: 50.0,
        ..GridConfig::default()
    }
}

fn wheels_grid() -> OccupancyGrid {
    OccupancyGrid::new(
        &config(),
        TerrainRules {
            slope_limit: 20f32.to_radians(),
            accepts_water: false,
            flies: false,
        },
    )
}

fn center(grid: &OccupancyGrid, x: i32, y: i32) -> Vec3 {
    let geometry = grid.geometry();
    Vec3::new(geometry.center_of(x), 0.0, geometry.center_of(y))
}

fn solve(
    grid: &mut OccupancyGrid,
    start: Vec3,
    goal: Vec3,
    budget: u32,
) -> (SearchStatus, PathSearch) {
    let mut search = PathSearch::default();
    search.begin(grid, start, goal, 0.0);
    loop {
        match search.step(grid, &Flat, budget, 500) {
            SearchStatus::Continue => continue,
            status => return (status, search),
        }
    }
}

fn block(grid: &mut OccupancyGrid, cells: impl IntoIterator<Item = (i32, i32)>) {
    for (x, y) in cells {
        grid.set(Plane::Blocked, x, y);
    }
}

/// Samples every segment and checks it stays out of the interior of a block
/// of cells given as inclusive cell bounds.
fn assert_avoids(grid: &OccupancyGrid, points: &[Vec3], min: (i32, i32), max: (i32, i32)) {
    let geometry = grid.geometry();
    let low_x = geometry.corner_of(min.0) + 0.5;
    let low_z = geometry.corner_of(min.1) + 0.5;
    let high_x = geometry.corner_of(max.0 + 1) - 0.5;
    let high_z = geometry.corner_of(max.1 + 1) - 0.5;
    for pair in points.windows(2) {
        for i in 0..=200 {
            let p = pair[0].lerp(pair[1], i as f32 / 200.0);
            let inside = p.x > low_x && p.x < high_x && p.z > low_z && p.z < high_z;
            assert!(!inside, "segment {:?} -> {:?} enters the block", pair[0], pair[1]);
        }
    }
}

fn assert_segments_clear(grid: &mut OccupancyGrid, points: &[Vec3]) {
    for pair in points.windows(2) {
        assert!(
            grid.test_line(&Flat, pair[0], pair[1]),
            "segment {:?} -> {:?} crosses a blocked cell",
            pair[0],
            pair[1]
        );
    }
}

#[test]
fn open_field_path_costs_fifty_and_shortcuts_to_two_points() {
    let mut grid = wheels_grid();
    let start = center(&grid, 0, 0);
    let goal = center(&grid, 10, 0);

    let (status, mut search) = solve(&mut grid, start, goal, 200);

    assert_eq!(status, SearchStatus::Found);
    assert_eq!(search.cost(), Some(50));
    let path = search.take_path().expect("path");
    assert_eq!(path.compressed(&mut grid, &Flat), vec![start, goal]);
}

#[test]
fn block_on_the_straight_line_forces_a_detour() {
    let mut grid = wheels_grid();
    let start = center(&grid, 0, 0);
    let goal = center(&grid, 10, 0);
    block(
        &mut grid,
        (4..=6).flat_map(|x| (0..=1).map(move |y| (x, y))),
    );

    let (status, mut search) = solve(&mut grid, start, goal, 200);

    assert_eq!(status, SearchStatus::Found);
    let cost = search.cost().expect("cost");
    assert!(cost > 50, "detour cost {cost} should exceed the straight line");

    let path = search.take_path().expect("path");
    assert_avoids(&grid, path.points(), (4, 0), (6, 1));
    let visited = path.compressed(&mut grid, &Flat);
    assert!(visited.len() > 2);
    assert_avoids(&grid, &visited, (4, 0), (6, 1));
}

#[test]
fn block_centred_on_the_line_is_bypassed() {
    let mut grid = wheels_grid();
    let start = center(&grid, 0, 5);
    let goal = center(&grid, 10, 5);
    block(
        &mut grid,
        (4..=6).flat_map(|x| (4..=6).map(move |y| (x, y))),
    );

    let (status, mut search) = solve(&mut grid, start, goal, 200);

    assert_eq!(status, SearchStatus::Found);
    assert!(search.cost().expect("cost") > 50);
    let path = search.take_path().expect("path");
    let visited = path.compressed(&mut grid, &Flat);
    assert_avoids(&grid, &visited, (4, 4), (6, 6));
    assert_eq!(visited.last(), Some(&goal));
}

#[test]
fn enclosed_goal_is_unreachable() {
    let mut grid = wheels_grid();
    let ring = (7..=13).flat_map(|i| [(i, 7), (i, 13), (7, i), (13, i)]);
    block(&mut grid, ring);

    let (start, goal) = (center(&grid, 1, 1), center(&grid, 10, 10));
    let (status, search) = solve(&mut grid, start, goal, 200);

    assert_eq!(status, SearchStatus::Unreachable);
    assert!(search.path().is_none());
}

#[test]
fn resumed_search_matches_unbounded_search() {
    let layout = |grid: &mut OccupancyGrid| {
        block(grid, (2..=15).map(|y| (8, y)));
        block(grid, (4..=18).map(|x| (x, 16)));
    };

    let mut sliced_grid = wheels_grid();
    layout(&mut sliced_grid);
    let start = center(&sliced_grid, 2, 9);
    let goal = center(&sliced_grid, 17, 3);
    let (sliced_status, sliced) = solve(&mut sliced_grid, start, goal, 3);

    let mut whole_grid = wheels_grid();
    layout(&mut whole_grid);
    let (whole_status, whole) = solve(&mut whole_grid, start, goal, u32::MAX);

    assert_eq!(sliced_status, SearchStatus::Found);
    assert_eq!(sliced_status, whole_status);
    assert!(sliced.steps() > whole.steps());
    assert_eq!(sliced.cost(), whole.cost());
    assert_eq!(sliced.path(), whole.path());
}

#[test]
fn open_field_costs_match_the_octile_estimate() {
    for (sx, sy, gx, gy) in [(0, 0, 19, 19), (3, 17, 12, 2), (10, 10, 0, 13)] {
        let mut grid = wheels_grid();
        let start = center(&grid, sx, sy);
        let goal = center(&grid, gx, gy);
        let (status, search) = solve(&mut grid, start, goal, 200);
        assert_eq!(status, SearchStatus::Found);
        assert_eq!(search.cost(), Some(heuristic(sx, sy, gx, gy)));
    }
}

#[test]
fn ray_visits_one_cell_per_crossing_plus_the_start() {
    let grid = wheels_grid();
    let geometry = grid.geometry();
    let start = Vec3::new(-38.2, 0.0, -41.7);
    let goal = Vec3::new(21.3, 0.0, 12.9);

    let (sx, sy) = geometry.cell(start);
    let (gx, gy) = geometry.cell(goal);
    let crossings = (gx - sx).abs() + (gy - sy).abs();

    let mut cells = vec![(sx, sy)];
    cells.extend(RayCells::new(geometry, start, goal));

    assert_eq!(cells.len() as i32, crossings + 1);
    assert_eq!(cells.last(), Some(&(gx, gy)));
    for pair in cells.windows(2) {
        let step = (pair[1].0 - pair[0].0).abs() + (pair[1].1 - pair[0].1).abs();
        assert_eq!(step, 1, "cells {:?} are not edge neighbours", pair);
    }
}

#[test]
fn ray_inside_one_cell_is_visible() {
    let mut grid = wheels_grid();
    let a = Vec3::new(0.2, 0.0, 0.3);
    let b = Vec3::new(4.7, 0.0, 4.1);
    assert_eq!(RayCells::new(grid.geometry(), a, b).count(), 0);
    assert!(grid.test_line(&Flat, a, b));
}

#[test]
fn shortcut_never_skips_into_a_blocked_line() {
    let mut grid = wheels_grid();
    block(&mut grid, (0..=12).map(|y| (10, y)));
    let path = WaypointPath::new(vec![
        center(&grid, 5, 5),
        center(&grid, 9, 14),
        center(&grid, 11, 14),
        center(&grid, 15, 5),
    ]);
    let visited = path.compressed(&mut grid, &Flat);
    assert_eq!(visited.first(), Some(&center(&grid, 5, 5)));
    assert_eq!(visited.last(), Some(&center(&grid, 15, 5)));
    assert_segments_clear(&mut grid, &visited);
}
