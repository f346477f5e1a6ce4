//! Scripted worlds the binary can run an order through.

use std::f32::consts::TAU;

use clap::ValueEnum;
use glam::Vec3;
use waypoint_core::{Command, ObjectRole, ObjectSpec, TerrainSpec};

/// Samples per side of the hill terrain, matching the default world.
const SAMPLES: u32 = 129;
/// Distance between hill terrain samples.
const SPACING: f32 = 5.0;

/// Layout placed between the start and the goal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum Scenario {
    /// Flat ground with nothing in the way.
    Open,
    /// Three by three cells of rock halfway to the goal.
    Block,
    /// Goal surrounded by a closed ring of rocks.
    Enclosed,
    /// Steep hill beside the direct line and a pond on the other side.
    Hill,
}

impl Scenario {
    /// Commands that build the scenario before the mover is spawned.
    pub(crate) fn setup(self, start: Vec3, goal: Vec3, cell: f32) -> Vec<Command> {
        let middle = (start + goal) * 0.5;
        match self {
            Self::Open => Vec::new(),
            Self::Block => (-1..=1)
                .flat_map(|column| (-1..=1).map(move |row| (column, row)))
                .map(|(column, row)| {
                    let offset = Vec3::new(column as f32, 0.0, row as f32) * cell;
                    rock(middle + offset, cell * 0.75)
                })
                .collect(),
            Self::Enclosed => (0..20)
                .map(|slot| {
                    let angle = slot as f32 / 20.0 * TAU;
                    let offset = Vec3::new(angle.cos(), 0.0, angle.sin()) * cell * 3.0;
                    rock(goal + offset, cell * 0.8)
                })
                .collect(),
            Self::Hill => {
                let across = side_of(start, goal) * 30.0;
                vec![Command::ConfigureTerrain {
                    field: hill(middle + across, middle - across),
                }]
            }
        }
    }
}

fn rock(position: Vec3, radius: f32) -> Command {
    Command::SpawnObject {
        spec: ObjectSpec::new(ObjectRole::Scenery, position, radius),
    }
}

/// Unit vector perpendicular to the direct line on the ground.
fn side_of(start: Vec3, goal: Vec3) -> Vec3 {
    let line = goal - start;
    let side = Vec3::new(-line.z, 0.0, line.x);
    if side.length_squared() > 0.0 {
        side.normalize()
    } else {
        Vec3::X
    }
}

fn hill(summit: Vec3, pond: Vec3) -> TerrainSpec {
    let mut spec = TerrainSpec::flat(SAMPLES, SAMPLES, SPACING, 0.0);
    spec.water_level = -2.0;
    let half = (SAMPLES - 1) as f32 * SPACING * 0.5;
    for (index, height) in spec.heights.iter_mut().enumerate() {
        let column = (index % SAMPLES as usize) as f32;
        let row = (index / SAMPLES as usize) as f32;
        let point = Vec3::new(column * SPACING - half, 0.0, row * SPACING - half);
        let rise = 25.0 * (-point.distance_squared(summit) / 900.0).exp();
        let dip = 6.0 * (-point.distance_squared(pond) / 400.0).exp();
        *height = rise - dip;
    }
    spec
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawned(commands: &[Command]) -> Vec<Vec3> {
        commands
            .iter()
            .filter_map(|command| match command {
                Command::SpawnObject { spec } => Some(spec.position),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn block_sits_halfway_to_the_goal() {
        let commands = Scenario::Block.setup(Vec3::ZERO, Vec3::new(100.0, 0.0, 0.0), 5.0);
        let rocks = spawned(&commands);
        assert_eq!(rocks.len(), 9);
        assert!(rocks.contains(&Vec3::new(50.0, 0.0, 0.0)));
        assert!(rocks.contains(&Vec3::new(45.0, 0.0, -5.0)));
    }

    #[test]
    fn ring_surrounds_the_goal() {
        let goal = Vec3::new(40.0, 0.0, 30.0);
        let commands = Scenario::Enclosed.setup(Vec3::ZERO, goal, 5.0);
        let rocks = spawned(&commands);
        assert_eq!(rocks.len(), 20);
        assert!(rocks
            .iter()
            .all(|rock| (rock.distance(goal) - 15.0).abs() < 1.0e-3));
    }

    #[test]
    fn hill_rises_beside_the_line_and_the_pond_floods() {
        let commands = Scenario::Hill.setup(Vec3::ZERO, Vec3::new(100.0, 0.0, 0.0), 5.0);
        let [Command::ConfigureTerrain { field }] = commands.as_slice() else {
            panic!("expected a single terrain command, got {commands:?}");
        };
        assert_eq!(field.heights.len(), (SAMPLES * SAMPLES) as usize);

        // Summit at (50, 30) and pond at (50, -30) on the 5 unit grid.
        let sample = |x: f32, z: f32| {
            let half = (SAMPLES - 1) as f32 * SPACING * 0.5;
            let column = ((x + half) / SPACING) as usize;
            let row = ((z + half) / SPACING) as usize;
            field.heights[row * SAMPLES as usize + column]
        };
        assert!(sample(50.0, 30.0) > 20.0);
        assert!(sample(50.0, -30.0) < field.water_level);
        assert!(sample(-200.0, 0.0).abs() < 1.0e-3);
    }

    #[test]
    fn open_field_needs_no_setup() {
        assert!(Scenario::Open
            .setup(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0), 5.0)
            .is_empty());
    }
}
