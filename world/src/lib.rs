#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for the waypoint navigation engine.

mod terrain;

use std::{collections::BTreeMap, time::Duration};

use glam::Vec3;
use log::{debug, warn};
use waypoint_core::{
    geometry::{local_to_world, norm_angle},
    Command, CrashSphere, Event, GotoError, GotoOrder, ObjectId, ObjectRegistry, ObjectSnapshot,
    ObjectSpec, Terrain,
};

pub use terrain::{HeightField, TerrainError};

const DEFAULT_SAMPLES: usize = 129;
const DEFAULT_SPACING: f32 = 5.0;

/// Represents the authoritative world state.
#[derive(Debug)]
pub struct World {
    terrain: HeightField,
    objects: Vec<ObjectSnapshot>,
    shapes: Vec<Vec<CrashSphere>>,
    orders: BTreeMap<ObjectId, GotoOrder>,
    next_id: u32,
    paused: bool,
    elapsed: Duration,
    tick_index: u64,
}

impl World {
    /// Creates an empty world on flat ground.
    #[must_use]
    pub fn new() -> Self {
        Self {
            terrain: HeightField::level(DEFAULT_SAMPLES, DEFAULT_SPACING),
            objects: Vec::new(),
            shapes: Vec::new(),
            orders: BTreeMap::new(),
            next_id: 1,
            paused: false,
            elapsed: Duration::ZERO,
            tick_index: 0,
        }
    }

    fn index(&self, id: ObjectId) -> Option<usize> {
        self.objects
            .binary_search_by_key(&id, |snapshot| snapshot.id)
            .ok()
    }

    fn spawn(&mut self, spec: ObjectSpec) -> ObjectId {
        let id = ObjectId::new(self.next_id);
        self.next_id += 1;
        let heading = norm_angle(spec.heading);
        self.objects.push(ObjectSnapshot {
            id,
            role: spec.role,
            position: spec.position,
            heading,
            crash_spheres: place(&spec.crash_spheres, spec.position, heading),
            health: spec.health,
            active: true,
            detectable: true,
            transported: false,
        });
        self.shapes.push(spec.crash_spheres);
        id
    }

    fn remove(&mut self, id: ObjectId, out_events: &mut Vec<Event>) {
        let Some(index) = self.index(id) else {
            return;
        };
        let _ = self.objects.remove(index);
        let _ = self.shapes.remove(index);
        let _ = self.orders.remove(&id);
        out_events.push(Event::ObjectRemoved { id });
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl Terrain for World {
    fn floor_level(&self, position: Vec3) -> f32 {
        self.terrain.floor_level(position)
    }

    fn fine_slope(&self, position: Vec3) -> f32 {
        self.terrain.fine_slope(position)
    }

    fn normal(&self, position: Vec3) -> Vec3 {
        self.terrain.normal(position)
    }

    fn water_level(&self) -> f32 {
        self.terrain.water_level()
    }

    fn flying_limit(&self, position: Vec3, small_flyer: bool) -> f32 {
        self.terrain.flying_limit(position, small_flyer)
    }

    fn flying_max_height(&self) -> f32 {
        self.terrain.flying_max_height()
    }

    fn clamp_to_bounds(&self, position: Vec3) -> Vec3 {
        self.terrain.clamp_to_bounds(position)
    }
}

impl ObjectRegistry for World {
    fn objects(&self) -> &[ObjectSnapshot] {
        &self.objects
    }
}

fn place(spheres: &[CrashSphere], position: Vec3, heading: f32) -> Vec<CrashSphere> {
    spheres
        .iter()
        .map(|sphere| CrashSphere {
            center: position + local_to_world(heading, sphere.center),
            ..*sphere
        })
        .collect()
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureTerrain { field } => match HeightField::new(field) {
            Ok(terrain) => world.terrain = terrain,
            Err(error) => warn!("terrain rejected: {error}"),
        },
        Command::SpawnObject { spec } => {
            let id = world.spawn(spec);
            out_events.push(Event::ObjectSpawned { id });
        }
        Command::RemoveObject { id } => world.remove(id, out_events),
        Command::SetPose {
            id,
            position,
            heading,
        } => {
            let Some(index) = world.index(id) else {
                return;
            };
            let heading = norm_angle(heading);
            let object = &mut world.objects[index];
            let from = object.position;
            object.position = position;
            object.heading = heading;
            object.crash_spheres = place(&world.shapes[index], position, heading);
            out_events.push(Event::ObjectMoved {
                id,
                from,
                to: position,
            });
        }
        Command::IssueGoto { id, order } => {
            let movable = world
                .index(id)
                .map_or(false, |index| world.objects[index].role.locomotion().is_some());
            if !movable {
                debug!("goto for {id:?} rejected, no such mover");
                out_events.push(Event::GotoRejected {
                    id,
                    error: GotoError::TargetInvalidated,
                });
                return;
            }
            let _ = world.orders.insert(id, order);
            out_events.push(Event::GotoIssued { id, order });
        }
        Command::AbortGoto { id } => {
            if world.orders.remove(&id).is_some() {
                out_events.push(Event::GotoAborted { id });
            }
        }
        Command::FinishGoto { id, outcome } => {
            if world.orders.remove(&id).is_some() {
                out_events.push(Event::GotoFinished { id, outcome });
            }
        }
        Command::DamageObject { id, amount } => {
            let Some(index) = world.index(id) else {
                return;
            };
            let object = &mut world.objects[index];
            object.health = (object.health - amount).max(0.0);
            let health = object.health;
            out_events.push(Event::ObjectDamaged { id, health });
            if health <= 0.0 {
                debug!("{id:?} destroyed");
                world.remove(id, out_events);
            }
        }
        Command::SetPaused { paused } => {
            world.paused = paused;
            out_events.push(Event::PauseChanged { paused });
        }
        Command::Tick { dt } => {
            if world.paused {
                return;
            }
            world.tick_index = world.tick_index.saturating_add(1);
            world.elapsed = world.elapsed.saturating_add(dt);
            out_events.push(Event::TimeAdvanced { dt });
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use super::{HeightField, World};
    use waypoint_core::{GotoOrder, ObjectId, ObjectRegistry, ObjectSnapshot};

    /// Provides read-only access to the terrain.
    #[must_use]
    pub fn terrain(world: &World) -> &HeightField {
        &world.terrain
    }

    /// Snapshots of every object, sorted by identifier.
    #[must_use]
    pub fn objects(world: &World) -> &[ObjectSnapshot] {
        &world.objects
    }

    /// Snapshot of a single object.
    #[must_use]
    pub fn object(world: &World, id: ObjectId) -> Option<&ObjectSnapshot> {
        ObjectRegistry::object(world, id)
    }

    /// Order currently assigned to a mover.
    #[must_use]
    pub fn active_order(world: &World, id: ObjectId) -> Option<GotoOrder> {
        world.orders.get(&id).copied()
    }

    /// Reports whether the clock is frozen.
    #[must_use]
    pub fn is_paused(world: &World) -> bool {
        world.paused
    }

    /// Simulated time accumulated by unpaused ticks.
    #[must_use]
    pub fn elapsed(world: &World) -> Duration {
        world.elapsed
    }

    /// Number of unpaused ticks applied so far.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_core::{GotoOutcome, LocomotionClass, ObjectRole, TerrainSpec};

    fn spawn(world: &mut World, spec: ObjectSpec) -> ObjectId {
        let mut events = Vec::new();
        apply(world, Command::SpawnObject { spec }, &mut events);
        match events.as_slice() {
            [Event::ObjectSpawned { id }] => *id,
            other => panic!("unexpected events {other:?}"),
        }
    }

    fn rover(position: Vec3) -> ObjectSpec {
        ObjectSpec::new(ObjectRole::Vehicle(LocomotionClass::Wheels), position, 2.0)
    }

    #[test]
    fn spawned_objects_get_increasing_identifiers() {
        let mut world = World::new();
        let first = spawn(&mut world, rover(Vec3::ZERO));
        let second = spawn(&mut world, ObjectSpec::new(ObjectRole::Cargo, Vec3::X, 1.0));
        assert!(first < second);
        assert_eq!(query::objects(&world).len(), 2);
        assert_eq!(
            query::object(&world, second).map(|o| o.role),
            Some(ObjectRole::Cargo)
        );
    }

    #[test]
    fn set_pose_moves_crash_spheres_with_the_object() {
        let mut world = World::new();
        let mut spec = rover(Vec3::ZERO);
        spec.crash_spheres = vec![CrashSphere::new(Vec3::new(2.0, 1.0, 0.0), 1.0)];
        let id = spawn(&mut world, spec);

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SetPose {
                id,
                position: Vec3::new(10.0, 0.0, 10.0),
                heading: std::f32::consts::FRAC_PI_2,
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::ObjectMoved {
                id,
                from: Vec3::ZERO,
                to: Vec3::new(10.0, 0.0, 10.0),
            }]
        );
        let sphere = query::object(&world, id).expect("object").crash_spheres[0];
        assert!((sphere.center - Vec3::new(10.0, 1.0, 8.0)).length() < 1.0e-4);
    }

    #[test]
    fn goto_for_missing_or_static_objects_is_rejected() {
        let mut world = World::new();
        let cargo = spawn(&mut world, ObjectSpec::new(ObjectRole::Cargo, Vec3::ZERO, 1.0));
        let order = GotoOrder::to(Vec3::new(5.0, 0.0, 0.0));

        for id in [cargo, ObjectId::new(99)] {
            let mut events = Vec::new();
            apply(&mut world, Command::IssueGoto { id, order }, &mut events);
            assert_eq!(
                events,
                vec![Event::GotoRejected {
                    id,
                    error: GotoError::TargetInvalidated
                }]
            );
        }
    }

    #[test]
    fn finishing_an_order_clears_it_once() {
        let mut world = World::new();
        let id = spawn(&mut world, rover(Vec3::ZERO));
        let order = GotoOrder::to(Vec3::new(5.0, 0.0, 0.0));
        let mut events = Vec::new();
        apply(&mut world, Command::IssueGoto { id, order }, &mut events);
        assert_eq!(query::active_order(&world, id), Some(order));

        events.clear();
        let finish = Command::FinishGoto {
            id,
            outcome: GotoOutcome::Arrived,
        };
        apply(&mut world, finish.clone(), &mut events);
        apply(&mut world, finish, &mut events);
        assert_eq!(
            events,
            vec![Event::GotoFinished {
                id,
                outcome: GotoOutcome::Arrived
            }]
        );
        assert_eq!(query::active_order(&world, id), None);
    }

    #[test]
    fn lethal_damage_removes_the_object() {
        let mut world = World::new();
        let id = spawn(&mut world, rover(Vec3::ZERO));
        let mut events = Vec::new();
        apply(&mut world, Command::DamageObject { id, amount: 0.25 }, &mut events);
        apply(&mut world, Command::DamageObject { id, amount: 1.0 }, &mut events);
        assert_eq!(
            events,
            vec![
                Event::ObjectDamaged { id, health: 0.75 },
                Event::ObjectDamaged { id, health: 0.0 },
                Event::ObjectRemoved { id },
            ]
        );
        assert!(query::objects(&world).is_empty());
    }

    #[test]
    fn paused_ticks_do_not_advance_time() {
        let mut world = World::new();
        let mut events = Vec::new();
        let dt = Duration::from_millis(20);
        apply(&mut world, Command::Tick { dt }, &mut events);
        apply(&mut world, Command::SetPaused { paused: true }, &mut events);
        apply(&mut world, Command::Tick { dt }, &mut events);
        assert_eq!(
            events,
            vec![
                Event::TimeAdvanced { dt },
                Event::PauseChanged { paused: true },
            ]
        );
        assert_eq!(query::elapsed(&world), dt);
        assert_eq!(query::tick_index(&world), 1);
        assert!(query::is_paused(&world));
    }

    #[test]
    fn rejected_terrain_keeps_the_previous_field() {
        let mut world = World::new();
        let before = query::terrain(&world).clone();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::ConfigureTerrain {
                field: TerrainSpec::flat(1, 1, 5.0, 3.0),
            },
            &mut events,
        );
        assert_eq!(query::terrain(&world), &before);
        assert!(events.is_empty());

        apply(
            &mut world,
            Command::ConfigureTerrain {
                field: TerrainSpec::flat(3, 3, 5.0, 3.0),
            },
            &mut events,
        );
        assert_eq!(world.floor_level(Vec3::ZERO), 3.0);
    }
}
