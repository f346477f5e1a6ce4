#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic movement system that drives every vehicle in the world.
//!
//! The system keeps one physics body per vehicle, runs the active
//! [`GotoTask`] of each body every frame, and reports the resulting poses,
//! damage and finished orders back to the world as commands.

use std::collections::BTreeMap;

use glam::Vec3;
use log::{debug, warn};
use waypoint_core::{
    geometry::world_to_local, Command, Config, CrashSphere, Event, GotoError, GotoOrder,
    GotoOutcome, Movable, ObjectId, ObjectRegistry, TaskStatus, Terrain,
};
use waypoint_system_goto::{GotoTask, Surroundings};
use waypoint_system_navigation::{OccupancyGrid, TerrainRules};
use waypoint_system_physics::{Damage, DamageCause, Impulse, Physics};

/// Crash sphere given to vehicles spawned without one.
const FALLBACK_RADIUS: f32 = 2.0;

/// Pure system that reacts to world events and emits movement commands.
#[derive(Debug)]
pub struct Movement {
    config: Config,
    movers: BTreeMap<ObjectId, Mover>,
}

#[derive(Debug)]
struct Mover {
    body: Physics,
    grid: Option<OccupancyGrid>,
    task: Option<GotoTask>,
}

impl Movement {
    /// Creates a movement system using the provided tuning.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            movers: BTreeMap::new(),
        }
    }

    /// Consumes world events and immutable views to emit movement commands.
    pub fn handle(
        &mut self,
        events: &[Event],
        terrain: &dyn Terrain,
        objects: &dyn ObjectRegistry,
        out: &mut Vec<Command>,
    ) {
        for event in events {
            match event {
                Event::ObjectSpawned { id } => self.spawn(*id, objects),
                Event::ObjectRemoved { id } => {
                    let _ = self.movers.remove(id);
                }
                Event::ObjectMoved { id, to, .. } => self.teleport(*id, *to, objects),
                Event::GotoIssued { id, order } => {
                    self.start(*id, *order, terrain, objects, out);
                }
                Event::GotoAborted { id } => {
                    if let Some(mover) = self.movers.get_mut(id) {
                        if let Some(mut task) = mover.task.take() {
                            task.abort(&mut mover.body);
                        }
                    }
                }
                Event::TimeAdvanced { dt } => {
                    self.frame(dt.as_secs_f32(), terrain, objects, out);
                }
                _ => {}
            }
        }
    }

    /// Physics body of a vehicle.
    #[must_use]
    pub fn body(&self, id: ObjectId) -> Option<&Physics> {
        self.movers.get(&id).map(|mover| &mover.body)
    }

    /// Running movement order of a vehicle.
    #[must_use]
    pub fn task(&self, id: ObjectId) -> Option<&GotoTask> {
        self.movers.get(&id).and_then(|mover| mover.task.as_ref())
    }

    fn spawn(&mut self, id: ObjectId, objects: &dyn ObjectRegistry) {
        let Some(snapshot) = objects.object(id) else {
            return;
        };
        let Some(class) = snapshot.role.locomotion() else {
            return;
        };

        let sphere = snapshot.crash_spheres.first().map_or(
            CrashSphere::new(Vec3::ZERO, FALLBACK_RADIUS),
            |sphere| CrashSphere {
                center: world_to_local(snapshot.heading, sphere.center - snapshot.position),
                ..*sphere
            },
        );
        let body = Physics::new(
            id,
            class,
            self.config.locomotion.get(class).clone(),
            self.config.physics,
            snapshot.position,
            snapshot.heading,
            sphere,
        );
        debug!("{id:?} joins movement as {class:?}");
        let _ = self.movers.insert(
            id,
            Mover {
                body,
                grid: None,
                task: None,
            },
        );
    }

    fn teleport(&mut self, id: ObjectId, to: Vec3, objects: &dyn ObjectRegistry) {
        let Some(mover) = self.movers.get_mut(&id) else {
            return;
        };
        if mover.body.position() == to {
            return;
        }
        let heading = objects
            .object(id)
            .map_or(mover.body.heading(), |snapshot| snapshot.heading);
        mover.body.set_pose(to, heading);
    }

    fn start(
        &mut self,
        id: ObjectId,
        order: GotoOrder,
        terrain: &dyn Terrain,
        objects: &dyn ObjectRegistry,
        out: &mut Vec<Command>,
    ) {
        let Self { config, movers } = self;
        let Some(mover) = movers.get_mut(&id) else {
            out.push(Command::FinishGoto {
                id,
                outcome: GotoOutcome::Failed(GotoError::TargetInvalidated),
            });
            return;
        };
        if let Some(mut previous) = mover.task.take() {
            previous.abort(&mut mover.body);
        }

        let grid = mover.grid.get_or_insert_with(|| {
            OccupancyGrid::new(&config.grid, TerrainRules::from(mover.body.profile()))
        });
        let env = Surroundings { terrain, objects };
        match GotoTask::start(order, config, &mut mover.body, grid, env) {
            Ok(task) => mover.task = Some(task),
            Err(error) => out.push(Command::FinishGoto {
                id,
                outcome: GotoOutcome::Failed(error),
            }),
        }
    }

    fn frame(
        &mut self,
        dt: f32,
        terrain: &dyn Terrain,
        objects: &dyn ObjectRegistry,
        out: &mut Vec<Command>,
    ) {
        let mut impulses: Vec<Impulse> = Vec::new();
        let env = Surroundings { terrain, objects };

        for (id, mover) in &mut self.movers {
            if let (Some(task), Some(grid)) = (mover.task.as_mut(), mover.grid.as_mut()) {
                let outcome = match task.step(dt, &mut mover.body, grid, env) {
                    TaskStatus::Continue => None,
                    TaskStatus::Done => Some(GotoOutcome::Arrived),
                    TaskStatus::Failed(error) => Some(GotoOutcome::Failed(error)),
                };
                if let Some(outcome) = outcome {
                    mover.task = None;
                    out.push(Command::FinishGoto { id: *id, outcome });
                }
            }

            let before = (mover.body.position(), mover.body.heading());
            let result = mover.body.frame(dt, terrain, objects);
            let after = (mover.body.position(), mover.body.heading());
            if result.moved || before != after {
                out.push(Command::SetPose {
                    id: *id,
                    position: after.0,
                    heading: after.1,
                });
            }

            for damage in result.damage {
                let health = objects
                    .object(damage.target)
                    .map_or(0.0, |snapshot| snapshot.health);
                if is_lethal_fall(*id, &damage, health) {
                    warn!("{id:?} destroyed by a fall");
                } else {
                    debug!(
                        "{id:?} deals {} {:?} damage to {:?}",
                        damage.amount, damage.cause, damage.target
                    );
                }
                out.push(Command::DamageObject {
                    id: damage.target,
                    amount: damage.amount,
                });
            }
            impulses.extend(result.impulse);
            for destroyed in result.destroyed {
                out.push(Command::RemoveObject { id: destroyed });
            }
        }

        for impulse in impulses {
            if let Some(target) = self.movers.get_mut(&impulse.target) {
                target.body.apply_impulse(impulse.velocity);
            }
        }
    }
}

fn is_lethal_fall(id: ObjectId, damage: &Damage, health: f32) -> bool {
    damage.cause == DamageCause::Fall && damage.target == id && damage.amount >= health
}

impl Default for Movement {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn damage(target: u32, amount: f32, cause: DamageCause) -> Damage {
        Damage {
            target: ObjectId::new(target),
            amount,
            cause,
        }
    }

    #[test]
    fn only_a_fatal_fall_counts_as_one() {
        let id = ObjectId::new(1);
        assert!(is_lethal_fall(id, &damage(1, 1.0, DamageCause::Fall), 0.5));
        assert!(!is_lethal_fall(id, &damage(1, 0.2, DamageCause::Fall), 0.5));
        assert!(!is_lethal_fall(id, &damage(1, 1.0, DamageCause::Impact), 0.5));
        assert!(!is_lethal_fall(id, &damage(2, 1.0, DamageCause::Fall), 0.5));
    }
}
