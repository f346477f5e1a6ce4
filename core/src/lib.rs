#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the waypoint navigation engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems query immutable snapshots through the
//! [`Terrain`] and [`ObjectRegistry`] traits and drive movers through the
//! [`Movable`] trait, responding exclusively with new command batches.

pub mod config;
pub mod geometry;
pub mod locomotion;

use std::time::Duration;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use config::{Config, ConfigError, GridConfig, PhysicsConfig};
pub use locomotion::{LocomotionClass, LocomotionProfile, LocomotionTable, MotionTable};

/// Distance kept between a mover and an object it approaches to pick up.
pub const TAKE_DIST: f32 = 6.0;

/// Goals farther than this make a grounded flyer take off.
pub const FLY_DIST_GROUND: f32 = 80.0;

/// Cruise altitude used by flyers that were not given one.
pub const FLY_DEF_HEIGHT: f32 = 50.0;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Replaces the terrain height field.
    ConfigureTerrain {
        /// Description of the new terrain.
        field: TerrainSpec,
    },
    /// Creates a new object in the world.
    SpawnObject {
        /// Description of the object to create.
        spec: ObjectSpec,
    },
    /// Deletes an object from the world.
    RemoveObject {
        /// Identifier of the object to delete.
        id: ObjectId,
    },
    /// Moves an object to a new pose.
    SetPose {
        /// Identifier of the object being moved.
        id: ObjectId,
        /// New world position.
        position: Vec3,
        /// New heading around the vertical axis.
        heading: f32,
    },
    /// Issues a movement order to a mover.
    IssueGoto {
        /// Identifier of the mover receiving the order.
        id: ObjectId,
        /// Order to execute.
        order: GotoOrder,
    },
    /// Cancels the active movement order of a mover.
    AbortGoto {
        /// Identifier of the mover whose order is cancelled.
        id: ObjectId,
    },
    /// Records the end of a movement order.
    FinishGoto {
        /// Identifier of the mover that finished.
        id: ObjectId,
        /// How the order ended.
        outcome: GotoOutcome,
    },
    /// Deals damage to an object.
    DamageObject {
        /// Identifier of the damaged object.
        id: ObjectId,
        /// Health removed from the object.
        amount: f32,
    },
    /// Freezes or resumes the simulation clock.
    SetPaused {
        /// Whether the clock should be frozen.
        paused: bool,
    },
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that an object was created.
    ObjectSpawned {
        /// Identifier assigned to the new object.
        id: ObjectId,
    },
    /// Confirms that an object was deleted.
    ObjectRemoved {
        /// Identifier of the deleted object.
        id: ObjectId,
    },
    /// Confirms that an object changed pose.
    ObjectMoved {
        /// Identifier of the moved object.
        id: ObjectId,
        /// Position held before the move.
        from: Vec3,
        /// Position held after the move.
        to: Vec3,
    },
    /// Confirms that a mover accepted a movement order.
    GotoIssued {
        /// Identifier of the mover.
        id: ObjectId,
        /// Accepted order.
        order: GotoOrder,
    },
    /// Reports that a movement order could not be accepted.
    GotoRejected {
        /// Identifier named by the order.
        id: ObjectId,
        /// Reason for the rejection.
        error: GotoError,
    },
    /// Confirms that a movement order was cancelled.
    GotoAborted {
        /// Identifier of the mover.
        id: ObjectId,
    },
    /// Reports that a movement order ended.
    GotoFinished {
        /// Identifier of the mover.
        id: ObjectId,
        /// How the order ended.
        outcome: GotoOutcome,
    },
    /// Reports the health left after damage was applied.
    ObjectDamaged {
        /// Identifier of the damaged object.
        id: ObjectId,
        /// Remaining health.
        health: f32,
    },
    /// Announces that the clock was frozen or resumed.
    PauseChanged {
        /// Whether the clock is now frozen.
        paused: bool,
    },
}

/// Unique identifier assigned to an object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(u32);

impl ObjectId {
    /// Creates a new object identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Sphere attached to an object for coarse obstacle and collision tests.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CrashSphere {
    /// Centre of the sphere. Relative to the object in an [`ObjectSpec`],
    /// absolute in an [`ObjectSnapshot`].
    pub center: Vec3,
    /// Radius of the sphere.
    pub radius: f32,
    /// Scale applied to the impact force when something bounces off it.
    pub hardness: f32,
}

impl CrashSphere {
    /// Creates a sphere with unit hardness.
    #[must_use]
    pub const fn new(center: Vec3, radius: f32) -> Self {
        Self {
            center,
            radius,
            hardness: 1.0,
        }
    }

    /// Returns the sphere with a different hardness.
    #[must_use]
    pub const fn with_hardness(mut self, hardness: f32) -> Self {
        self.hardness = hardness;
        self
    }
}

/// Docking point of a building, expressed in the building's local frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HotPoint {
    /// Offset of the docking point from the building origin.
    pub offset: Vec3,
    /// Extra clearance added when a mover docks to take something.
    pub supplement: f32,
}

/// Gameplay role of an object, replacing per-type branching.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ObjectRole {
    /// Self-propelled mover of the given class.
    Vehicle(LocomotionClass),
    /// Item that movers pick up from any side.
    Cargo,
    /// Landing base approached from any side with a wider goal radius.
    Station,
    /// Static structure, optionally with a docking point.
    Building {
        /// Docking point, if the building offers one.
        hot_point: Option<HotPoint>,
    },
    /// Building that movers back out of instead of turning away from.
    Factory,
    /// Object destroyed by any impact.
    Explosive,
    /// Decorative obstacle that never takes damage.
    Scenery,
}

impl ObjectRole {
    /// Locomotion class of a vehicle.
    #[must_use]
    pub const fn locomotion(&self) -> Option<LocomotionClass> {
        match self {
            Self::Vehicle(class) => Some(*class),
            _ => None,
        }
    }

    /// Reports whether the role is a structure that takes building damage.
    #[must_use]
    pub const fn is_building(&self) -> bool {
        matches!(self, Self::Building { .. } | Self::Factory | Self::Station)
    }
}

/// Description of an object to spawn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectSpec {
    /// Gameplay role of the object.
    pub role: ObjectRole,
    /// Initial world position.
    pub position: Vec3,
    /// Initial heading around the vertical axis.
    pub heading: f32,
    /// Crash spheres relative to the object origin.
    pub crash_spheres: Vec<CrashSphere>,
    /// Initial health; damage removes the object when it reaches zero.
    pub health: f32,
}

impl ObjectSpec {
    /// Creates a spec with full health and a single crash sphere at the origin.
    #[must_use]
    pub fn new(role: ObjectRole, position: Vec3, radius: f32) -> Self {
        Self {
            role,
            position,
            heading: 0.0,
            crash_spheres: vec![CrashSphere::new(Vec3::ZERO, radius)],
            health: 1.0,
        }
    }

    /// Returns the spec with a different heading.
    #[must_use]
    pub fn with_heading(mut self, heading: f32) -> Self {
        self.heading = heading;
        self
    }
}

/// Immutable representation of a single object used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectSnapshot {
    /// Unique identifier assigned to the object.
    pub id: ObjectId,
    /// Gameplay role of the object.
    pub role: ObjectRole,
    /// World position of the object origin.
    pub position: Vec3,
    /// Heading around the vertical axis.
    pub heading: f32,
    /// Crash spheres in world coordinates.
    pub crash_spheres: Vec<CrashSphere>,
    /// Remaining health.
    pub health: f32,
    /// Whether the object takes part in the simulation.
    pub active: bool,
    /// Whether sensors and obstacle scans can see the object.
    pub detectable: bool,
    /// Whether the object is being carried by another object.
    pub transported: bool,
}

/// Description of a sampled terrain height field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TerrainSpec {
    /// Number of samples along the x axis.
    pub columns: u32,
    /// Number of samples along the z axis.
    pub rows: u32,
    /// Distance between neighbouring samples.
    pub spacing: f32,
    /// Heights in row-major order, `rows * columns` entries.
    pub heights: Vec<f32>,
    /// Height of the water surface.
    pub water_level: f32,
    /// Absolute ceiling no flyer may exceed.
    pub flying_max_height: f32,
}

impl TerrainSpec {
    /// Flat terrain centred on the origin.
    #[must_use]
    pub fn flat(columns: u32, rows: u32, spacing: f32, height: f32) -> Self {
        let count = usize::try_from(columns)
            .unwrap_or(0)
            .saturating_mul(usize::try_from(rows).unwrap_or(0));
        Self {
            columns,
            rows,
            spacing,
            heights: vec![height; count],
            water_level: -100.0,
            flying_max_height: 280.0,
        }
    }
}

/// Arrival behaviour requested by an order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalMode {
    /// Resolve from the mover's locomotion profile.
    Default,
    /// Decelerate and stop on the goal.
    Stop,
    /// Drive through the goal without braking.
    Express,
}

/// Reaction to collisions on direct approaches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrashMode {
    /// Resolve from the mover's locomotion profile.
    Default,
    /// Fail the order on the first collision.
    Halt,
    /// Always sidestep to the right.
    Right,
    /// Always sidestep to the left.
    Left,
    /// Try right first, then left.
    RightLeft,
    /// Try left first, then right.
    LeftRight,
    /// Plan around obstacles with the grid search.
    Beam,
}

/// Movement order addressed to a mover.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GotoOrder {
    /// World position to reach.
    pub goal: Vec3,
    /// Cruise height above the floor for flyers, zero to stay on the ground.
    pub altitude: f32,
    /// Arrival behaviour.
    pub goal_mode: GoalMode,
    /// Collision behaviour.
    pub crash_mode: CrashMode,
}

impl GotoOrder {
    /// Order to reach `goal` with default modes and no altitude.
    #[must_use]
    pub const fn to(goal: Vec3) -> Self {
        Self {
            goal,
            altitude: 0.0,
            goal_mode: GoalMode::Default,
            crash_mode: CrashMode::Default,
        }
    }

    /// Returns the order with a cruise altitude.
    #[must_use]
    pub const fn with_altitude(mut self, altitude: f32) -> Self {
        self.altitude = altitude;
        self
    }

    /// Returns the order with an explicit goal mode.
    #[must_use]
    pub const fn with_goal_mode(mut self, goal_mode: GoalMode) -> Self {
        self.goal_mode = goal_mode;
        self
    }

    /// Returns the order with an explicit crash mode.
    #[must_use]
    pub const fn with_crash_mode(mut self, crash_mode: CrashMode) -> Self {
        self.crash_mode = crash_mode;
        self
    }
}

/// Reasons a movement order can fail.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GotoError {
    /// The search drained its queue without reaching the mover.
    #[error("goal is unreachable")]
    Unreachable,
    /// Path reconstruction found no improving neighbour.
    #[error("path search bookkeeping is inconsistent")]
    SearchInconsistency,
    /// The goal cell is already blocked.
    #[error("goal position is occupied")]
    Busy,
    /// The mover or its target object no longer exists.
    #[error("target object disappeared")]
    TargetInvalidated,
    /// A collision stopped a mover that must not sidestep.
    #[error("movement halted by a collision")]
    Halted,
}

/// Final state of a movement order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GotoOutcome {
    /// The mover reached its goal.
    Arrived,
    /// The order failed.
    Failed(GotoError),
    /// The order was cancelled.
    Aborted,
}

/// Result of one bounded step of the path search.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SearchStatus {
    /// The iteration budget ran out; call again next frame.
    Continue,
    /// A path was reconstructed.
    Found,
    /// The queue drained without reaching the start.
    Unreachable,
    /// Reconstruction failed to find an improving neighbour.
    Inconsistent,
}

/// Result of one frame of a movement task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    /// The task is still running.
    Continue,
    /// The task reached its goal.
    Done,
    /// The task stopped without reaching its goal.
    Failed(GotoError),
}

/// Read access to the terrain collaborator.
pub trait Terrain {
    /// Height of the floor below the planar position.
    fn floor_level(&self, position: Vec3) -> f32;

    /// Steepest slope angle, in radians, around the planar position.
    fn fine_slope(&self, position: Vec3) -> f32;

    /// Upward surface normal at the planar position.
    fn normal(&self, position: Vec3) -> Vec3;

    /// Height of the water surface.
    fn water_level(&self) -> f32;

    /// Absolute height a flyer may reach above the position.
    fn flying_limit(&self, position: Vec3, small_flyer: bool) -> f32;

    /// Absolute ceiling shared by all flyers.
    fn flying_max_height(&self) -> f32;

    /// Distance from the position down to the floor.
    fn height_to_floor(&self, position: Vec3) -> f32 {
        position.y - self.floor_level(position)
    }

    /// Scale applied to terrain slide, lower on paved ground.
    fn building_factor(&self, _position: Vec3) -> f32 {
        1.0
    }

    /// Clamps a position to the playable area.
    fn clamp_to_bounds(&self, position: Vec3) -> Vec3 {
        position
    }
}

/// Read access to every object in the world.
pub trait ObjectRegistry {
    /// Snapshots of every object in identifier order.
    fn objects(&self) -> &[ObjectSnapshot];

    /// Snapshot of a single object.
    fn object(&self, id: ObjectId) -> Option<&ObjectSnapshot> {
        self.objects()
            .binary_search_by_key(&id, |snapshot| snapshot.id)
            .ok()
            .and_then(|index| self.objects().get(index))
    }
}

/// Control surface of a self-propelled object.
///
/// Motor speeds are expressed per axis in `[-1, 1]`: `x` drives forward and
/// backward, `y` climbs and descends, `z` turns.
pub trait Movable {
    /// Identifier of the mover.
    fn id(&self) -> ObjectId;

    /// Locomotion tuning of the mover.
    fn profile(&self) -> &LocomotionProfile;

    /// Locomotion class of the mover.
    fn class(&self) -> LocomotionClass;

    /// Current world position.
    fn position(&self) -> Vec3;

    /// Current heading.
    fn heading(&self) -> f32;

    /// Main crash sphere, relative to the body origin and heading.
    fn crash_sphere(&self) -> CrashSphere;

    /// Radius of the mover's main crash sphere.
    fn radius(&self) -> f32 {
        self.crash_sphere().radius
    }

    /// Requested motor speeds.
    fn motor_speed(&self) -> Vec3;

    /// Replaces every requested motor speed.
    fn set_motor_speed(&mut self, speed: Vec3);

    /// Replaces the forward motor speed.
    fn set_motor_speed_x(&mut self, x: f32) {
        let mut speed = self.motor_speed();
        speed.x = x;
        self.set_motor_speed(speed);
    }

    /// Replaces the vertical motor speed.
    fn set_motor_speed_y(&mut self, y: f32) {
        let mut speed = self.motor_speed();
        speed.y = y;
        self.set_motor_speed(speed);
    }

    /// Replaces the turning motor speed.
    fn set_motor_speed_z(&mut self, z: f32) {
        let mut speed = self.motor_speed();
        speed.z = z;
        self.set_motor_speed(speed);
    }

    /// Linear speed actually applied in the mover's frame, slide included.
    fn linear_real_speed(&self) -> Vec3;

    /// Whether the mover rests on the ground.
    fn is_landed(&self) -> bool;

    /// Whether the mover is under water.
    fn is_swimming(&self) -> bool;

    /// Whether a collision happened since the flag was last cleared.
    fn collided(&self) -> bool;

    /// Overrides the collision flag.
    fn set_collided(&mut self, collided: bool);

    /// Reactor charge in `[0, 1]`, absent for movers without a reactor.
    fn reactor_charge(&self) -> Option<f32>;

    /// Distance needed to brake from full forward speed.
    fn lin_stop_length(&self) -> f32;

    /// Time needed to cover `distance` from rest, signed by direction.
    fn lin_time_length(&self, distance: f32) -> f32;

    /// Motor distance to request so the mover stops after `distance`.
    ///
    /// The result is a magnitude whatever the sign of `distance`.
    fn lin_length(&self, distance: f32) -> f32;
}
