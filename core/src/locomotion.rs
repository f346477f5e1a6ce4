//! Locomotion classes and the per-class tuning table.
//!
//! Every movable object belongs to exactly one [`LocomotionClass`]. Slope
//! tolerance, arrival precision, repulsion tuning and the acceleration tables
//! consumed by the physics integrator are looked up in a [`LocomotionTable`]
//! instead of being selected by branching on the object kind.

use std::{collections::BTreeMap, f32::consts::PI};

use glam::Vec3;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

use crate::{CrashMode, GoalMode};

/// Movement category that determines tolerances and acceleration curves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocomotionClass {
    /// Wheeled rover.
    Wheels,
    /// Tracked vehicle.
    Tracks,
    /// Large tracked vehicle used for heavy work.
    HeavyTracks,
    /// Walking vehicle on insect legs.
    Legs,
    /// Jet-propelled flyer.
    Flying,
    /// Tracked vehicle able to drive under water.
    Submersible,
    /// Walking human.
    Walker,
    /// Ground alien such as an ant or a spider.
    Insect,
    /// Flying alien.
    FlyingInsect,
    /// Worm that burrows through everything.
    Burrower,
}

impl LocomotionClass {
    /// Every class in table order.
    pub const ALL: [Self; 10] = [
        Self::Wheels,
        Self::Tracks,
        Self::HeavyTracks,
        Self::Legs,
        Self::Flying,
        Self::Submersible,
        Self::Walker,
        Self::Insect,
        Self::FlyingInsect,
        Self::Burrower,
    ];

    const fn index(self) -> usize {
        match self {
            Self::Wheels => 0,
            Self::Tracks => 1,
            Self::HeavyTracks => 2,
            Self::Legs => 3,
            Self::Flying => 4,
            Self::Submersible => 5,
            Self::Walker => 6,
            Self::Insect => 7,
            Self::FlyingInsect => 8,
            Self::Burrower => 9,
        }
    }
}

/// Acceleration and speed table for one motion kind (linear or circular).
///
/// Each component is expressed per axis. For linear motion `x` is
/// forward/back, `y` is up/down and `z` is lateral. Circular motion only uses
/// `y`, the turn axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionTable {
    /// Acceleration applied while the motor pushes forward.
    pub advance_accel: Vec3,
    /// Acceleration applied while the motor pushes backward.
    pub recede_accel: Vec3,
    /// Deceleration applied while the motor is idle.
    pub stop_accel: Vec3,
    /// Top speed reached with a full forward input.
    pub advance_speed: Vec3,
    /// Top speed reached with a full backward input.
    pub recede_speed: Vec3,
    /// Strength of the slope-induced slide.
    pub terrain_force: Vec3,
    /// Slide speed absorbed before the terrain moves the object.
    pub terrain_slide: Vec3,
}

impl Default for MotionTable {
    fn default() -> Self {
        Self {
            advance_accel: Vec3::ZERO,
            recede_accel: Vec3::ZERO,
            stop_accel: Vec3::ZERO,
            advance_speed: Vec3::ZERO,
            recede_speed: Vec3::ZERO,
            terrain_force: Vec3::ZERO,
            terrain_slide: Vec3::ZERO,
        }
    }
}

impl MotionTable {
    fn linear(advance: f32, recede: f32, advance_accel: f32, stop_accel: f32) -> Self {
        Self {
            advance_accel: Vec3::new(advance_accel, 0.0, 0.0),
            recede_accel: Vec3::new(advance_accel * 0.5, 0.0, 0.0),
            stop_accel: Vec3::new(stop_accel, 0.0, stop_accel),
            advance_speed: Vec3::new(advance, 0.0, 0.0),
            recede_speed: Vec3::new(recede, 0.0, 0.0),
            terrain_force: Vec3::new(30.0, 0.0, 20.0),
            terrain_slide: Vec3::new(1.0, 0.0, 1.0),
        }
    }

    fn with_vertical(mut self, speed: f32, accel: f32, stop: f32) -> Self {
        self.advance_speed.y = speed;
        self.recede_speed.y = speed;
        self.advance_accel.y = accel;
        self.recede_accel.y = stop;
        self.stop_accel.y = stop;
        self
    }

    fn turning(speed: f32, accel: f32, stop: f32) -> Self {
        Self {
            advance_accel: Vec3::new(0.0, accel, 0.0),
            recede_accel: Vec3::new(0.0, accel, 0.0),
            stop_accel: Vec3::new(0.0, stop, 0.0),
            advance_speed: Vec3::new(0.0, speed, 0.0),
            recede_speed: Vec3::new(0.0, speed, 0.0),
            ..Self::default()
        }
    }
}

/// Offsets of the contact points used to tilt an object with the ground.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WheelBase {
    /// Distance from the centre to the front contact.
    pub front: f32,
    /// Distance from the centre to the rear contact.
    pub back: f32,
    /// Distance from the centre to the left contact.
    pub left: f32,
    /// Distance from the centre to the right contact.
    pub right: f32,
}

impl Default for WheelBase {
    fn default() -> Self {
        Self {
            front: 3.0,
            back: 3.0,
            left: 3.0,
            right: 3.0,
        }
    }
}

/// Tuning of the reactive obstacle repulsion used on direct approaches.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepulseTuning {
    /// Margin added around obstacles while landed; braking distance when absent.
    pub landed_margin: Option<f32>,
    /// Margin added around obstacles while airborne; landed margin when absent.
    pub airborne_margin: Option<f32>,
    /// Margin used against objects of the same class, if different.
    pub same_class_margin: Option<f32>,
    /// Falloff exponent of the repulsion strength.
    pub exponent: f32,
}

impl Default for RepulseTuning {
    fn default() -> Self {
        Self {
            landed_margin: None,
            airborne_margin: None,
            same_class_margin: None,
            exponent: 2.0,
        }
    }
}

impl RepulseTuning {
    fn fixed(landed: f32, airborne: f32) -> Self {
        Self {
            landed_margin: Some(landed),
            airborne_margin: Some(airborne),
            same_class_margin: None,
            exponent: 1.5,
        }
    }
}

/// Complete tuning of one locomotion class.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocomotionProfile {
    /// Steepest slope, in degrees, the class can drive on.
    pub slope_limit_deg: f32,
    /// Whether the class can drive under water.
    pub accepts_water: bool,
    /// Whether the class can leave the ground.
    pub flies: bool,
    /// Whether the class uses the lower ceiling of small flyers.
    pub small_flyer: bool,
    /// Whether arrival is checked with a loose tolerance.
    pub approximate_arrival: bool,
    /// Goal mode used when an order asks for the default.
    pub default_goal_mode: GoalMode,
    /// Crash mode used when an order asks for the default.
    pub default_crash_mode: CrashMode,
    /// Whether crash spheres of radius 1.2 or less are ignored.
    pub ignores_small_obstacles: bool,
    /// Whether other movers leave this class out of their repulsion.
    pub ignored_by_others: bool,
    /// Whether the class computes no repulsion at all.
    pub ignores_repulsion: bool,
    /// Repulsion tuning for direct approaches.
    pub repulse: RepulseTuning,
    /// Height of the body origin above the floor.
    pub height: f32,
    /// Contact offsets used to tilt the body.
    pub wheels: WheelBase,
    /// Seconds of powered flight on a full reactor, if the flyer has one.
    pub reactor_range: Option<f32>,
    /// Linear motion table.
    pub linear: MotionTable,
    /// Circular motion table.
    pub circular: MotionTable,
}

impl Default for LocomotionProfile {
    fn default() -> Self {
        Self::preset(LocomotionClass::Wheels)
    }
}

impl LocomotionProfile {
    /// Built-in tuning for a locomotion class.
    #[must_use]
    pub fn preset(class: LocomotionClass) -> Self {
        let ground = Self {
            slope_limit_deg: 20.0,
            accepts_water: false,
            flies: false,
            small_flyer: false,
            approximate_arrival: false,
            default_goal_mode: GoalMode::Stop,
            default_crash_mode: CrashMode::Beam,
            ignores_small_obstacles: false,
            ignored_by_others: false,
            ignores_repulsion: false,
            repulse: RepulseTuning::default(),
            height: 3.0,
            wheels: WheelBase::default(),
            reactor_range: None,
            linear: MotionTable::linear(20.0, 10.0, 40.0, 40.0),
            circular: MotionTable::turning(PI, 3.0, 4.0),
        };

        match class {
            LocomotionClass::Wheels => Self {
                repulse: RepulseTuning::fixed(5.0, 5.0),
                wheels: WheelBase {
                    front: 3.0,
                    back: 4.0,
                    left: 4.0,
                    right: 4.0,
                },
                ..ground
            },
            LocomotionClass::Tracks => Self {
                slope_limit_deg: 35.0,
                repulse: RepulseTuning::fixed(4.0, 4.0),
                linear: MotionTable::linear(15.0, 8.0, 15.0, 40.0),
                circular: MotionTable::turning(PI * 0.5, 5.0, 10.0),
                ..ground
            },
            LocomotionClass::HeavyTracks => Self {
                slope_limit_deg: 35.0,
                approximate_arrival: true,
                height: 4.0,
                linear: MotionTable::linear(10.0, 5.0, 10.0, 30.0),
                circular: MotionTable::turning(PI * 0.4, 4.0, 8.0),
                ..ground
            },
            LocomotionClass::Legs => Self {
                slope_limit_deg: 60.0,
                repulse: RepulseTuning::fixed(4.0, 4.0),
                linear: MotionTable::linear(15.0, 10.0, 15.0, 40.0),
                circular: MotionTable::turning(PI * 0.8, 5.0, 10.0),
                ..ground
            },
            LocomotionClass::Flying => Self {
                slope_limit_deg: 15.0,
                flies: true,
                repulse: RepulseTuning::fixed(5.0, 10.0),
                reactor_range: Some(30.0),
                linear: MotionTable::linear(50.0, 50.0, 20.0, 20.0).with_vertical(60.0, 20.0, 50.0),
                circular: MotionTable::turning(PI, 4.0, 6.0),
                ..ground
            },
            LocomotionClass::Submersible => Self {
                slope_limit_deg: 35.0,
                accepts_water: true,
                linear: MotionTable::linear(15.0, 10.0, 15.0, 40.0),
                circular: MotionTable::turning(PI * 0.5, 5.0, 10.0),
                ..ground
            },
            LocomotionClass::Walker => Self {
                approximate_arrival: true,
                height: 2.0,
                linear: MotionTable::linear(8.0, 4.0, 6.0, 8.0),
                circular: MotionTable::turning(PI * 0.8, 6.0, 6.0),
                ..ground
            },
            LocomotionClass::Insect => Self {
                approximate_arrival: true,
                default_goal_mode: GoalMode::Express,
                default_crash_mode: CrashMode::Halt,
                ignores_small_obstacles: true,
                height: 2.0,
                linear: MotionTable::linear(12.0, 6.0, 15.0, 20.0),
                circular: MotionTable::turning(PI, 6.0, 6.0),
                ..ground
            },
            LocomotionClass::FlyingInsect => Self {
                flies: true,
                small_flyer: true,
                approximate_arrival: true,
                default_crash_mode: CrashMode::Halt,
                ignores_small_obstacles: true,
                repulse: RepulseTuning {
                    same_class_margin: Some(2.0),
                    ..RepulseTuning::fixed(3.0, 5.0)
                },
                height: 1.0,
                linear: MotionTable::linear(30.0, 20.0, 20.0, 30.0).with_vertical(20.0, 10.0, 20.0),
                circular: MotionTable::turning(PI * 1.5, 8.0, 8.0),
                ..ground
            },
            LocomotionClass::Burrower => Self {
                approximate_arrival: true,
                default_goal_mode: GoalMode::Express,
                default_crash_mode: CrashMode::Halt,
                ignores_small_obstacles: true,
                ignored_by_others: true,
                ignores_repulsion: true,
                height: 0.5,
                linear: MotionTable::linear(4.0, 2.0, 4.0, 6.0),
                circular: MotionTable::turning(PI * 0.5, 4.0, 4.0),
                ..ground
            },
        }
    }

    /// Slope limit converted to radians.
    #[must_use]
    pub fn slope_limit(&self) -> f32 {
        self.slope_limit_deg.to_radians()
    }
}

/// Lookup table holding one [`LocomotionProfile`] per class.
///
/// A deserialised table is layered over the presets: classes missing from the
/// document keep their preset, and fields missing from a class table keep the
/// value of that class's preset.
#[derive(Clone, Debug, PartialEq)]
pub struct LocomotionTable {
    profiles: [LocomotionProfile; 10],
}

impl Default for LocomotionTable {
    fn default() -> Self {
        Self {
            profiles: LocomotionClass::ALL.map(LocomotionProfile::preset),
        }
    }
}

impl LocomotionTable {
    /// Profile of the provided class.
    #[must_use]
    pub fn get(&self, class: LocomotionClass) -> &LocomotionProfile {
        &self.profiles[class.index()]
    }

    /// Replaces the profile of a class.
    pub fn set(&mut self, class: LocomotionClass, profile: LocomotionProfile) {
        self.profiles[class.index()] = profile;
    }

    /// Iterates over every class and its profile.
    pub fn iter(&self) -> impl Iterator<Item = (LocomotionClass, &LocomotionProfile)> {
        LocomotionClass::ALL
            .into_iter()
            .map(move |class| (class, self.get(class)))
    }
}

impl Serialize for LocomotionTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl<'de> Deserialize<'de> for LocomotionTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let overrides = BTreeMap::<LocomotionClass, toml::Table>::deserialize(deserializer)?;
        let mut table = Self::default();
        for (class, fields) in overrides {
            let toml::Value::Table(mut merged) =
                toml::Value::try_from(table.get(class)).map_err(D::Error::custom)?
            else {
                return Err(D::Error::custom("locomotion profile is not a table"));
            };
            merge(&mut merged, fields);
            let profile: LocomotionProfile = toml::Value::Table(merged)
                .try_into()
                .map_err(D::Error::custom)?;
            table.set(class, profile);
        }
        Ok(table)
    }
}

fn merge(base: &mut toml::Table, overrides: toml::Table) {
    for (key, value) in overrides {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(nested)) => {
                merge(existing, nested);
            }
            (_, value) => {
                let _ = base.insert(key, value);
            }
        }
    }
}
