//! Tunable constants grouped the way a TOML override document lays them out.
//!
//! ```toml
//! [grid]
//! cell_size = 5.0
//! iterations_per_step = 200
//!
//! [locomotion.wheels]
//! slope_limit_deg = 25.0
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::locomotion::{LocomotionClass, LocomotionTable, MotionTable};

/// Errors raised while loading or validating a configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not valid TOML or does not match the schema.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value parsed correctly but lies outside its permitted range.
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// Dotted path of the offending field.
        field: String,
        /// Human readable explanation of the constraint.
        reason: &'static str,
    },
}

/// Geometry and budget of the per-mover occupancy grid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Edge length of one grid cell in world units.
    pub cell_size: f32,
    /// Half of the world extent covered by the grid.
    pub half_extent: f32,
    /// Clearance added around every rasterised obstacle.
    pub safety_margin: f32,
    /// Maximum number of pops processed by one search step.
    pub iterations_per_step: u32,
    /// Neighbourhood, in cells, recomputed around an unknown query.
    pub rescan_margin: i32,
    /// Capacity of a reconstructed waypoint path.
    pub max_points: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cell_size: 5.0,
            half_extent: 1600.0,
            safety_margin: 1.5,
            iterations_per_step: 200,
            rescan_margin: 10,
            max_points: 500,
        }
    }
}

impl GridConfig {
    /// Number of cells along one side of the square grid.
    #[must_use]
    pub fn side(&self) -> i32 {
        if self.cell_size <= 0.0 {
            return 0;
        }
        ((self.half_extent * 2.0) / self.cell_size) as i32
    }
}

/// Constants used by the physics integrator.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Height above the floor past which a fall starts being tracked.
    pub min_falling_height: f32,
    /// Damage dealt per unit of height fallen.
    pub fall_damage_fraction: f32,
    /// Divisor applied to the speed of a landed flyer when braking.
    pub landing_speed: f32,
    /// Multiplier applied to stop accelerations while a flyer is landed.
    pub landing_accel: f32,
    /// Distance below the flying ceiling where climbing starts to slow.
    pub ceiling_slowdown: f32,
    /// Seconds a reactor needs on the ground to recharge completely.
    pub reactor_recharge: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            min_falling_height: 20.0,
            fall_damage_fraction: 0.007,
            landing_speed: 3.0,
            landing_accel: 5.0,
            ceiling_slowdown: 40.0,
            reactor_recharge: 5.0,
        }
    }
}

/// Complete simulation configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Occupancy grid parameters.
    pub grid: GridConfig,
    /// Physics constants.
    pub physics: PhysicsConfig,
    /// Per-class locomotion tuning.
    pub locomotion: LocomotionTable,
}

impl Config {
    /// Parses a TOML document layered on top of the defaults and validates it.
    pub fn from_toml_str(document: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(document)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every numeric constraint of the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.grid.cell_size > 0.0) {
            return Err(invalid("grid.cell_size", "must be greater than zero"));
        }
        if !(self.grid.half_extent > 0.0) {
            return Err(invalid("grid.half_extent", "must be greater than zero"));
        }
        if self.grid.safety_margin < 0.0 {
            return Err(invalid("grid.safety_margin", "must not be negative"));
        }
        if self.grid.iterations_per_step == 0 {
            return Err(invalid("grid.iterations_per_step", "must be at least one"));
        }
        if self.grid.rescan_margin < 0 {
            return Err(invalid("grid.rescan_margin", "must not be negative"));
        }
        if self.grid.max_points < 2 {
            return Err(invalid("grid.max_points", "must hold at least two points"));
        }
        if self.physics.reactor_recharge <= 0.0 {
            return Err(invalid("physics.reactor_recharge", "must be greater than zero"));
        }

        for (class, profile) in self.locomotion.iter() {
            validate_table(class, "linear", &profile.linear)?;
            validate_table(class, "circular", &profile.circular)?;
            if !(0.0..=90.0).contains(&profile.slope_limit_deg) {
                return Err(invalid(
                    format!("locomotion.{}.slope_limit_deg", class_key(class)),
                    "must lie between 0 and 90 degrees",
                ));
            }
            if matches!(profile.reactor_range, Some(range) if range <= 0.0) {
                return Err(invalid(
                    format!("locomotion.{}.reactor_range", class_key(class)),
                    "must be greater than zero",
                ));
            }
        }

        Ok(())
    }
}

fn validate_table(
    class: LocomotionClass,
    name: &str,
    table: &MotionTable,
) -> Result<(), ConfigError> {
    let vectors = [
        ("advance_accel", table.advance_accel),
        ("recede_accel", table.recede_accel),
        ("stop_accel", table.stop_accel),
        ("advance_speed", table.advance_speed),
        ("recede_speed", table.recede_speed),
        ("terrain_force", table.terrain_force),
        ("terrain_slide", table.terrain_slide),
    ];
    for (field, value) in vectors {
        if value.min_element() < 0.0 || !value.is_finite() {
            return Err(invalid(
                format!("locomotion.{}.{name}.{field}", class_key(class)),
                "components must be finite and non-negative",
            ));
        }
    }
    Ok(())
}

fn class_key(class: LocomotionClass) -> String {
    format!("{class:?}").to_lowercase()
}

fn invalid(field: impl Into<String>, reason: &'static str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.into(),
        reason,
    }
}
