//! Per-axis speed model shared by linear and circular motion.

use glam::Vec3;
use waypoint_core::MotionTable;

/// Speed state of one motion kind.
///
/// `current_speed` follows the motor target at the selected acceleration;
/// `real_speed` adds the terrain slide that exceeds the slide threshold.
#[derive(Clone, Debug, PartialEq)]
pub struct Motion {
    table: MotionTable,
    /// Acceleration selected for this frame.
    pub motor_accel: Vec3,
    /// Speed the motor is driving towards.
    pub motor_speed: Vec3,
    /// Speed produced by the motor.
    pub current_speed: Vec3,
    /// Speed actually applied, motor and slide combined.
    pub real_speed: Vec3,
    /// Slide imposed by the terrain slope.
    pub terrain_speed: Vec3,
}

impl Motion {
    /// Creates a motion at rest.
    #[must_use]
    pub fn new(table: MotionTable) -> Self {
        Self {
            table,
            motor_accel: Vec3::ZERO,
            motor_speed: Vec3::ZERO,
            current_speed: Vec3::ZERO,
            real_speed: Vec3::ZERO,
            terrain_speed: Vec3::ZERO,
        }
    }

    /// Tuning table of the motion.
    #[must_use]
    pub const fn table(&self) -> &MotionTable {
        &self.table
    }

    /// Selects the target speed and acceleration of one axis from a motor
    /// input in `[-1, 1]`.
    pub fn drive(&mut self, axis: usize, input: f32) {
        let (accel, speed) = if input > 0.0 {
            (self.table.advance_accel[axis], self.table.advance_speed[axis] * input)
        } else if input < 0.0 {
            (self.table.recede_accel[axis], self.table.recede_speed[axis] * input)
        } else {
            (self.table.stop_accel[axis], 0.0)
        };
        self.motor_accel[axis] = accel;
        self.motor_speed[axis] = speed;
    }

    /// Integrates one frame.
    ///
    /// The `x` and `z` targets are scaled by `inclination`, `y` is not.
    pub fn update(&mut self, dt: f32, inclination: f32) {
        for axis in 0..3 {
            let scale = if axis == 1 { 1.0 } else { inclination };
            let target = self.motor_speed[axis] * scale;
            let speed = approach(self.current_speed[axis], target, dt * self.motor_accel[axis]);
            self.current_speed[axis] = speed;
            self.real_speed[axis] = speed;

            let slide = self.terrain_speed[axis];
            let threshold = self.table.terrain_slide[axis];
            if slide.abs() > threshold {
                self.real_speed[axis] += slide - threshold.copysign(slide);
            }
        }
    }
}

fn approach(speed: f32, target: f32, step: f32) -> f32 {
    if speed < target {
        (speed + step).min(target)
    } else if speed > target {
        (speed - step).max(target)
    } else {
        speed
    }
}
