//! Rigid mover integrated one frame at a time against terrain and objects.

use std::f32::consts::{FRAC_PI_2, PI};

use glam::{Vec2, Vec3};
use log::{debug, trace};
use waypoint_core::{
    geometry::{forward, local_to_world, norm_angle, rotate_angle, world_to_local},
    CrashSphere, LocomotionClass, LocomotionProfile, Movable, ObjectId, ObjectRegistry,
    ObjectRole, ObjectSnapshot, PhysicsConfig, Terrain,
};

use crate::motion::Motion;

const SLOPE_SLIDE: f32 = 0.9;
const SLIDE_OVERFLOW: f32 = 50.0;
const SLIDE_RESET: f32 = 20.0;
const STEEP_NORMAL: f32 = 35.0 * PI / 180.0;
const HOVER_HEIGHT: f32 = 4.0;
const LEVEL_RATE: f32 = 0.5;
const SMALL_SPHERE: f32 = 1.2;
const IMPACT_FORCE: f32 = 25.0;
const REPEAT_FORCE_CAP: f32 = 20.0;
const REPEAT_CAP: u32 = 10;
const TAKEOFF_NUDGE: f32 = 0.05;
const LOW_REACTOR: f32 = 0.1;

/// What removed the health.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DamageCause {
    /// Landing after a fall.
    Fall,
    /// Hitting, or being hit by, a crash sphere.
    Impact,
}

/// Health removed from an object during a frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Damage {
    /// Damaged object.
    pub target: ObjectId,
    /// Health removed.
    pub amount: f32,
    /// Source of the damage.
    pub cause: DamageCause,
}

/// Scale of the cosmetic shake drawn on top of the pose.
///
/// Zero keeps the body still, one is the full shake.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vibration {
    /// Positional shake.
    pub linear: f32,
    /// Rotational shake.
    pub circular: f32,
}

impl Vibration {
    const FULL: Self = Self::uniform(1.0);
    const NONE: Self = Self::uniform(0.0);

    const fn uniform(factor: f32) -> Self {
        Self {
            linear: factor,
            circular: factor,
        }
    }
}

/// Velocity a collision transfers to the mover that was hit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Impulse {
    /// Mover that was hit.
    pub target: ObjectId,
    /// World-space velocity to apply.
    pub velocity: Vec3,
}

/// Side effects of one integrated frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameOutcome {
    /// Whether the body position changed.
    pub moved: bool,
    /// Damage dealt by impacts and falls.
    pub damage: Vec<Damage>,
    /// Bounce handed to another mover.
    pub impulse: Option<Impulse>,
    /// Objects destroyed outright, the body itself included.
    pub destroyed: Vec<ObjectId>,
}

enum Contact {
    Free,
    Blocked,
    Destroyed,
}

/// Physical state of a single mover.
///
/// The body owns its pose between frames. Motor inputs are set through
/// [`Movable`] and turned into speeds by [`Physics::frame`].
#[derive(Clone, Debug)]
pub struct Physics {
    id: ObjectId,
    class: LocomotionClass,
    profile: LocomotionProfile,
    config: PhysicsConfig,
    position: Vec3,
    /// Roll around `x`, heading around `y`, pitch around `z`.
    angle: Vec3,
    sphere: CrashSphere,
    motor: Vec3,
    linear: Motion,
    circular: Motion,
    landed: bool,
    swimming: bool,
    collided: bool,
    obstacle: bool,
    floor_level: f32,
    floor_height: f32,
    falling_height: f32,
    inclination: f32,
    vibration: Vibration,
    repeat_collision: u32,
    reactor: Option<f32>,
}

impl Physics {
    /// Creates a body resting at `position`.
    ///
    /// `sphere` is the main crash sphere, relative to the body origin.
    #[must_use]
    pub fn new(
        id: ObjectId,
        class: LocomotionClass,
        profile: LocomotionProfile,
        config: PhysicsConfig,
        position: Vec3,
        heading: f32,
        sphere: CrashSphere,
    ) -> Self {
        let reactor = profile.reactor_range.map(|_| 1.0);
        let linear = Motion::new(profile.linear);
        let circular = Motion::new(profile.circular);
        Self {
            id,
            class,
            profile,
            config,
            position,
            angle: Vec3::new(0.0, norm_angle(heading), 0.0),
            sphere,
            motor: Vec3::ZERO,
            linear,
            circular,
            landed: true,
            swimming: false,
            collided: false,
            obstacle: false,
            floor_level: position.y,
            floor_height: 0.0,
            falling_height: 0.0,
            inclination: 1.0,
            vibration: Vibration::FULL,
            repeat_collision: 0,
            reactor,
        }
    }

    /// Roll, heading and pitch of the body.
    #[must_use]
    pub const fn angle(&self) -> Vec3 {
        self.angle
    }

    /// Linear motion state.
    #[must_use]
    pub const fn linear(&self) -> &Motion {
        &self.linear
    }

    /// Circular motion state.
    #[must_use]
    pub const fn circular(&self) -> &Motion {
        &self.circular
    }

    /// Height of the body above the floor at the last frame.
    #[must_use]
    pub const fn floor_height(&self) -> f32 {
        self.floor_height
    }

    /// Shake factors, faded out as a flyer nears the ground.
    #[must_use]
    pub const fn vibration(&self) -> Vibration {
        self.vibration
    }

    /// Height at which the current fall started, zero when not falling.
    #[must_use]
    pub const fn falling_height(&self) -> f32 {
        self.falling_height
    }

    /// Teleports the body, keeping its speeds.
    pub fn set_pose(&mut self, position: Vec3, heading: f32) {
        self.position = position;
        self.angle.y = norm_angle(heading);
    }

    /// Starts tracking a fall if the body is high enough above the floor.
    pub fn set_falling(&mut self) {
        if self.falling_height == 0.0 && self.floor_height >= self.config.min_falling_height {
            self.falling_height = self.position.y;
        }
    }

    /// Replaces the motor speed with a velocity received from a collision.
    pub fn apply_impulse(&mut self, velocity: Vec3) {
        let mut local = world_to_local(self.angle.y, velocity);
        if !self.profile.flies {
            local.y = 0.0;
        }
        self.linear.current_speed = local;
        self.obstacle = true;
    }

    /// Braking distance for a given speed and deceleration.
    #[must_use]
    pub fn stop_distance(&self, speed: f32, accel: f32) -> f32 {
        let (mut speed, mut accel) = (speed, accel);
        if self.profile.flies && self.landed {
            speed /= self.config.landing_speed;
            accel *= self.config.landing_accel;
        }
        if accel <= 0.0 {
            return 0.0;
        }
        speed * speed / (accel * 2.0)
    }

    /// Angle needed to stop turning from full turn speed.
    #[must_use]
    pub fn cir_stop_length(&self) -> f32 {
        let table = self.circular.table();
        if table.stop_accel.y <= 0.0 {
            return 0.0;
        }
        table.advance_speed.y * table.advance_speed.y / table.stop_accel.y / 2.0
    }

    /// Distance covered in one second at full speed.
    #[must_use]
    pub fn lin_max_length(&self, direction: f32) -> f32 {
        let table = self.linear.table();
        let distance = if direction > 0.0 {
            table.advance_speed.x
        } else {
            table.recede_speed.x
        };
        if self.profile.flies {
            distance / 5.0
        } else {
            distance
        }
    }

    /// Integrates one frame of `dt` seconds.
    pub fn frame(
        &mut self,
        dt: f32,
        terrain: &dyn Terrain,
        objects: &dyn ObjectRegistry,
    ) -> FrameOutcome {
        let mut outcome = FrameOutcome::default();
        if !(dt > 0.0) {
            return outcome;
        }

        self.update_motor(dt, terrain);
        self.update_slide(terrain);
        self.linear.update(dt, self.inclination);
        self.circular.update(dt, self.inclination);

        let mut angle = self.angle + self.circular.real_speed * dt;
        angle.y = norm_angle(angle.y);

        let step = local_to_world(angle.y, self.linear.real_speed * dt);
        let mut position = terrain.clamp_to_bounds(self.position + step);
        if self.profile.flies && !self.landed {
            let ceiling =
                terrain.flying_limit(position, self.profile.small_flyer) + self.profile.height;
            position.y = position.y.min(ceiling);
        }

        if position != self.position || angle != self.angle {
            self.adapt_to_floor(dt, terrain, &mut position, &mut angle);
        }

        if position != self.position {
            match self.adapt_to_objects(position, objects, &mut outcome) {
                Contact::Free => {}
                Contact::Blocked => position = self.position,
                Contact::Destroyed => {
                    outcome.destroyed.push(self.id);
                    return outcome;
                }
            }
        }

        outcome.moved = position != self.position;
        self.position = position;
        self.angle = angle;

        if self.landed && self.falling_height != 0.0 {
            let amount = (self.falling_height - self.position.y) * self.config.fall_damage_fraction;
            self.falling_height = 0.0;
            if amount > 0.0 {
                debug!("{:?} takes {amount:.3} fall damage", self.id);
                outcome.damage.push(Damage {
                    target: self.id,
                    amount,
                    cause: DamageCause::Fall,
                });
            }
        }

        outcome
    }

    fn update_motor(&mut self, dt: f32, terrain: &dyn Terrain) {
        let mut motor = self.motor;
        let height = self.profile.height;
        let small = self.profile.small_flyer;

        if self.profile.flies && !self.landed && motor.y > 0.0 {
            let ceiling = terrain.flying_limit(self.position, small) + height;
            let slow = self.config.ceiling_slowdown;
            if self.position.y > ceiling - slow {
                motor.y *= (1.0 - (self.position.y - (ceiling - slow)) / slow).clamp(-1.0, 1.0);
            }
        }

        let mut exhausted = false;
        if let (Some(range), Some(charge)) = (self.profile.reactor_range, self.reactor.as_mut()) {
            if self.landed || self.swimming || self.obstacle {
                let factor = if self.obstacle || self.swimming { 3.0 } else { 1.0 };
                *charge = (*charge + dt / self.config.reactor_recharge * factor).min(1.0);
                self.obstacle = false;
            } else {
                *charge = (*charge - dt / range).max(0.0);
                if *charge == 0.0 {
                    motor.y = -1.0;
                    exhausted = true;
                }
            }
        }
        if exhausted {
            self.set_falling();
        }

        self.linear.drive(0, motor.x);
        self.linear.drive(1, motor.y);
        self.linear.drive(2, 0.0);
        self.circular.drive(0, 0.0);
        self.circular.drive(1, motor.z);
        self.circular.drive(2, 0.0);

        if self.profile.flies && self.landed {
            let factor = self.config.landing_accel;
            self.linear.motor_accel.x = self.linear.table().stop_accel.x * factor;
            self.circular.motor_accel.y = self.circular.table().stop_accel.y * factor;

            let ceiling = terrain.flying_limit(self.position, small) + height;
            let cool = self.reactor.map_or(true, |charge| charge > LOW_REACTOR);
            if motor.y > 0.0 && cool && self.position.y < ceiling {
                debug!("{:?} takes off", self.id);
                self.landed = false;
                self.position.y += TAKEOFF_NUDGE;
            }
        }
    }

    fn update_slide(&mut self, terrain: &dyn Terrain) {
        let mut factor = terrain.building_factor(self.position);
        if self.position.y < terrain.water_level() {
            factor *= 0.5;
            self.falling_height = 0.0;
        }

        let force = self.linear.table().terrain_force;
        let mut slide = Vec3::new(
            -self.angle.z.tan() * SLOPE_SLIDE * force.x * factor,
            0.0,
            self.angle.x.tan() * SLOPE_SLIDE * force.z * factor,
        );
        for axis in [0, 2] {
            if slide[axis].abs() > SLIDE_OVERFLOW {
                slide[axis] = SLIDE_RESET.copysign(slide[axis]);
            }
        }
        self.linear.terrain_speed = slide;
    }

    fn adapt_to_floor(
        &mut self,
        dt: f32,
        terrain: &dyn Terrain,
        position: &mut Vec3,
        angle: &mut Vec3,
    ) {
        self.swimming = position.y < terrain.water_level();
        self.floor_level = terrain.floor_level(*position);
        let height = self.profile.height;
        let above = position.y - self.floor_level - height;

        if self.profile.flies {
            self.floor_height = above;

            let mut sloping = false;
            if !self.landed {
                let normal = terrain.normal(*position);
                let incline = rotate_angle(Vec2::new(normal.x, normal.z).length(), normal.y).abs();
                if incline < STEEP_NORMAL {
                    sloping = true;
                    if above < HOVER_HEIGHT {
                        let real = self.linear.real_speed;
                        let force = 5.0 + (real.x * 0.3).abs() + (real.y * 0.3).abs();
                        self.linear.current_speed = world_to_local(angle.y, normal * force);
                    }
                }
            }

            if (above <= 0.0 || self.landed) && !sloping {
                if !self.landed {
                    debug!("{:?} lands at {:?}", self.id, position);
                }
                self.landed = true;
                position.y = self.floor_level + height;
                self.floor_height = 0.0;
                self.linear.current_speed.y = 0.0;
                self.inclination = 1.0 / self.config.landing_speed;
                self.vibration = Vibration::NONE;
            }

            if above > HOVER_HEIGHT || sloping {
                self.inclination = 1.0;
                self.vibration = Vibration::FULL;
                angle.x = level(angle.x, dt * LEVEL_RATE);
                angle.z = level(angle.z, dt * LEVEL_RATE);
                return;
            }
        } else {
            position.y = self.floor_level + height;
            self.floor_height = 0.0;
        }

        if !matches!(self.class, LocomotionClass::Walker | LocomotionClass::Burrower) {
            self.adapt_tilt(terrain, *position, angle);
        }

        if self.profile.flies && !self.landed {
            let lift = (above / HOVER_HEIGHT).clamp(0.0, 1.0);
            angle.x *= 1.0 - lift;
            angle.z *= 1.0 - lift;
            self.vibration = Vibration::uniform(lift);
            self.inclination = above.clamp(0.0, 1.0);
        }
    }

    fn adapt_tilt(&self, terrain: &dyn Terrain, position: Vec3, angle: &mut Vec3) {
        // Contacts sit at the floor, not at the body origin.
        let contact_y = position.y - self.profile.height;
        let slope_to = |heading: f32, reach: f32| {
            let offset = forward(heading) * reach;
            let point = Vec3::new(position.x + offset.x, contact_y, position.z + offset.y);
            (terrain.height_to_floor(point) / reach).atan()
        };
        let wheels = self.profile.wheels;

        let front = slope_to(angle.y, wheels.front);
        let back = slope_to(angle.y + PI, wheels.back);
        angle.z = (back - front) / 2.0;

        let lean = angle.z.cos();
        let left = slope_to(angle.y + FRAC_PI_2, wheels.left * lean);
        let right = slope_to(angle.y + PI * 1.5, wheels.right * lean);
        angle.x = (right - left) / 2.0;
    }

    fn adapt_to_objects(
        &mut self,
        position: Vec3,
        objects: &dyn ObjectRegistry,
        outcome: &mut FrameOutcome,
    ) -> Contact {
        let old_center = self.position + local_to_world(self.angle.y, self.sphere.center);
        let new_center = old_center + (position - self.position);

        for object in objects.objects() {
            if object.id == self.id || object.transported || !object.active {
                continue;
            }
            for sphere in &object.crash_spheres {
                if self.profile.ignores_small_obstacles && sphere.radius <= SMALL_SPHERE {
                    continue;
                }
                let reach = self.sphere.radius + sphere.radius;
                if new_center.distance(sphere.center) >= reach
                    || old_center.distance(sphere.center) < reach
                {
                    continue;
                }

                self.collided = true;
                self.obstacle = true;

                if matches!(object.role, ObjectRole::Explosive) {
                    debug!("{:?} sets off {:?}", self.id, object.id);
                    outcome.destroyed.push(object.id);
                    return Contact::Destroyed;
                }

                let mut force = self.linear.real_speed.length() * sphere.hardness;
                self.impact_damage(object, force, outcome);

                if self.repeat_collision > 0 {
                    force = (force * 0.5 * self.repeat_collision as f32).min(REPEAT_FORCE_CAP);
                }
                self.repeat_collision = (self.repeat_collision + 2).min(REPEAT_CAP);

                let away = (new_center - sphere.center).normalize_or_zero() * force;
                let mut bounce = world_to_local(self.angle.y, away);
                if !self.profile.flies {
                    bounce.y = 0.0;
                }
                self.linear.current_speed = bounce;
                trace!("{:?} bounces off {:?} with force {force:.2}", self.id, object.id);

                if object.role.locomotion().is_some() {
                    outcome.impulse = Some(Impulse {
                        target: object.id,
                        velocity: -away,
                    });
                }
                return Contact::Blocked;
            }
        }

        self.repeat_collision = self.repeat_collision.saturating_sub(1);
        Contact::Free
    }

    fn impact_damage(&self, other: &ObjectSnapshot, force: f32, outcome: &mut FrameOutcome) {
        if force <= IMPACT_FORCE {
            return;
        }

        let inflicted = match other.role {
            role if role.is_building() => Some(force / 400.0),
            ObjectRole::Vehicle(_) => Some(force / 200.0),
            _ => None,
        };
        if let Some(amount) = inflicted {
            outcome.damage.push(Damage {
                target: other.id,
                amount,
                cause: DamageCause::Impact,
            });
        }

        let received = match other.role {
            ObjectRole::Vehicle(
                LocomotionClass::Insect | LocomotionClass::FlyingInsect | LocomotionClass::Burrower,
            ) => force / 400.0,
            _ => force / 200.0,
        };
        outcome.damage.push(Damage {
            target: self.id,
            amount: received,
            cause: DamageCause::Impact,
        });
    }
}

fn level(angle: f32, step: f32) -> f32 {
    if angle > 0.0 {
        (angle - step).max(0.0)
    } else {
        (angle + step).min(0.0)
    }
}

impl Movable for Physics {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn profile(&self) -> &LocomotionProfile {
        &self.profile
    }

    fn class(&self) -> LocomotionClass {
        self.class
    }

    fn position(&self) -> Vec3 {
        self.position
    }

    fn heading(&self) -> f32 {
        self.angle.y
    }

    fn crash_sphere(&self) -> CrashSphere {
        self.sphere
    }

    fn motor_speed(&self) -> Vec3 {
        self.motor
    }

    fn set_motor_speed(&mut self, speed: Vec3) {
        let speed = Vec3::select(speed.is_nan_mask(), Vec3::ZERO, speed);
        self.motor = speed.clamp(Vec3::splat(-1.0), Vec3::splat(1.0));
    }

    fn linear_real_speed(&self) -> Vec3 {
        self.linear.real_speed
    }

    fn is_landed(&self) -> bool {
        self.landed
    }

    fn is_swimming(&self) -> bool {
        self.swimming
    }

    fn collided(&self) -> bool {
        self.collided
    }

    fn set_collided(&mut self, collided: bool) {
        self.collided = collided;
    }

    fn reactor_charge(&self) -> Option<f32> {
        self.reactor
    }

    fn lin_stop_length(&self) -> f32 {
        let table = self.linear.table();
        self.stop_distance(table.advance_speed.x, table.stop_accel.x)
    }

    fn lin_time_length(&self, distance: f32) -> f32 {
        let table = self.linear.table();
        let (speed, accel) = if distance >= 0.0 {
            (table.advance_speed.x, table.advance_accel.x)
        } else {
            (table.recede_speed.x, table.recede_accel.x)
        };
        let direction = if distance >= 0.0 { 1.0 } else { -1.0 };
        let ramp_up = self.stop_distance(speed, accel);
        let ramp_down = self.stop_distance(speed, table.stop_accel.x);
        let per_second = self.lin_max_length(direction);
        if per_second <= 0.0 {
            return f32::INFINITY;
        }
        (distance.abs() + ramp_up + ramp_down) / per_second
    }

    fn lin_length(&self, distance: f32) -> f32 {
        let table = self.linear.table();
        let (distance, speed, accel) = if distance > 0.0 {
            (distance, table.advance_speed.x, table.advance_accel.x)
        } else {
            (-distance, table.recede_speed.x, table.recede_accel.x)
        };
        let ramp_up = self.stop_distance(speed, accel);
        let ramp_down = self.stop_distance(speed, table.stop_accel.x);
        if distance > ramp_up + ramp_down {
            return distance - ramp_down;
        }
        let share = accel + table.stop_accel.x;
        if share <= 0.0 {
            return distance;
        }
        distance * table.stop_accel.x / share
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ground {
        floor: f32,
        water: f32,
    }

    impl Terrain for Ground {
        fn floor_level(&self, _position: Vec3) -> f32 {
            self.floor
        }

        fn fine_slope(&self, _position: Vec3) -> f32 {
            0.0
        }

        fn normal(&self, _position: Vec3) -> Vec3 {
            Vec3::Y
        }

        fn water_level(&self) -> f32 {
            self.water
        }

        fn flying_limit(&self, _position: Vec3, _small_flyer: bool) -> f32 {
            self.floor + 200.0
        }

        fn flying_max_height(&self) -> f32 {
            self.floor + 200.0
        }
    }

    struct Nothing;

    impl ObjectRegistry for Nothing {
        fn objects(&self) -> &[ObjectSnapshot] {
            &[]
        }
    }

    fn body(class: LocomotionClass, position: Vec3) -> Physics {
        Physics::new(
            ObjectId::new(1),
            class,
            LocomotionProfile::preset(class),
            PhysicsConfig::default(),
            position,
            0.0,
            CrashSphere::new(Vec3::ZERO, 2.0),
        )
    }

    fn ground() -> Ground {
        Ground {
            floor: 0.0,
            water: -100.0,
        }
    }

    #[test]
    fn ground_vehicle_accelerates_along_its_heading() {
        let mut wheels = body(LocomotionClass::Wheels, Vec3::new(0.0, 3.0, 0.0));
        wheels.set_motor_speed(Vec3::X);
        for _ in 0..60 {
            let _ = wheels.frame(1.0 / 30.0, &ground(), &Nothing);
        }
        assert_eq!(wheels.linear().current_speed.x, 20.0);
        assert!(wheels.position().x > 15.0);
        assert!(wheels.position().z.abs() < 1.0e-3);
        assert_eq!(wheels.position().y, 3.0);
    }

    #[test]
    fn turn_input_rotates_the_heading() {
        let mut tracks = body(LocomotionClass::Tracks, Vec3::new(0.0, 3.0, 0.0));
        tracks.set_motor_speed(Vec3::Z);
        for _ in 0..10 {
            let _ = tracks.frame(0.1, &ground(), &Nothing);
        }
        assert!(tracks.heading() > 0.5);
        assert_eq!(tracks.position().x, 0.0);
    }

    #[test]
    fn motor_inputs_are_clamped_and_nan_is_ignored() {
        let mut wheels = body(LocomotionClass::Wheels, Vec3::new(0.0, 3.0, 0.0));
        wheels.set_motor_speed(Vec3::new(4.0, f32::NAN, -3.0));
        assert_eq!(wheels.motor_speed().x, 1.0);
        assert_eq!(wheels.motor_speed().y, 0.0);
        assert_eq!(wheels.motor_speed().z, -1.0);
        let _ = wheels.frame(0.1, &ground(), &Nothing);
        assert!(wheels.position().is_finite());
    }

    #[test]
    fn flyer_takes_off_and_lands_again() {
        let mut flyer = body(LocomotionClass::Flying, Vec3::new(0.0, 3.0, 0.0));
        assert!(flyer.is_landed());

        flyer.set_motor_speed(Vec3::Y);
        for _ in 0..20 {
            let _ = flyer.frame(0.05, &ground(), &Nothing);
        }
        assert!(!flyer.is_landed());
        assert!(flyer.position().y > 4.0);

        flyer.set_motor_speed(Vec3::NEG_Y);
        for _ in 0..200 {
            let _ = flyer.frame(0.05, &ground(), &Nothing);
        }
        assert!(flyer.is_landed());
        assert_eq!(flyer.position().y, 3.0);
    }

    #[test]
    fn reactor_drains_in_flight_and_recharges_on_the_ground() {
        let mut flyer = body(LocomotionClass::Flying, Vec3::new(0.0, 3.0, 0.0));
        flyer.set_motor_speed(Vec3::Y);
        for _ in 0..40 {
            let _ = flyer.frame(0.05, &ground(), &Nothing);
        }
        let airborne = flyer.reactor_charge().expect("reactor");
        assert!(airborne < 1.0);

        flyer.set_motor_speed(Vec3::NEG_Y);
        for _ in 0..400 {
            let _ = flyer.frame(0.05, &ground(), &Nothing);
        }
        assert!(flyer.is_landed());
        assert!(flyer.reactor_charge().expect("reactor") > airborne);
    }

    #[test]
    fn empty_reactor_drops_the_flyer_and_deals_fall_damage() {
        let mut flyer = body(LocomotionClass::Flying, Vec3::new(0.0, 3.0, 0.0));
        flyer.set_motor_speed(Vec3::Y);
        let mut damage = Vec::new();
        for _ in 0..2000 {
            let outcome = flyer.frame(0.05, &ground(), &Nothing);
            damage.extend(outcome.damage);
            if flyer.is_landed() && flyer.reactor_charge() == Some(0.0) {
                break;
            }
        }
        assert!(flyer.is_landed());
        assert_eq!(damage.len(), 1);
        assert_eq!(damage[0].target, ObjectId::new(1));
        assert!(damage[0].amount > 0.0);
        assert_eq!(damage[0].cause, DamageCause::Fall);
        assert_eq!(flyer.falling_height(), 0.0);
    }

    #[test]
    fn water_resets_a_tracked_fall() {
        let mut flyer = body(LocomotionClass::Flying, Vec3::new(0.0, 3.0, 0.0));
        flyer.falling_height = 80.0;
        let pond = Ground {
            floor: 0.0,
            water: 10.0,
        };
        let _ = flyer.frame(0.05, &pond, &Nothing);
        assert_eq!(flyer.falling_height(), 0.0);
    }

    #[test]
    fn stop_length_uses_full_speed_and_stop_acceleration() {
        let wheels = body(LocomotionClass::Wheels, Vec3::ZERO);
        assert_eq!(wheels.lin_stop_length(), 20.0 * 20.0 / 80.0);

        let flyer = body(LocomotionClass::Flying, Vec3::ZERO);
        let slowed = 50.0 / 3.0;
        assert!((flyer.lin_stop_length() - slowed * slowed / 200.0).abs() < 1.0e-4);
    }

    #[test]
    fn long_distances_leave_room_to_brake() {
        let wheels = body(LocomotionClass::Wheels, Vec3::ZERO);
        let braking = wheels.lin_stop_length();
        assert_eq!(wheels.lin_length(100.0), 100.0 - braking);
        assert!((wheels.lin_length(4.0) - 2.0).abs() < 1.0e-5);
        assert!(wheels.lin_length(-4.0) > 0.0);
    }

    #[test]
    fn travel_time_grows_with_distance() {
        let wheels = body(LocomotionClass::Wheels, Vec3::ZERO);
        let near = wheels.lin_time_length(10.0);
        let far = wheels.lin_time_length(50.0);
        assert!((far - near - 2.0).abs() < 1.0e-4);
        assert!(wheels.lin_time_length(-10.0) > near);
    }

    #[test]
    fn turning_stop_angle_matches_the_circular_table() {
        let wheels = body(LocomotionClass::Wheels, Vec3::ZERO);
        assert!((wheels.cir_stop_length() - PI * PI / 8.0).abs() < 1.0e-5);
    }
}
