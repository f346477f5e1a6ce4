use glam::Vec3;
use waypoint_core::{
    CrashSphere, LocomotionClass, LocomotionProfile, Movable, ObjectId, ObjectRegistry,
    ObjectRole, ObjectSnapshot, PhysicsConfig, Terrain,
};
use waypoint_system_physics::{Damage, DamageCause, FrameOutcome, Physics};

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

struct Objects(Vec<ObjectSnapshot>);

impl ObjectRegistry for Objects {
    fn objects(&self) -> &[ObjectSnapshot] {
        &self.0
    }
}

fn obstacle(id: u32, role: ObjectRole, center: Vec3, radius: f32) -> ObjectSnapshot {
    ObjectSnapshot {
        id: ObjectId::new(id),
        role,
        position: center,
        heading: 0.0,
        crash_spheres: vec![CrashSphere::new(center, radius)],
        health: 1.0,
        active: true,
        detectable: true,
        transported: false,
    }
}

fn rover(class: LocomotionClass, position: Vec3) -> Physics {
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

fn drive(body: &mut Physics, objects: &Objects, frames: usize) -> Vec<FrameOutcome> {
    (0..frames)
        .map(|_| body.frame(1.0 / 30.0, &Flat, objects))
        .collect()
}

#[test]
fn driving_into_a_sphere_bounces_back_and_stops_short() {
    let wall = Objects(vec![obstacle(
        2,
        ObjectRole::Scenery,
        Vec3::new(20.0, 3.0, 0.0),
        4.0,
    )]);
    let mut body = rover(LocomotionClass::Wheels, Vec3::new(0.0, 3.0, 0.0));
    body.set_motor_speed(Vec3::X);

    let _ = drive(&mut body, &wall, 90);

    assert!(body.collided());
    assert!(body.position().x < 14.0 + 1.0e-3);
}

#[test]
fn existing_overlap_does_not_bounce() {
    let crate_box = Objects(vec![obstacle(
        2,
        ObjectRole::Cargo,
        Vec3::new(1.0, 3.0, 0.0),
        2.0,
    )]);
    let mut body = rover(LocomotionClass::Wheels, Vec3::new(0.0, 3.0, 0.0));
    body.set_motor_speed(Vec3::X);

    let _ = drive(&mut body, &crate_box, 30);

    assert!(!body.collided());
    assert!(body.position().x > 5.0);
}

#[test]
fn bounce_points_away_from_the_obstacle_centre() {
    let post = Objects(vec![obstacle(
        2,
        ObjectRole::Scenery,
        Vec3::new(10.0, 3.0, 1.0),
        3.0,
    )]);
    let mut body = rover(LocomotionClass::Tracks, Vec3::new(0.0, 3.0, 0.0));
    body.set_motor_speed(Vec3::X);

    for _ in 0..60 {
        let _ = body.frame(1.0 / 30.0, &Flat, &post);
        if body.collided() {
            break;
        }
    }

    assert!(body.collided());
    let bounce = body.linear().current_speed;
    assert!(bounce.x < 0.0);
    assert!(bounce.z < 0.0);
    assert_eq!(bounce.y, 0.0);
}

#[test]
fn small_spheres_are_ignored_by_aliens_only() {
    let pebble = || {
        Objects(vec![obstacle(
            2,
            ObjectRole::Scenery,
            Vec3::new(6.0, 2.0, 0.0),
            1.0,
        )])
    };

    let mut ant = rover(LocomotionClass::Insect, Vec3::new(0.0, 2.0, 0.0));
    ant.set_motor_speed(Vec3::X);
    let _ = drive(&mut ant, &pebble(), 60);
    assert!(!ant.collided());

    let mut wheels = rover(LocomotionClass::Wheels, Vec3::new(0.0, 3.0, 0.0));
    wheels.set_motor_speed(Vec3::X);
    let _ = drive(&mut wheels, &pebble(), 60);
    assert!(wheels.collided());
}

#[test]
fn hitting_another_mover_pushes_it() {
    let other = Objects(vec![obstacle(
        2,
        ObjectRole::Vehicle(LocomotionClass::Wheels),
        Vec3::new(10.0, 3.0, 0.0),
        2.0,
    )]);
    let mut body = rover(LocomotionClass::Wheels, Vec3::new(0.0, 3.0, 0.0));
    body.set_motor_speed(Vec3::X);

    let impulse = drive(&mut body, &other, 60)
        .into_iter()
        .find_map(|outcome| outcome.impulse)
        .expect("impulse");

    assert_eq!(impulse.target, ObjectId::new(2));
    assert!(impulse.velocity.x > 0.0);
}

#[test]
fn touching_an_explosive_destroys_both() {
    let charge = Objects(vec![obstacle(
        2,
        ObjectRole::Explosive,
        Vec3::new(8.0, 3.0, 0.0),
        1.5,
    )]);
    let mut body = rover(LocomotionClass::Wheels, Vec3::new(0.0, 3.0, 0.0));
    body.set_motor_speed(Vec3::X);

    let destroyed: Vec<ObjectId> = drive(&mut body, &charge, 60)
        .into_iter()
        .flat_map(|outcome| outcome.destroyed)
        .collect();

    assert!(destroyed.contains(&ObjectId::new(1)));
    assert!(destroyed.contains(&ObjectId::new(2)));
}

#[test]
fn hard_impact_damages_the_driver() {
    let mut rock = obstacle(2, ObjectRole::Scenery, Vec3::new(20.0, 3.0, 0.0), 4.0);
    rock.crash_spheres = vec![CrashSphere::new(rock.position, 4.0).with_hardness(2.0)];
    let mut body = rover(LocomotionClass::Wheels, Vec3::new(0.0, 3.0, 0.0));
    body.set_motor_speed(Vec3::X);

    let damage: Vec<Damage> = drive(&mut body, &Objects(vec![rock]), 60)
        .into_iter()
        .flat_map(|outcome| outcome.damage)
        .collect();

    assert!(!damage.is_empty());
    assert!(damage
        .iter()
        .all(|hit| hit.target == ObjectId::new(1) && hit.cause == DamageCause::Impact));
}
