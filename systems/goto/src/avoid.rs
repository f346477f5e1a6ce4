//! Reactive avoidance used on direct approaches, separate from the grid search.

use glam::{Vec2, Vec3};
use waypoint_core::{
    geometry::{distance_projected, local_to_world, planar},
    LocomotionClass, Movable, ObjectRegistry, ObjectRole, ObjectSnapshot,
};

/// Clearance beyond touching at which a landed mover starts to back away.
const LEAK_CLEARANCE: f32 = 4.0;

/// Obstacle a mover starts too close to, and how to get away from it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Leak {
    /// Centre of the obstacle's closest crash sphere.
    pub(crate) from: Vec3,
    /// Seconds to spend backing away.
    pub(crate) delay: f32,
    /// Whether to reverse straight back instead of steering away.
    pub(crate) recede: bool,
}

fn skipped(ignored: &[LocomotionClass], object: &ObjectSnapshot) -> bool {
    object.transported
        || matches!(object.role.locomotion(), Some(class) if ignored.contains(&class))
}

/// Planar push away from obstacles between the mover and `goal`.
///
/// Each sphere whose inflated radius contains the mover contributes
/// `0.2 - 0.2 * (d / r)^exponent` along the direction away from it.
pub(crate) fn repulse(
    body: &dyn Movable,
    goal: Vec3,
    objects: &dyn ObjectRegistry,
    ignored: &[LocomotionClass],
) -> Vec2 {
    let profile = body.profile();
    if profile.ignores_repulsion {
        return Vec2::ZERO;
    }

    let own = body.position();
    let own_radius = body.radius();
    let goal_distance = own.distance(goal);

    let tuning = profile.repulse;
    let margin = if body.is_landed() {
        tuning.landed_margin
    } else {
        tuning.airborne_margin.or(tuning.landed_margin)
    }
    .unwrap_or_else(|| body.lin_stop_length() * 1.1);
    let alien = profile.ignores_small_obstacles;
    let class = body.class();

    let mut push = Vec2::ZERO;
    for object in objects.objects() {
        if object.id == body.id() || skipped(ignored, object) {
            continue;
        }
        if alien
            && matches!(
                object.role,
                ObjectRole::Cargo | ObjectRole::Explosive | ObjectRole::Scenery
            )
        {
            continue;
        }

        let extra = match (object.role, tuning.same_class_margin) {
            (ObjectRole::Vehicle(other), Some(same)) if other == class => same,
            _ => margin,
        };

        for sphere in &object.crash_spheres {
            if sphere.center.y - sphere.radius > own.y + own_radius {
                continue;
            }
            if sphere.center.y + sphere.radius < own.y - own_radius {
                continue;
            }
            if sphere.center.distance(goal) <= 1.0 {
                continue;
            }

            let reach = sphere.radius + own_radius + extra;
            let dist = distance_projected(sphere.center, own);
            if dist > goal_distance || dist > reach {
                continue;
            }
            let strength = 0.2 - 0.2 * (dist / reach).powf(tuning.exponent);
            push += (planar(own) - planar(sphere.center)) * strength;
        }
    }
    push
}

/// Vertical push away from obstacles overlapping the mover on the ground
/// plane, clamped to `[-1, 1]`.
pub(crate) fn flying_repulse(
    body: &dyn Movable,
    objects: &dyn ObjectRegistry,
    ignored: &[LocomotionClass],
) -> f32 {
    let own = body.position();
    let own_radius = body.radius();

    let mut push = 0.0;
    for object in objects.objects() {
        if object.id == body.id() || skipped(ignored, object) {
            continue;
        }
        for sphere in &object.crash_spheres {
            let reach = sphere.radius + own_radius;
            let dist = distance_projected(sphere.center, own);
            if dist <= reach {
                let strength = 0.2 - 0.2 * (dist / reach).powf(1.5);
                push += (own.y - sphere.center.y) * strength;
            }
        }
    }
    push.clamp(-1.0, 1.0)
}

/// Finds an obstacle a landed mover overlaps too closely to start a search.
pub(crate) fn leak_search(body: &dyn Movable, objects: &dyn ObjectRegistry) -> Option<Leak> {
    if !body.is_landed() {
        return None;
    }

    let own = body.position() + local_to_world(body.heading(), body.crash_sphere().center);
    let mut closest: Option<(f32, &ObjectSnapshot, Vec3, f32)> = None;
    for object in objects.objects() {
        if object.id == body.id() || !object.detectable || object.transported {
            continue;
        }
        for sphere in &object.crash_spheres {
            let dist = distance_projected(own, sphere.center);
            if closest.map_or(true, |(min, ..)| dist < min) {
                closest = Some((dist, object, sphere.center, sphere.radius));
            }
        }
    }

    let (dist, obstacle, center, radius) = closest?;
    if dist > body.radius() + radius + LEAK_CLEARANCE {
        return None;
    }

    let (distance, recede) = if matches!(obstacle.role, ObjectRole::Factory) {
        (-16.0, true)
    } else {
        (4.0, false)
    };
    Some(Leak {
        from: center,
        delay: body.lin_time_length(distance),
        recede,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_core::{
        CrashSphere, LocomotionProfile, ObjectId, PhysicsConfig,
    };
    use waypoint_system_physics::Physics;

    struct Objects(Vec<ObjectSnapshot>);

    impl ObjectRegistry for Objects {
        fn objects(&self) -> &[ObjectSnapshot] {
            &self.0
        }
    }

    fn object(id: u32, role: ObjectRole, position: Vec3, radius: f32) -> ObjectSnapshot {
        ObjectSnapshot {
            id: ObjectId::new(id),
            role,
            position,
            heading: 0.0,
            crash_spheres: vec![CrashSphere::new(position, radius)],
            health: 1.0,
            active: true,
            detectable: true,
            transported: false,
        }
    }

    fn mover(class: LocomotionClass, position: Vec3) -> Physics {
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

    #[test]
    fn nearby_obstacle_pushes_away_from_its_centre() {
        let body = mover(LocomotionClass::Wheels, Vec3::new(0.0, 3.0, 0.0));
        let objects = Objects(vec![object(
            2,
            ObjectRole::Scenery,
            Vec3::new(3.0, 3.0, 2.0),
            2.0,
        )]);
        let push = repulse(&body, Vec3::new(40.0, 3.0, 0.0), &objects, &[]);
        assert!(push.x < 0.0);
        assert!(push.y < 0.0);
    }

    #[test]
    fn obstacles_past_the_goal_or_on_it_do_not_push() {
        let body = mover(LocomotionClass::Wheels, Vec3::new(0.0, 3.0, 0.0));
        let goal = Vec3::new(3.0, 3.0, 0.0);
        let objects = Objects(vec![
            object(2, ObjectRole::Scenery, goal, 1.5),
            object(3, ObjectRole::Scenery, Vec3::new(-5.0, 3.0, 0.0), 2.0),
        ]);
        assert_eq!(repulse(&body, goal, &objects, &[]), Vec2::ZERO);
    }

    #[test]
    fn ignored_classes_and_repulsion_free_movers_feel_nothing() {
        let objects = Objects(vec![object(
            2,
            ObjectRole::Vehicle(LocomotionClass::Burrower),
            Vec3::new(3.0, 3.0, 1.0),
            2.0,
        )]);
        let body = mover(LocomotionClass::Wheels, Vec3::new(0.0, 3.0, 0.0));
        let goal = Vec3::new(40.0, 3.0, 0.0);
        assert_eq!(
            repulse(&body, goal, &objects, &[LocomotionClass::Burrower]),
            Vec2::ZERO
        );
        assert_ne!(repulse(&body, goal, &objects, &[]), Vec2::ZERO);

        let worm = mover(LocomotionClass::Burrower, Vec3::new(0.0, 0.5, 0.0));
        assert_eq!(repulse(&worm, goal, &objects, &[]), Vec2::ZERO);
    }

    #[test]
    fn aliens_ignore_cargo_when_repulsing() {
        let objects = Objects(vec![object(
            2,
            ObjectRole::Cargo,
            Vec3::new(2.0, 2.0, 1.0),
            2.0,
        )]);
        let ant = mover(LocomotionClass::Insect, Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(
            repulse(&ant, Vec3::new(40.0, 2.0, 0.0), &objects, &[]),
            Vec2::ZERO
        );
    }

    #[test]
    fn flying_repulse_pushes_up_over_low_obstacles() {
        let body = mover(LocomotionClass::Flying, Vec3::new(0.0, 10.0, 0.0));
        let objects = Objects(vec![object(
            2,
            ObjectRole::Scenery,
            Vec3::new(1.0, 2.0, 0.0),
            3.0,
        )]);
        let push = flying_repulse(&body, &objects, &[]);
        assert!(push > 0.0);
        assert!(push <= 1.0);
    }

    #[test]
    fn leak_triggers_only_when_touching() {
        let body = mover(LocomotionClass::Wheels, Vec3::new(0.0, 3.0, 0.0));
        let close = Objects(vec![object(
            2,
            ObjectRole::Scenery,
            Vec3::new(5.0, 3.0, 0.0),
            2.0,
        )]);
        let leak = leak_search(&body, &close).expect("leak");
        assert!(!leak.recede);
        assert!(leak.delay > 0.0);

        let far = Objects(vec![object(
            2,
            ObjectRole::Scenery,
            Vec3::new(20.0, 3.0, 0.0),
            2.0,
        )]);
        assert!(leak_search(&body, &far).is_none());
    }

    #[test]
    fn leak_clearance_is_measured_from_the_crash_sphere() {
        let mut body = Physics::new(
            ObjectId::new(1),
            LocomotionClass::Wheels,
            LocomotionProfile::preset(LocomotionClass::Wheels),
            PhysicsConfig::default(),
            Vec3::new(0.0, 3.0, 0.0),
            0.0,
            CrashSphere::new(Vec3::new(6.0, 0.0, 0.0), 2.0),
        );
        let ahead = Objects(vec![object(
            2,
            ObjectRole::Scenery,
            Vec3::new(13.0, 3.0, 0.0),
            2.0,
        )]);
        assert!(leak_search(&body, &ahead).is_some());

        body.set_pose(Vec3::new(0.0, 3.0, 0.0), std::f32::consts::PI);
        assert!(leak_search(&body, &ahead).is_none());
    }

    #[test]
    fn factories_are_backed_out_of() {
        let body = mover(LocomotionClass::Tracks, Vec3::new(0.0, 3.0, 0.0));
        let factory = Objects(vec![object(
            2,
            ObjectRole::Factory,
            Vec3::new(4.0, 3.0, 0.0),
            3.0,
        )]);
        let leak = leak_search(&body, &factory).expect("leak");
        assert!(leak.recede);
        assert!(leak.delay > body.lin_time_length(4.0));
    }
}
