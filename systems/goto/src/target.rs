//! Goal adjustment when an order points at an object instead of open ground.

use glam::Vec3;
use waypoint_core::{
    geometry::{distance_projected, local_to_world},
    LocomotionClass, ObjectId, ObjectRegistry, ObjectRole, ObjectSnapshot, TAKE_DIST,
};

/// Object closest to `position`, within `margin` on the ground plane.
///
/// Ties go to the object listed last. The mover itself, inactive objects and
/// objects being carried are never returned.
pub(crate) fn search_target(
    objects: &dyn ObjectRegistry,
    mover: ObjectId,
    position: Vec3,
    margin: f32,
) -> Option<&ObjectSnapshot> {
    let mut best = None;
    let mut min = f32::MAX;
    for object in objects.objects() {
        if object.id == mover || !object.active || object.transported {
            continue;
        }
        let dist = distance_projected(position, object.position);
        if dist <= margin && dist <= min {
            min = dist;
            best = Some(object);
        }
    }
    best
}

/// Docking point of a building.
///
/// With `take` set, the point is pushed outward along the building's local
/// `x` by the take distance plus `distance`. Returns the point and the
/// supplement that applies.
pub(crate) fn hot_point(
    object: &ObjectSnapshot,
    take: bool,
    distance: f32,
) -> Option<(Vec3, f32)> {
    let ObjectRole::Building {
        hot_point: Some(hot),
    } = object.role
    else {
        return None;
    };

    let supplement = if take && distance != 0.0 {
        hot.supplement
    } else {
        0.0
    };
    let mut local = hot.offset;
    if take {
        local.x += TAKE_DIST + distance + supplement;
    }
    Some((
        object.position + local_to_world(object.heading, local),
        supplement,
    ))
}

/// Moves a goal that sits on a docking point out to where a mover stops.
///
/// Returns the approach distance left once the goal has moved.
pub(crate) fn adjust_building(
    objects: &dyn ObjectRegistry,
    goal: &mut Vec3,
    margin: f32,
    distance: f32,
) -> Option<f32> {
    for object in objects.objects() {
        if !object.active || object.transported {
            continue;
        }
        let Some((dock, _)) = hot_point(object, false, 0.0) else {
            continue;
        };
        if distance_projected(*goal, dock) <= margin {
            let (outside, supplement) = hot_point(object, true, distance)?;
            *goal = outside;
            return Some(distance + supplement);
        }
    }
    None
}

/// How a mover approaches an object it was sent to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Approach {
    /// The object can be reached from any side; the goal sits on the line
    /// from the object to the mover.
    AnySide,
    /// The goal is fixed; `remaining` is left for a final straight move.
    Single {
        /// Distance still to cover after reaching the goal.
        remaining: f32,
    },
}

/// Rewrites `goal` according to the role of the targeted object.
pub(crate) fn adjust_target(
    class: LocomotionClass,
    mover_position: Vec3,
    object: &ObjectSnapshot,
    goal: &mut Vec3,
    distance: f32,
) -> Approach {
    if matches!(
        class,
        LocomotionClass::FlyingInsect | LocomotionClass::Burrower
    ) {
        *goal = object.position;
        return Approach::Single { remaining: distance };
    }

    match object.role {
        ObjectRole::Cargo | ObjectRole::Station => {
            let offset = mover_position - object.position;
            let length = offset.length();
            *goal = if length > 0.0 {
                offset * (TAKE_DIST + distance) / length + object.position
            } else {
                object.position
            };
            Approach::AnySide
        }
        _ => {
            if let Some((dock, supplement)) = hot_point(object, true, distance) {
                *goal = dock;
                return Approach::Single {
                    remaining: distance + supplement,
                };
            }
            *goal = object.position;
            Approach::Single { remaining: 0.0 }
        }
    }
}
