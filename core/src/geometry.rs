//! Planar angle and distance helpers shared by navigation and physics.
//!
//! Headings are measured around the vertical axis. A heading of `a` faces
//! the planar direction `(cos a, -sin a)` in `(x, z)`, so turning with a
//! positive circular speed increases the heading.

use std::f32::consts::{PI, TAU};

use glam::{Vec2, Vec3};

/// Normalises an angle into `[0, 2π)`.
#[must_use]
pub fn norm_angle(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Angle of the vector `(x, y)` normalised into `[0, 2π)`.
///
/// Returns zero for the null vector.
#[must_use]
pub fn rotate_angle(x: f32, y: f32) -> f32 {
    if x == 0.0 && y == 0.0 {
        return 0.0;
    }
    norm_angle(y.atan2(x))
}

/// Signed shortest rotation that turns heading `from` onto heading `to`.
///
/// The result lies in `[-π, π]`; positive values increase the heading.
#[must_use]
pub fn direction(from: f32, to: f32) -> f32 {
    let mut a = norm_angle(from);
    let mut g = norm_angle(to);

    if a < g {
        if a + TAU - g < g - a {
            a += TAU;
        }
    } else if g + TAU - a < a - g {
        g += TAU;
    }

    g - a
}

/// Heading that faces from `from` towards `to` in the horizontal plane.
#[must_use]
pub fn heading_towards(from: Vec3, to: Vec3) -> f32 {
    rotate_angle(to.x - from.x, from.z - to.z)
}

/// Heading that faces along a planar `(x, z)` direction.
#[must_use]
pub fn heading_of(planar: Vec2) -> f32 {
    rotate_angle(planar.x, -planar.y)
}

/// Planar unit vector `(x, z)` faced by the heading.
#[must_use]
pub fn forward(heading: f32) -> Vec2 {
    Vec2::new(heading.cos(), -heading.sin())
}

/// Rotates a vector expressed in the object's local frame into world space.
///
/// Local `x` points forward, `y` up and `z` to the object's right.
#[must_use]
pub fn local_to_world(heading: f32, local: Vec3) -> Vec3 {
    let (sin, cos) = heading.sin_cos();
    Vec3::new(
        local.x * cos + local.z * sin,
        local.y,
        -local.x * sin + local.z * cos,
    )
}

/// Inverse of [`local_to_world`].
#[must_use]
pub fn world_to_local(heading: f32, world: Vec3) -> Vec3 {
    local_to_world(-heading, world)
}

/// Distance between two points ignoring their heights.
#[must_use]
pub fn distance_projected(a: Vec3, b: Vec3) -> f32 {
    Vec2::new(a.x - b.x, a.z - b.z).length()
}

/// Planar `(x, z)` components of a position.
#[must_use]
pub fn planar(position: Vec3) -> Vec2 {
    Vec2::new(position.x, position.z)
}

/// Returns true when `angle` lies strictly inside the rear half-turn.
#[must_use]
pub fn is_behind(angle: f32) -> bool {
    let a = norm_angle(angle);
    a > PI * 0.5 && a < PI * 1.5
}
