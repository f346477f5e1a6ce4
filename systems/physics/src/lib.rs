#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Frame-by-frame motion integration for movers.
//!
//! A [`Physics`] body turns the motor inputs written through
//! [`waypoint_core::Movable`] into linear and circular speeds, slides on
//! slopes, follows the floor, takes off and lands when it flies, and bounces
//! off crash spheres it newly touches. Side effects that concern other
//! objects are reported in a [`FrameOutcome`] for the caller to turn into
//! world commands.

mod body;
mod motion;

pub use body::{Damage, DamageCause, FrameOutcome, Impulse, Physics, Vibration};
pub use motion::Motion;
