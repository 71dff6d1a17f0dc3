//! Descent — Mission Progression bounded context.
//!
//! Owns the floor index, the resource meters and the stage state machine,
//! and composes the message queue, the interlude player, the transition
//! controller and the achievement evaluator into one playthrough.

pub mod application;
pub mod domain;
