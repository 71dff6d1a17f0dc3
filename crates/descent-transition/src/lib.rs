//! Descent — Stage Transition bounded context.
//!
//! Plays the timed three-phase hand-off between two floors (descent, arrival,
//! doors) and reports a single completion.

pub mod domain;
