//! Domain types for floor-to-floor transitions.

pub mod controller;
