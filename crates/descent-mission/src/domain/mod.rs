//! Domain layer for the Mission Progression context.

pub mod aggregates;
pub mod commands;
pub mod events;
pub mod stage;
