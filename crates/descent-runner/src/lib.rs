//! Descent runner: plays a mission headlessly with an autopilot player.

pub mod autopilot;
pub mod clock;
pub mod config;
pub mod error;
pub mod hud;
pub mod rng;
pub mod runtime;
