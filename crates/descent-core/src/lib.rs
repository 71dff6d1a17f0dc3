//! Descent Core — shared domain abstractions.
//!
//! This crate defines the fundamental traits and types that every bounded
//! context depends on: time, timers, events, commands and the resource
//! meters the mission orchestrator owns. It contains no infrastructure code.

pub mod aggregate;
pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod floor;
pub mod resources;
pub mod rng;
pub mod sink;
pub mod timer;
