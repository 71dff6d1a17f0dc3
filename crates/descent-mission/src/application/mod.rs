//! Application layer for the Mission Progression context.

pub mod command_handlers;
pub mod query_handlers;
