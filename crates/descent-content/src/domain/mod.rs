//! Domain layer for the Content Authoring context.

pub mod script;
pub mod tuning;
