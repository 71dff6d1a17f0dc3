//! Domain types and components for narrative presentation.

pub mod beat;
pub mod interlude;
pub mod message_queue;
