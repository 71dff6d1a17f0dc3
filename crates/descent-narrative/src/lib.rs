//! Descent — Narrative presentation bounded context.
//!
//! Responsible for delivering scripted dialogue beats one at a time through
//! the message queue, and for playing linear interludes between floors.

pub mod domain;
