//! Descent — Achievements bounded context.
//!
//! A bank of pure predicates evaluated at floor and mission completion. An
//! unlock is one-way; the unlocked set only grows during a playthrough.

pub mod domain;
