//! Descent — Content Authoring bounded context.
//!
//! Responsible for YAML mission script ingestion, validation, compilation
//! into shared beat lists, and hashing.

pub mod domain;
