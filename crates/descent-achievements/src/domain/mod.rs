//! Achievement definitions and evaluation.

pub mod evaluator;
