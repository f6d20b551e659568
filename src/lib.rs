//! Panel cutting-layout optimizer.
//!
//! Packs rectangular pieces onto stock sheets with saw-kerf clearance using
//! one of three heuristics, then scores the resulting layout for waste and
//! cost.

pub mod catalog;
pub mod error;
pub mod evaluate;
pub mod guillotine;
pub mod render;
pub mod solver;
pub mod strategy;
pub mod types;

pub use error::{Error, Result};
