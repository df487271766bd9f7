//! Exchange-agnostic domain types: jobs, pairs, positions and strategies.

pub mod error;
pub mod job;
pub mod money;
pub mod pair;
pub mod position;
pub mod setting;
pub mod settlement;
pub mod strategy;
pub mod trade;
