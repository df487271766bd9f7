//! Diesel plumbing: the pool, the table definitions and the row types.

pub mod connection;
pub mod model;
pub mod schema;
