//! Types and helpers shared across the loading and routing stages.

pub mod bbox;
pub mod config;
pub mod error;
pub mod geo_math;
pub mod graph_data;
