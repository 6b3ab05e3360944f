//! Generation of routes from an enriched road graph, along with the checks
//! applied to each candidate along the way.

pub mod common;
pub mod search;
pub mod validation;
