//! Routing module
//!
//! Maps method + path to an endpoint through a table of typed route
//! predicates:
//! - Literal and `{param}` path segments
//! - 404 when no pattern matches, 405 when only the method differs

mod matcher;
mod table;

pub use matcher::PathParams;
pub use table::{Endpoint, Resolution, RouteTable};
