pub mod api;
pub mod fixtures;

pub use api::*;
pub use fixtures::*;
