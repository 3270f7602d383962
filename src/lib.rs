pub mod common;
pub mod model;
