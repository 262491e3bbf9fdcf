//! Configuration of the whole engine, resolved from the environment, a YAML file and the defaults.
mod base;
mod constant;
mod entity;

pub use base::*;
pub use constant::*;
pub use entity::*;
