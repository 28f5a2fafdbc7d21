// Ports (interfaces to infrastructure)
pub mod repositories;

pub use repositories::*;
