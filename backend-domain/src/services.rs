// Domain services

pub mod accumulator;
pub mod classifier;
pub mod scorer;
pub mod validator;

pub use accumulator::*;
pub use classifier::*;
pub use scorer::*;
pub use validator::*;
