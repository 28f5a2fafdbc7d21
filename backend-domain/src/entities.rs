// Domain entities

pub mod batch;
pub mod config;
pub mod detection;
pub mod entity_state;
pub mod event;

pub use batch::*;
pub use config::*;
pub use detection::*;
pub use entity_state::*;
pub use event::*;
