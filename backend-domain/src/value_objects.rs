// Domain value objects
pub mod action_type;
pub mod detection_status;
pub mod identifiers;
pub mod retention_tier;

pub use action_type::*;
pub use detection_status::*;
pub use identifiers::*;
pub use retention_tier::*;
