pub mod detection_queries;
pub mod entity_queries;

pub use detection_queries::*;
pub use entity_queries::*;
