// Retention tier value object

use serde::{Deserialize, Serialize};

/// Terminal classification outcome for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetentionTier {
    /// Structurally significant action; stored unconditionally.
    AlwaysStore,
    /// Quantitative signal cleared an interest threshold.
    ThresholdStore,
    /// Updates rolling statistics only; the raw event is discarded.
    StatsOnly,
}

impl RetentionTier {
    pub fn is_stored(&self) -> bool {
        !matches!(self, RetentionTier::StatsOnly)
    }
}
