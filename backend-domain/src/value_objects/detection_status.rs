// Detection status value object

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DetectionStatus {
    Open,
    Confirmed,
    Dismissed,
}

impl DetectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionStatus::Open => "OPEN",
            DetectionStatus::Confirmed => "CONFIRMED",
            DetectionStatus::Dismissed => "DISMISSED",
        }
    }
}

impl From<&str> for DetectionStatus {
    fn from(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "CONFIRMED" => DetectionStatus::Confirmed,
            "DISMISSED" => DetectionStatus::Dismissed,
            _ => DetectionStatus::Open,
        }
    }
}
