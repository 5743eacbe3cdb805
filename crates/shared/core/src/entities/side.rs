use serde::{Deserialize, Serialize};

/// Order side (Back or Lay)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename = "B")]
    Back,
    #[serde(rename = "L")]
    Lay,
}
