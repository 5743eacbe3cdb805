use serde::{Deserialize, Serialize};

/// Order lifecycle status as reported on the order stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Order has remaining size resting in the book
    #[serde(rename = "E")]
    Executable,
    /// Order is fully matched, cancelled, lapsed or voided
    #[serde(rename = "EC")]
    ExecutionComplete,
}

impl OrderStatus {
    /// Returns true if the order will receive no further updates
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::ExecutionComplete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_and_terminal() {
        let status: OrderStatus = serde_json::from_str("\"EC\"").unwrap();
        assert_eq!(status, OrderStatus::ExecutionComplete);
        assert!(status.is_terminal());
        assert!(!OrderStatus::Executable.is_terminal());
    }
}
