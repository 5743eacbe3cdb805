use serde::{Deserialize, Serialize};

/// Outcome reported on a status record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    Success,
    Failure,
}

/// Error codes the venue attaches to a failed status record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NoAppKey,
    InvalidAppKey,
    NoSession,
    InvalidSessionInformation,
    NotAuthorized,
    InvalidInput,
    InvalidClock,
    UnexpectedError,
    Timeout,
    SubscriptionLimitExceeded,
    InvalidRequest,
    ConnectionFailed,
    MaxConnectionLimitExceeded,
    TooManyRequests,
    #[serde(other)]
    Unknown,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoAppKey => "NO_APP_KEY",
            Self::InvalidAppKey => "INVALID_APP_KEY",
            Self::NoSession => "NO_SESSION",
            Self::InvalidSessionInformation => "INVALID_SESSION_INFORMATION",
            Self::NotAuthorized => "NOT_AUTHORIZED",
            Self::InvalidInput => "INVALID_INPUT",
            Self::InvalidClock => "INVALID_CLOCK",
            Self::UnexpectedError => "UNEXPECTED_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::SubscriptionLimitExceeded => "SUBSCRIPTION_LIMIT_EXCEEDED",
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::ConnectionFailed => "CONNECTION_FAILED",
            Self::MaxConnectionLimitExceeded => "MAX_CONNECTION_LIMIT_EXCEEDED",
            Self::TooManyRequests => "TOO_MANY_REQUESTS",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_wire_names() {
        let code: ErrorCode = serde_json::from_str("\"NO_APP_KEY\"").unwrap();
        assert_eq!(code, ErrorCode::NoAppKey);
        assert_eq!(code.to_string(), "NO_APP_KEY");

        let unknown: ErrorCode = serde_json::from_str("\"SOMETHING_NEW\"").unwrap();
        assert_eq!(unknown, ErrorCode::Unknown);
    }
}
