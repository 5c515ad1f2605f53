use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AscentError {
    #[error("Telemetry unavailable: {0}")]
    TelemetryUnavailable(String),

    #[error("Command rejected: {0}")]
    CommandRejected(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AscentError {
    /// Process exit code reported by the `ascent` binary for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            AscentError::InvalidTarget(_) | AscentError::InvalidConfig(_) => 1,
            AscentError::TelemetryUnavailable(_) => 3,
            AscentError::CommandRejected(_) => 4,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AscentError::TelemetryUnavailable(_) | AscentError::CommandRejected(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_per_failure() {
        let telemetry = AscentError::TelemetryUnavailable("link down".to_string());
        let rejected = AscentError::CommandRejected("not controllable".to_string());
        let target = AscentError::InvalidTarget("negative".to_string());

        assert_eq!(telemetry.exit_code(), 3);
        assert_eq!(rejected.exit_code(), 4);
        assert_eq!(target.exit_code(), 1);
        assert_ne!(telemetry.exit_code(), 0, "Fatal errors must not exit with 0");
    }

    #[test]
    fn test_only_link_errors_are_fatal() {
        assert!(AscentError::TelemetryUnavailable(String::new()).is_fatal());
        assert!(AscentError::CommandRejected(String::new()).is_fatal());
        assert!(!AscentError::InvalidConfig(String::new()).is_fatal());
    }

    #[test]
    fn test_error_messages() {
        let err = AscentError::TelemetryUnavailable("connection reset".to_string());
        assert_eq!(err.to_string(), "Telemetry unavailable: connection reset");
    }
}
