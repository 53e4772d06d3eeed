//! Error types for the ACD test harness

use thiserror::Error;

/// Result type alias for harness operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the ACD test harness
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error, such as an unreadable capture export
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid parameter error
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Interface not found
    #[error("Interface '{0}' not found")]
    InterfaceNotFound(String),

    /// Interface error
    #[error("Interface error: {0}")]
    Interface(String),

    /// Frame transmission failed
    #[error("Transmit error: {0}")]
    Transmit(String),

    /// Packet parsing error
    #[error("Packet parsing error: {0}")]
    PacketParsing(String),

    /// Capture error
    #[error("Packet capture error: {0}")]
    Capture(String),
}

impl Error {
    /// Create an invalid parameter error
    pub fn invalid_parameter<N: Into<String>, R: Into<String>>(name: N, reason: R) -> Self {
        Error::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a packet parsing error with a custom message
    pub fn parsing<S: Into<String>>(msg: S) -> Self {
        Error::PacketParsing(msg.into())
    }

    /// Create a transmit error with a custom message
    pub fn transmit<S: Into<String>>(msg: S) -> Self {
        Error::Transmit(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_parameter_display() {
        let err = Error::invalid_parameter("device-mac", "expected XX:XX:XX:XX:XX:XX");
        assert_eq!(
            err.to_string(),
            "Invalid parameter 'device-mac': expected XX:XX:XX:XX:XX:XX"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
