//! Error types for the gateway

/// Result type alias
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Startup and transport failures.
///
/// Malformed input on the wire never produces one of these; it is counted
/// by the component that saw it and dropped.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// Configuration parsed but a value is out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Listening socket could not be bound
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    /// Transport stopped delivering bytes
    #[error("Transport closed")]
    TransportClosed,
}
