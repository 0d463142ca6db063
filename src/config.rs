use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{GatewayError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub tcp: TcpConfig,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub ble: BleConfig,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub logging: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Directory where log files will be stored
    pub directory: String,
    /// Log file name prefix (date will be appended)
    pub file_prefix: String,
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            directory: "./logs".to_string(),
            file_prefix: "marine_gateway".to_string(),
            level: "info".to_string(),
        }
    }
}

/// UART the instruments are wired to
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    pub data_bits: u8,
    /// "none", "even" or "odd"
    pub parity: String,
    pub stop_bits: u8,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 38400,
            data_bits: 8,
            parity: "none".to_string(),
            stop_bits: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Longest accepted sentence, terminator included
    pub max_line_length: usize,
    /// Bounded wait for one line before checking shutdown and stats
    pub line_timeout_ms: u64,
    pub queue_capacity: usize,
    pub enqueue_timeout_ms: u64,
    pub adaptive_backpressure: bool,
    /// Consecutive enqueue failures before load shedding starts
    pub elevated_threshold: u32,
    /// Consecutive enqueue failures before the producer pauses
    pub severe_threshold: u32,
    pub severe_pause_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_line_length: 86,
            line_timeout_ms: 1000,
            queue_capacity: 40,
            enqueue_timeout_ms: 5,
            adaptive_backpressure: true,
            elevated_threshold: 5,
            severe_threshold: 20,
            severe_pause_ms: 50,
        }
    }
}

impl PipelineConfig {
    pub fn line_timeout(&self) -> Duration {
        Duration::from_millis(self.line_timeout_ms)
    }

    pub fn enqueue_timeout(&self) -> Duration {
        Duration::from_millis(self.enqueue_timeout_ms)
    }

    pub fn severe_pause(&self) -> Duration {
        Duration::from_millis(self.severe_pause_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpConfig {
    pub bind_address: String,
    pub port: u16,
    pub max_clients: usize,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 10110,
            max_clients: 5,
        }
    }
}

impl TcpConfig {
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub enabled: bool,
    pub bind_address: String,
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl WebConfig {
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BleConfig {
    pub enabled: bool,
    pub device_name: String,
    pub update_interval_ms: u64,
}

impl Default for BleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            device_name: "MarineGateway".to_string(),
            update_interval_ms: 1000,
        }
    }
}

impl BleConfig {
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Instrument data older than this is reported as null
    pub data_timeout_s: u64,
    pub ais_timeout_s: u64,
    pub max_ais_targets: usize,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            data_timeout_s: 10,
            ais_timeout_s: 60,
            max_ais_targets: 20,
        }
    }
}

impl StateConfig {
    pub fn data_timeout(&self) -> Duration {
        Duration::from_secs(self.data_timeout_s)
    }

    pub fn ais_timeout(&self) -> Duration {
        Duration::from_secs(self.ais_timeout_s)
    }
}

/// Line parity accepted by the UART.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParityMode {
    None,
    Even,
    Odd,
}

impl ParityMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "n" => Some(ParityMode::None),
            "even" | "e" => Some(ParityMode::Even),
            "odd" | "o" => Some(ParityMode::Odd),
            _ => None,
        }
    }
}

/// Transport settings handed to the serial layer at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UartSettings {
    pub port: String,
    pub baud_rate: u32,
    pub data_bits: u8,
    pub parity: ParityMode,
    pub stop_bits: u8,
}

/// Source of persisted UART settings.
pub trait SettingsProvider {
    fn uart_settings(&self) -> UartSettings;
}

impl SettingsProvider for Config {
    fn uart_settings(&self) -> UartSettings {
        UartSettings {
            port: self.serial.port.clone(),
            baud_rate: self.serial.baud_rate,
            data_bits: self.serial.data_bits,
            parity: ParityMode::parse(&self.serial.parity).unwrap_or(ParityMode::None),
            stop_bits: self.serial.stop_bits,
        }
    }
}

impl Config {
    /// Load and validate configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(GatewayError::InvalidConfig(msg));

        if self.serial.port.trim().is_empty() {
            return invalid("serial.port must not be empty".to_string());
        }
        if self.serial.baud_rate == 0 {
            return invalid("serial.baud_rate must be positive".to_string());
        }
        if !(5..=8).contains(&self.serial.data_bits) {
            return invalid(format!("serial.data_bits {} not in 5..=8", self.serial.data_bits));
        }
        if !(1..=2).contains(&self.serial.stop_bits) {
            return invalid(format!("serial.stop_bits {} not in 1..=2", self.serial.stop_bits));
        }
        if ParityMode::parse(&self.serial.parity).is_none() {
            return invalid(format!("serial.parity '{}' is not none/even/odd", self.serial.parity));
        }
        if self.pipeline.max_line_length < 16 {
            return invalid(format!(
                "pipeline.max_line_length {} is below 16",
                self.pipeline.max_line_length
            ));
        }
        if self.pipeline.queue_capacity == 0 {
            return invalid("pipeline.queue_capacity must be positive".to_string());
        }
        if self.pipeline.elevated_threshold == 0 {
            return invalid("pipeline.elevated_threshold must be positive".to_string());
        }
        if self.pipeline.elevated_threshold > self.pipeline.severe_threshold {
            return invalid(format!(
                "pipeline.elevated_threshold {} exceeds severe_threshold {}",
                self.pipeline.elevated_threshold, self.pipeline.severe_threshold
            ));
        }
        if self.tcp.max_clients == 0 {
            return invalid("tcp.max_clients must be positive".to_string());
        }
        if self.state.max_ais_targets == 0 {
            return invalid("state.max_ais_targets must be positive".to_string());
        }
        if self.state.data_timeout_s == 0 || self.state.ais_timeout_s == 0 {
            return invalid("state timeouts must be positive".to_string());
        }
        if self.ble.update_interval_ms == 0 {
            return invalid("ble.update_interval_ms must be positive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.serial.baud_rate, 38400);
        assert_eq!(config.serial.data_bits, 8);
        assert_eq!(config.serial.parity, "none");
        assert_eq!(config.serial.stop_bits, 1);
        assert_eq!(config.pipeline.max_line_length, 86);
        assert_eq!(config.pipeline.queue_capacity, 40);
        assert_eq!(config.tcp.port, 10110);
        assert_eq!(config.tcp.max_clients, 5);
        assert_eq!(config.state.data_timeout_s, 10);
        assert_eq!(config.state.ais_timeout_s, 60);
        assert_eq!(config.state.max_ais_targets, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_pipeline_durations() {
        let config = PipelineConfig::default();
        assert_eq!(config.line_timeout(), Duration::from_millis(1000));
        assert_eq!(config.enqueue_timeout(), Duration::from_millis(5));
        assert_eq!(config.severe_pause(), Duration::from_millis(50));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let json = r#"{
            "serial": { "port": "/dev/ttyAMA0", "baud_rate": 4800 },
            "tcp": { "max_clients": 3 }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyAMA0");
        assert_eq!(config.serial.baud_rate, 4800);
        assert_eq!(config.serial.data_bits, 8);
        assert_eq!(config.tcp.max_clients, 3);
        assert_eq!(config.tcp.port, 10110);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_uart() {
        let mut config = Config::default();
        config.serial.data_bits = 9;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.serial.parity = "mark".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.serial.stop_bits = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_capacities() {
        let mut config = Config::default();
        config.pipeline.queue_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.tcp.max_clients = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.pipeline.max_line_length = 8;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_backpressure_thresholds() {
        let mut config = Config::default();
        config.pipeline.elevated_threshold = 0;
        assert!(config.validate().is_err());

        config.pipeline.elevated_threshold = 21;
        config.pipeline.severe_threshold = 20;
        assert!(config.validate().is_err());

        config.pipeline.elevated_threshold = 20;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_settings_provider() {
        let mut config = Config::default();
        config.serial.parity = "Even".to_string();
        config.serial.stop_bits = 2;
        let settings = config.uart_settings();
        assert_eq!(settings.baud_rate, 38400);
        assert_eq!(settings.parity, ParityMode::Even);
        assert_eq!(settings.stop_bits, 2);
    }

    #[test]
    fn test_log_config_serialization() {
        let log_config = LogConfig {
            directory: "/var/log/gateway".to_string(),
            file_prefix: "gw".to_string(),
            level: "debug".to_string(),
        };

        let json = serde_json::to_string(&log_config).unwrap();
        let deserialized: LogConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.directory, "/var/log/gateway");
        assert_eq!(deserialized.file_prefix, "gw");
        assert_eq!(deserialized.level, "debug");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        match Config::from_file("/nonexistent/config.json") {
            Err(GatewayError::Io(_)) => {}
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
    }
}
