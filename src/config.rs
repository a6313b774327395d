//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;

use crate::can::protocol::{CAN_MAX_STANDARD_ID, DEFAULT_BASE_ADDRESS, MAX_BLOCK_OFFSET};
use crate::can::slcan::is_supported_bitrate;
use crate::error::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,

    #[serde(default)]
    pub can: CanConfig,

    #[serde(default)]
    pub publisher: PublisherConfig,

    #[serde(default)]
    pub journal: JournalConfig,
}

/// Serial adapter configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    /// Device path; empty means auto-detect
    #[serde(default)]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

/// CAN channel configuration
#[derive(Debug, Deserialize, Clone)]
pub struct CanConfig {
    /// Base address of the sensor ID block (deployment contract)
    #[serde(default = "default_base_address")]
    pub base_address: u16,

    /// Bus bitrate in bit/s
    #[serde(default = "default_bitrate")]
    pub bitrate: u32,
}

/// Publisher scheduling configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PublisherConfig {
    /// Publish period in milliseconds
    #[serde(default = "default_send_interval_ms")]
    pub send_interval_ms: u64,

    /// Host loop tick period in milliseconds
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

/// Snapshot journal configuration
#[derive(Debug, Deserialize, Clone)]
pub struct JournalConfig {
    #[serde(default = "default_journal_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,

    #[serde(default = "default_log_interval_ms")]
    pub log_interval_ms: u64,
}

// Default value functions
fn default_baud_rate() -> u32 { 115_200 }

fn default_base_address() -> u16 { DEFAULT_BASE_ADDRESS }
fn default_bitrate() -> u32 { 500_000 }

fn default_send_interval_ms() -> u64 { 1000 }
fn default_tick_interval_ms() -> u64 { 10 }

fn default_journal_enabled() -> bool { true }
fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }
fn default_log_interval_ms() -> u64 { 1000 }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: default_baud_rate(),
        }
    }
}

impl Default for CanConfig {
    fn default() -> Self {
        Self {
            base_address: default_base_address(),
            bitrate: default_bitrate(),
        }
    }
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            send_interval_ms: default_send_interval_ms(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            enabled: default_journal_enabled(),
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
            log_interval_ms: default_log_interval_ms(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            serial: SerialConfig::default(),
            can: CanConfig::default(),
            publisher: PublisherConfig::default(),
            journal: JournalConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        // Serial port may be empty (auto-detect), but the baud rate must be
        // one an SLCAN adapter actually talks
        if ![115_200, 230_400, 460_800, 921_600, 1_000_000, 2_000_000]
            .contains(&self.serial.baud_rate)
        {
            return Err(crate::error::EnviroBridgeError::Config(
                toml::de::Error::custom(
                    "baud_rate must be one of: 115200, 230400, 460800, 921600, 1000000, 2000000",
                ),
            ));
        }

        // The whole ID block must fit in the standard 11-bit range
        if u32::from(self.can.base_address) + u32::from(MAX_BLOCK_OFFSET)
            > u32::from(CAN_MAX_STANDARD_ID)
        {
            return Err(crate::error::EnviroBridgeError::Config(
                toml::de::Error::custom(format!(
                    "base_address must be at most {} so the ID block stays within 11 bits",
                    CAN_MAX_STANDARD_ID - MAX_BLOCK_OFFSET
                )),
            ));
        }

        if !is_supported_bitrate(self.can.bitrate) {
            return Err(crate::error::EnviroBridgeError::Config(
                toml::de::Error::custom(
                    "bitrate must be one of: 10000, 20000, 50000, 100000, 125000, 250000, 500000, 800000, 1000000",
                ),
            ));
        }

        if self.publisher.send_interval_ms == 0 || self.publisher.send_interval_ms > 60000 {
            return Err(crate::error::EnviroBridgeError::Config(
                toml::de::Error::custom("send_interval_ms must be between 1 and 60000"),
            ));
        }

        if self.publisher.tick_interval_ms == 0 {
            return Err(crate::error::EnviroBridgeError::Config(
                toml::de::Error::custom("tick_interval_ms must be greater than 0"),
            ));
        }

        // The idle entry tick plus seven send ticks must fit in one period
        if self.publisher.tick_interval_ms.saturating_mul(8) > self.publisher.send_interval_ms {
            return Err(crate::error::EnviroBridgeError::Config(
                toml::de::Error::custom(
                    "tick_interval_ms is too coarse: eight ticks must fit within send_interval_ms",
                ),
            ));
        }

        if self.journal.enabled && self.journal.log_dir.is_empty() {
            return Err(crate::error::EnviroBridgeError::Config(
                toml::de::Error::custom("journal log_dir cannot be empty when enabled"),
            ));
        }

        if self.journal.max_records_per_file == 0 {
            return Err(crate::error::EnviroBridgeError::Config(
                toml::de::Error::custom("max_records_per_file must be greater than 0"),
            ));
        }

        if self.journal.max_files_to_keep == 0 {
            return Err(crate::error::EnviroBridgeError::Config(
                toml::de::Error::custom("max_files_to_keep must be greater than 0"),
            ));
        }

        if self.journal.log_interval_ms == 0 || self.journal.log_interval_ms > 60000 {
            return Err(crate::error::EnviroBridgeError::Config(
                toml::de::Error::custom("log_interval_ms must be between 1 and 60000"),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();

        assert_eq!(config.serial.port, "");
        assert_eq!(config.serial.baud_rate, 115_200);
        assert_eq!(config.can.base_address, 77);
        assert_eq!(config.can.bitrate, 500_000);
        assert_eq!(config.publisher.send_interval_ms, 1000);
        assert_eq!(config.publisher.tick_interval_ms, 10);
        assert!(config.journal.enabled);
        assert_eq!(config.journal.log_dir, "./logs");
        assert_eq!(config.journal.max_records_per_file, 10000);
        assert_eq!(config.journal.max_files_to_keep, 10);
        assert_eq!(config.journal.log_interval_ms, 1000);
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[serial]
port = "/dev/ttyACM1"

[can]
base_address = 100

[publisher]

[journal]
enabled = false
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyACM1");
        assert_eq!(config.can.base_address, 100);
        assert!(!config.journal.enabled);
        // Omitted sections and fields take their defaults
        assert_eq!(config.publisher.send_interval_ms, 1000);
        assert_eq!(config.can.bitrate, 500_000);
    }

    #[test]
    fn test_load_empty_file_gives_defaults() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"").unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.can.base_address, 77);
    }

    #[test]
    fn test_invalid_baud_rate() {
        let mut config = Config::default();
        config.serial.baud_rate = 9600;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_base_address_block_overflow() {
        let mut config = Config::default();
        config.can.base_address = 0x7FA; // 0x7FA + 6 > 0x7FF
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_base_address_block_at_limit() {
        let mut config = Config::default();
        config.can.base_address = 0x7F9; // 0x7F9 + 6 == 0x7FF
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_bitrate() {
        let mut config = Config::default();
        config.can.bitrate = 33_333;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_send_interval_zero() {
        let mut config = Config::default();
        config.publisher.send_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_send_interval_too_high() {
        let mut config = Config::default();
        config.publisher.send_interval_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tick_interval_zero() {
        let mut config = Config::default();
        config.publisher.tick_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tick_interval_too_coarse() {
        let mut config = Config::default();
        // 8 ticks of 200ms do not fit in a 1000ms period
        config.publisher.tick_interval_ms = 200;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tick_interval_exactly_fits() {
        let mut config = Config::default();
        config.publisher.tick_interval_ms = 125; // 8 * 125 == 1000
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_log_dir_when_enabled() {
        let mut config = Config::default();
        config.journal.enabled = true;
        config.journal.log_dir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir_when_disabled() {
        let mut config = Config::default();
        config.journal.enabled = false;
        config.journal.log_dir = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_max_records_per_file_zero() {
        let mut config = Config::default();
        config.journal.max_records_per_file = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_files_to_keep_zero() {
        let mut config = Config::default();
        config.journal.max_files_to_keep = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_interval_zero() {
        let mut config = Config::default();
        config.journal.log_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_interval_too_high() {
        let mut config = Config::default();
        config.journal.log_interval_ms = 60001;
        assert!(config.validate().is_err());
    }
}
