//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every field has a default, so an empty file (or no file at all) gives
//! the stock X2D settings.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::codec::frame::{
    END_OF_FRAME, MAX_SUCCESSIVE_ONES, MIN_LEADING_ONES, MIN_LEADING_ZEROS, WATCHDOG_BITS,
};
use crate::error::{Result, X2dError};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub codec: CodecConfig,

    #[serde(default)]
    pub link: LinkConfig,
}

/// Codec pipeline configuration
#[derive(Debug, Deserialize, Clone)]
pub struct CodecConfig {
    /// Capacity of each intermediate pipeline buffer, in bytes
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,

    #[serde(default = "default_preamble_zeros")]
    pub preamble_zeros: u8,

    #[serde(default = "default_preamble_ones")]
    pub preamble_ones: u8,
}

/// Radio link configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LinkConfig {
    /// Serial device of the radio bridge
    #[serde(default = "default_device")]
    pub device: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Size of the transmit burst buffer, in bytes
    #[serde(default = "default_burst_capacity")]
    pub burst_capacity: usize,

    /// Carrier bytes sent ahead of the first frame
    #[serde(default = "default_lead_in")]
    pub lead_in: Vec<u8>,

    /// Prefix each capture with the sync header swallowed by the receiver
    #[serde(default = "default_restore_sync_header")]
    pub restore_sync_header: bool,

    /// Maximum bytes read per capture
    #[serde(default = "default_capture_len")]
    pub capture_len: usize,

    /// Longest sealed message accepted for transmission
    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,
}

// Default value functions
fn default_buffer_capacity() -> usize { 64 }
fn default_preamble_zeros() -> u8 { 9 }
fn default_preamble_ones() -> u8 { 6 }

fn default_device() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud_rate() -> u32 { 115200 }
fn default_burst_capacity() -> usize { 256 }
fn default_lead_in() -> Vec<u8> { vec![0xFF, 0xFF] }
fn default_restore_sync_header() -> bool { true }
fn default_capture_len() -> usize { 256 }
fn default_max_message_len() -> usize { 12 }

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: default_buffer_capacity(),
            preamble_zeros: default_preamble_zeros(),
            preamble_ones: default_preamble_ones(),
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            baud_rate: default_baud_rate(),
            burst_capacity: default_burst_capacity(),
            lead_in: default_lead_in(),
            restore_sync_header: default_restore_sync_header(),
            capture_len: default_capture_len(),
            max_message_len: default_max_message_len(),
        }
    }
}

impl CodecConfig {
    /// Longest payload the receiver is guaranteed to decode
    ///
    /// Two bounds apply. The worst-case encoding must fit the pipeline
    /// buffers: a stuffed bit every 5 payload bits, the preamble and 16
    /// marker bits, all doubled by the line code. And the stuffed body plus
    /// the END-OF-FRAME marker must stay within the decoder watchdog, or a
    /// frame that arrives in small reads is discarded before its end shows up.
    pub fn max_payload_len(&self) -> usize {
        let preamble = self.preamble_zeros as usize + self.preamble_ones as usize + 1;
        let budget = (4 * self.buffer_capacity).saturating_sub(preamble + 16);
        let buffered = budget * 5 / 48;

        let stuffed = MAX_SUCCESSIVE_ONES + 1;
        let watched = (WATCHDOG_BITS - END_OF_FRAME.len()) * MAX_SUCCESSIVE_ONES / stuffed / 8;

        buffered.min(watched)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use x2d_codec::config::Config;
    ///
    /// let config = Config::load("x2d.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
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
        // Pipeline buffers
        if self.codec.buffer_capacity < 16 || self.codec.buffer_capacity > 4096 {
            return Err(X2dError::Config(
                toml::de::Error::custom("buffer_capacity must be between 16 and 4096")
            ));
        }

        // The receiver must be able to lock onto what we send
        if (self.codec.preamble_zeros as usize) < MIN_LEADING_ZEROS || self.codec.preamble_zeros > 64 {
            return Err(X2dError::Config(
                toml::de::Error::custom(format!(
                    "preamble_zeros must be between {} and 64",
                    MIN_LEADING_ZEROS
                ))
            ));
        }

        if (self.codec.preamble_ones as usize) < MIN_LEADING_ONES || self.codec.preamble_ones > 64 {
            return Err(X2dError::Config(
                toml::de::Error::custom(format!(
                    "preamble_ones must be between {} and 64",
                    MIN_LEADING_ONES
                ))
            ));
        }

        // Serial link
        if self.link.device.is_empty() {
            return Err(X2dError::Config(
                toml::de::Error::custom("device cannot be empty")
            ));
        }

        if self.link.baud_rate == 0 {
            return Err(X2dError::Config(
                toml::de::Error::custom("baud_rate must be greater than 0")
            ));
        }

        // Transmit burst
        if self.link.burst_capacity < 32 || self.link.burst_capacity > 65536 {
            return Err(X2dError::Config(
                toml::de::Error::custom("burst_capacity must be between 32 and 65536")
            ));
        }

        if self.link.lead_in.len() > self.link.burst_capacity / 4 {
            return Err(X2dError::Config(
                toml::de::Error::custom("lead_in must fit in a quarter of burst_capacity")
            ));
        }

        // Receive
        if self.link.capture_len == 0 || self.link.capture_len > 4096 {
            return Err(X2dError::Config(
                toml::de::Error::custom("capture_len must be between 1 and 4096")
            ));
        }

        let max_payload = self.codec.max_payload_len();
        if self.link.max_message_len == 0 || self.link.max_message_len > max_payload {
            return Err(X2dError::Config(
                toml::de::Error::custom(format!(
                    "max_message_len must be between 1 and {}",
                    max_payload
                ))
            ));
        }

        Ok(())
    }
}
