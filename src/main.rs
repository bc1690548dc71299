//! # X2D Codec CLI
//!
//! Encode, decode, send and receive X2D radio messages.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};

use x2d_codec::config::Config;
use x2d_codec::radio::{open_serial, RadioPort, StreamPort, X2dRadio};
use x2d_codec::x2d::checksum::seal;
use x2d_codec::x2d::decoder::{decode_capture, FrameReport};
use x2d_codec::x2d::encoder::encode_burst;
use x2d_codec::x2d::protocol::{from_hex, to_hex};

#[derive(Parser, Debug)]
#[command(name = "x2d-codec", version, about = "X2D radio message codec")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, value_name = "PATH", global = true, env = "X2D_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode a message into air bytes (hex)
    Encode {
        /// Message bytes in hex
        message: String,

        /// Message already carries its checksum
        #[arg(long)]
        raw: bool,
    },

    /// Decode a capture and print one JSON line per frame
    Decode {
        /// Capture bytes in hex
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        capture: Option<String>,

        /// Read the capture from a binary file
        #[arg(short, long, value_name = "PATH")]
        file: Option<PathBuf>,
    },

    /// Send a message through the radio bridge
    Send {
        /// Message body in hex, checksum is appended
        message: String,

        /// Serial device (defaults to link.device)
        #[arg(short, long)]
        device: Option<String>,
    },

    /// Print messages received until end of input or Ctrl+C
    Listen {
        /// Serial device (defaults to link.device)
        #[arg(short, long)]
        device: Option<String>,

        /// Read captures from a file instead of a serial device
        #[arg(short, long, value_name = "PATH", conflicts_with = "device")]
        input: Option<PathBuf>,
    },
}

fn parse_hex(text: &str) -> Result<Vec<u8>> {
    match from_hex(text) {
        Some(bytes) => Ok(bytes),
        None => bail!("invalid hex: {:?}", text),
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(Config::default()),
    }
}

/// Print every message received on `radio` as a JSON line
async fn listen<P: RadioPort>(mut radio: X2dRadio<P>) -> Result<()> {
    let mut count: u64 = 0;

    loop {
        tokio::select! {
            received = radio.receive_messages() => {
                let Some(messages) = received? else {
                    info!("End of input");
                    break;
                };
                for message in messages {
                    println!("{}", FrameReport::new(&seal(&message)).to_json_line()?);
                    count += 1;
                }
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    info!("Total messages received: {}", count);
    Ok(())
}

/// Main entry point for the X2D codec CLI
///
/// # Errors
///
/// Returns error if:
/// - The configuration cannot be loaded
/// - A hex argument is malformed
/// - A message does not fit a burst
/// - The radio bridge cannot be opened or fails
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Command::Encode { message, raw } => {
            let message = parse_hex(&message)?;
            let message = if raw { message } else { seal(&message) };
            let air = encode_burst(&config, &message)?;
            println!("{}", to_hex(&air));
        }
        Command::Decode { capture, file } => {
            let capture = match (capture, file) {
                (Some(text), _) => parse_hex(&text)?,
                (None, Some(path)) => tokio::fs::read(&path)
                    .await
                    .with_context(|| format!("failed to read {}", path.display()))?,
                (None, None) => bail!("no capture given"),
            };

            let frames = decode_capture(&config, &capture)?;
            if frames.is_empty() {
                warn!("No frame found in {} bytes", capture.len());
            }
            for frame in frames {
                println!("{}", FrameReport::new(&frame).to_json_line()?);
            }
        }
        Command::Send { message, device } => {
            let body = parse_hex(&message)?;
            let device = device.unwrap_or_else(|| config.link.device.clone());
            let port = StreamPort::new(
                open_serial(&device, config.link.baud_rate)?,
                config.link.capture_len,
            );

            let mut radio = X2dRadio::new(port, config);
            radio.send_message(&body).await?;
            info!("Sent {}", to_hex(&body));
        }
        Command::Listen { device, input } => {
            info!("X2D codec v{} listening...", env!("CARGO_PKG_VERSION"));
            info!("Press Ctrl+C to exit");

            let capture_len = config.link.capture_len;
            match input {
                Some(path) => {
                    let file = tokio::fs::File::open(&path)
                        .await
                        .with_context(|| format!("failed to open {}", path.display()))?;
                    listen(X2dRadio::new(StreamPort::new(file, capture_len), config)).await?;
                }
                None => {
                    let device = device.unwrap_or_else(|| config.link.device.clone());
                    let serial = open_serial(&device, config.link.baud_rate)?;
                    listen(X2dRadio::new(StreamPort::new(serial, capture_len), config)).await?;
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_encode() {
        let cli = Cli::try_parse_from(["x2d-codec", "encode", "2f683e0005941a"]).unwrap();
        assert!(matches!(cli.command, Command::Encode { raw: false, .. }));
    }

    #[test]
    fn test_parses_global_config() {
        let cli = Cli::try_parse_from(["x2d-codec", "listen", "--config", "x2d.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("x2d.toml")));
    }

    #[test]
    fn test_decode_requires_input() {
        let err = Cli::try_parse_from(["x2d-codec", "decode"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_decode_rejects_both_inputs() {
        let err = Cli::try_parse_from(["x2d-codec", "decode", "00", "--file", "capture.bin"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_listen_rejects_device_and_input() {
        let err = Cli::try_parse_from([
            "x2d-codec",
            "listen",
            "--device",
            "/dev/ttyUSB0",
            "--input",
            "capture.bin",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("fe 78").unwrap(), vec![0xFE, 0x78]);
        assert!(parse_hex("f").is_err());
    }

    #[test]
    fn test_default_config_without_path() {
        let config = load_config(None).unwrap();
        assert_eq!(config.codec.buffer_capacity, 64);
    }
}
