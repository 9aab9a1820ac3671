//! MFRC522 (RC522) RFID card poller with support for multiple transport backends.
//!
//! The reader is polled for a new ISO/IEC 14443-A card; each card found is printed as its
//! UID and card type, then halted before polling resumes.
//!
//! # Features
//!
//! - `spi-esp32` - SPI transport for ESP32 using esp-idf-svc
//! - `spidev` - SPI transport for Linux using the spidev crate, plus the `rc522-poll` binary
//! - `serial` - UART transport for desktop using serialport crate
//!
//! # Example
//!
//! ```ignore
//! use rc522_poll::{Mfrc522, PollConfig, Poller, SpidevTransport};
//!
//! let transport = SpidevTransport::new("/dev/spidev0.0", 1_000_000)?;
//! let mut poller = Poller::new(Mfrc522::new(transport), PollConfig::default());
//!
//! let mut out = std::io::stdout().lock();
//! poller.start(&mut out)?;
//! poller.run(&mut out)?;
//! ```

mod poller;
mod reader;
mod transport;
mod types;

#[cfg(feature = "spi-esp32")]
mod spi_esp32;

#[cfg(feature = "spidev")]
mod spi_linux;

#[cfg(feature = "serial")]
mod serial;

// Re-exports
pub use poller::{CardReader, PollConfig, PollOutcome, PollStats, Poller};
pub use reader::Mfrc522;
pub use transport::PcdTransport;
pub use types::{chip_version_name, CardRead, PiccType, Rc522Error, Uid};

#[cfg(feature = "spi-esp32")]
pub use spi_esp32::EspSpiTransport;

#[cfg(feature = "spidev")]
pub use spi_linux::SpidevTransport;

#[cfg(feature = "serial")]
pub use serial::SerialTransport;
