//! Polls an MFRC522 wired to the first SPI bus of a Linux board and prints every card
//! that comes into range.
//!
//! # Connections (Raspberry Pi)
//!
//! - 3V3    = VCC
//! - GND    = GND
//! - GPIO8  = SDA (CE0)
//! - GPIO9  = MISO
//! - GPIO10 = MOSI
//! - GPIO11 = SCK
//! - RST    = 3V3

use log::{error, info};
use rc522_poll::{Mfrc522, PollConfig, Poller, SpidevTransport};
use std::io;

const SPI_DEVICE: &str = "/dev/spidev0.0";
const SPI_MAX_SPEED_HZ: u32 = 1_000_000;

fn main() -> io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let transport = SpidevTransport::new(SPI_DEVICE, SPI_MAX_SPEED_HZ)
        .inspect_err(|e| error!("Opening SPI device {}: {}", SPI_DEVICE, e))?;
    info!("Opened {} at {} Hz", SPI_DEVICE, SPI_MAX_SPEED_HZ);

    let mut poller = Poller::new(Mfrc522::new(transport), PollConfig::default());
    let mut out = io::stdout().lock();
    poller.start(&mut out)?;
    poller
        .run(&mut out)
        .inspect_err(|e| error!("Console write failed, stopping: {}", e))
}
