//! SPI transport for Linux single-board computers using the spidev crate

use crate::transport::{PcdTransport, spi_address, spi_read_frame, spi_write_frame};
use spidev::{SpiModeFlags, Spidev, SpidevOptions, SpidevTransfer};
use std::io;

pub struct SpidevTransport {
    spi: Spidev,
}

impl SpidevTransport {
    /// Open and configure `path` (e.g. `/dev/spidev0.0`) for SPI mode 0.
    pub fn new(path: &str, max_speed_hz: u32) -> io::Result<Self> {
        let mut spi = Spidev::open(path)?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(max_speed_hz)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        spi.configure(&options)?;

        Ok(Self { spi })
    }

    fn transfer(&mut self, frame: &mut [u8]) -> io::Result<()> {
        let tx = frame.to_vec();
        let mut transfer = SpidevTransfer::read_write(&tx, frame);
        self.spi.transfer(&mut transfer)
    }
}

impl PcdTransport for SpidevTransport {
    type Error = io::Error;

    fn read_register(&mut self, reg: u8) -> Result<u8, Self::Error> {
        let mut frame = [spi_address(reg, true), 0x00];
        self.transfer(&mut frame)?;
        Ok(frame[1])
    }

    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), Self::Error> {
        let mut frame = [spi_address(reg, false), value];
        self.transfer(&mut frame)
    }

    fn read_registers(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        if buf.is_empty() {
            return Ok(());
        }
        let mut frame = spi_read_frame(reg, buf.len());
        self.transfer(&mut frame)?;
        buf.copy_from_slice(&frame[1..]);
        Ok(())
    }

    fn write_registers(&mut self, reg: u8, values: &[u8]) -> Result<(), Self::Error> {
        if values.is_empty() {
            return Ok(());
        }
        let mut frame = spi_write_frame(reg, values);
        self.transfer(&mut frame)
    }
}
