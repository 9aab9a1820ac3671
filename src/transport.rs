/// Trait for MFRC522 register access backends.
/// Implement this trait for different host interfaces (SPI, UART, etc.)
pub trait PcdTransport {
    /// Error type for transport operations
    type Error: std::fmt::Debug;

    /// Read a single register
    fn read_register(&mut self, reg: u8) -> Result<u8, Self::Error>;

    /// Write a single register
    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), Self::Error>;

    /// Read `buf.len()` values from the same register (used to drain the FIFO)
    fn read_registers(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        for byte in buf.iter_mut() {
            *byte = self.read_register(reg)?;
        }
        Ok(())
    }

    /// Write every value to the same register (used to fill the FIFO)
    fn write_registers(&mut self, reg: u8, values: &[u8]) -> Result<(), Self::Error> {
        for &value in values {
            self.write_register(reg, value)?;
        }
        Ok(())
    }

    /// Pulse the module's reset line.
    /// Returns `false` when the transport has no reset line wired.
    fn hard_reset(&mut self) -> Result<bool, Self::Error> {
        Ok(false)
    }
}

/// SPI address byte: bit 7 selects read, bits 6..1 carry the register, bit 0 is zero.
#[cfg(any(feature = "spidev", feature = "spi-esp32"))]
pub(crate) const fn spi_address(reg: u8, read: bool) -> u8 {
    let address = (reg << 1) & 0x7E;
    if read { address | 0x80 } else { address }
}

/// Frame for a burst read of one register: the address repeated, closed by a zero byte.
/// Byte `i + 1` of the transferred frame holds value `i`.
#[cfg(any(feature = "spidev", feature = "spi-esp32"))]
pub(crate) fn spi_read_frame(reg: u8, count: usize) -> Vec<u8> {
    let mut frame = vec![spi_address(reg, true); count + 1];
    frame[count] = 0x00;
    frame
}

/// Frame for a burst write of one register.
#[cfg(any(feature = "spidev", feature = "spi-esp32"))]
pub(crate) fn spi_write_frame(reg: u8, values: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(values.len() + 1);
    frame.push(spi_address(reg, false));
    frame.extend_from_slice(values);
    frame
}
