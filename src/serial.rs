//! UART transport for desktop using serialport crate
//!
//! The MFRC522 selects its host interface from the I2C/EA pin levels at power-up.
//! In UART mode every register access starts with an address byte: bit 7 set for a read,
//! bits 5..0 for the register. Reads answer with the register value, writes echo the address.

use crate::transport::PcdTransport;
use std::io::{self, Read, Write};
use std::time::Duration;

pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialTransport {
    /// The module powers up at 9600 baud.
    pub const DEFAULT_BAUD_RATE: u32 = 9600;

    pub fn new(port_name: &str, baud_rate: u32) -> Result<Self, serialport::Error> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(Duration::from_millis(100))
            .open()?;
        std::thread::sleep(Duration::from_millis(500));
        port.clear(serialport::ClearBuffer::Input)?;

        Ok(Self { port })
    }
}

impl PcdTransport for SerialTransport {
    type Error = io::Error;

    fn read_register(&mut self, reg: u8) -> Result<u8, Self::Error> {
        self.port.write_all(&[0x80 | (reg & 0x3F)])?;
        let mut value = [0u8; 1];
        self.port.read_exact(&mut value)?;
        Ok(value[0])
    }

    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), Self::Error> {
        let address = reg & 0x3F;
        self.port.write_all(&[address, value])?;
        let mut echo = [0u8; 1];
        self.port.read_exact(&mut echo)?;
        if echo[0] != address {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("expected echo 0x{:02X}, got 0x{:02X}", address, echo[0]),
            ));
        }
        Ok(())
    }
}
