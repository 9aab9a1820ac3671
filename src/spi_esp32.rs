//! SPI transport for ESP32 using esp-idf-svc

use crate::transport::{PcdTransport, spi_address, spi_read_frame, spi_write_frame};
use esp_idf_hal::gpio::{AnyOutputPin, InputPin, Output, OutputPin, PinDriver};
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::spi::{self, SpiAnyPins, SpiDeviceDriver, SpiDriver};
use esp_idf_hal::units::FromValueType;
use esp_idf_svc::sys::EspError;
use std::time::Duration;

pub struct EspSpiTransport<'a> {
    spi: SpiDeviceDriver<'a, SpiDriver<'a>>,
    reset: Option<PinDriver<'a, AnyOutputPin, Output>>,
}

impl<'a> EspSpiTransport<'a> {
    /// Bring up the SPI master and attach the reader as a mode 0 device on `cs`.
    /// `reset` is the module's RST line; without it the driver falls back to a soft reset.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        spi: impl Peripheral<P = impl SpiAnyPins> + 'a,
        sclk: impl Peripheral<P = impl OutputPin> + 'a,
        mosi: impl Peripheral<P = impl OutputPin> + 'a,
        miso: impl Peripheral<P = impl InputPin> + 'a,
        cs: impl Peripheral<P = impl OutputPin> + 'a,
        reset: Option<AnyOutputPin>,
        baud_rate_hz: u32,
    ) -> Result<Self, EspError> {
        let driver = SpiDriver::new(
            spi,
            sclk,
            mosi,
            Some(miso),
            &spi::config::DriverConfig::new(),
        )?;
        let config = spi::config::Config::new().baudrate(baud_rate_hz.Hz());
        let spi = SpiDeviceDriver::new(driver, Some(cs), &config)?;
        let reset = reset.map(|pin| PinDriver::output(pin)).transpose()?;

        Ok(Self { spi, reset })
    }
}

impl PcdTransport for EspSpiTransport<'_> {
    type Error = EspError;

    fn read_register(&mut self, reg: u8) -> Result<u8, Self::Error> {
        let mut frame = [spi_address(reg, true), 0x00];
        self.spi.transfer_in_place(&mut frame)?;
        Ok(frame[1])
    }

    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), Self::Error> {
        self.spi.write(&[spi_address(reg, false), value])
    }

    fn read_registers(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        if buf.is_empty() {
            return Ok(());
        }
        let mut frame = spi_read_frame(reg, buf.len());
        self.spi.transfer_in_place(&mut frame)?;
        buf.copy_from_slice(&frame[1..]);
        Ok(())
    }

    fn write_registers(&mut self, reg: u8, values: &[u8]) -> Result<(), Self::Error> {
        if values.is_empty() {
            return Ok(());
        }
        self.spi.write(&spi_write_frame(reg, values))
    }

    fn hard_reset(&mut self) -> Result<bool, Self::Error> {
        let Some(pin) = self.reset.as_mut() else {
            return Ok(false);
        };
        pin.set_low()?;
        std::thread::sleep(Duration::from_millis(1));
        pin.set_high()?;
        // oscillator start-up
        std::thread::sleep(Duration::from_millis(50));
        Ok(true)
    }
}
