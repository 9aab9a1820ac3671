use log::{debug, info, trace, warn};
use std::time::{Duration, Instant};

use crate::poller::CardReader;
use crate::transport::PcdTransport;
use crate::types::{bytes_to_hex, chip_version_name, crc_a, CardRead, Rc522Error, Uid};

/// Data returned by the PICC for one transceive
struct Response {
    data: Vec<u8>,
    /// Valid bits in the last received byte, 0 means all eight
    valid_bits: u8,
    collision: bool,
}

pub struct Mfrc522<T: PcdTransport> {
    transport: T,
}

impl<T: PcdTransport> Mfrc522<T> {
    // Registers
    const COMMAND_REG: u8 = 0x01;
    const COM_IRQ_REG: u8 = 0x04;
    const ERROR_REG: u8 = 0x06;
    const STATUS2_REG: u8 = 0x08;
    const FIFO_DATA_REG: u8 = 0x09;
    const FIFO_LEVEL_REG: u8 = 0x0A;
    const CONTROL_REG: u8 = 0x0C;
    const BIT_FRAMING_REG: u8 = 0x0D;
    const COLL_REG: u8 = 0x0E;
    const MODE_REG: u8 = 0x11;
    const TX_MODE_REG: u8 = 0x12;
    const RX_MODE_REG: u8 = 0x13;
    const TX_CONTROL_REG: u8 = 0x14;
    const TX_ASK_REG: u8 = 0x15;
    const MOD_WIDTH_REG: u8 = 0x24;
    const T_MODE_REG: u8 = 0x2A;
    const T_PRESCALER_REG: u8 = 0x2B;
    const T_RELOAD_REG_H: u8 = 0x2C;
    const T_RELOAD_REG_L: u8 = 0x2D;
    const VERSION_REG: u8 = 0x37;

    // PCD commands
    const PCD_IDLE: u8 = 0x00;
    const PCD_TRANSCEIVE: u8 = 0x0C;
    const PCD_SOFT_RESET: u8 = 0x0F;

    // PICC commands
    const PICC_REQA: u8 = 0x26;
    const PICC_HLTA: u8 = 0x50;
    const PICC_CT: u8 = 0x88;
    const PICC_SEL_CL: [u8; 3] = [0x93, 0x95, 0x97];
    const NVB_ANTICOLLISION: u8 = 0x20;
    const NVB_SELECT: u8 = 0x70;

    // Register bits
    const IRQ_RX: u8 = 0x20;
    const IRQ_IDLE: u8 = 0x10;
    const IRQ_TIMER: u8 = 0x01;
    const ERR_COLL: u8 = 0x08;
    const ERR_FATAL: u8 = 0x13; // BufferOvfl | ParityErr | ProtocolErr
    const COLL_VALUES_AFTER_COLL: u8 = 0x80;
    const COLL_POS_NOT_VALID: u8 = 0x20;
    const STATUS2_CRYPTO1_ON: u8 = 0x08;
    const COMMAND_POWER_DOWN: u8 = 0x10;
    const BIT_FRAMING_START_SEND: u8 = 0x80;
    const SAK_CASCADE: u8 = 0x04;

    /// Longer than the 25 ms the timer is programmed for in `init`
    const COMMAND_TIMEOUT: Duration = Duration::from_millis(36);
    const RESET_SETTLE: Duration = Duration::from_millis(50);
    const RESET_ATTEMPTS: usize = 3;

    /// Create a new reader instance with the given transport
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Give the transport back
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Reset the module, program the timer and modulation and turn the antenna on
    pub fn init(&mut self) -> Result<(), Rc522Error> {
        let hard_reset = self
            .transport
            .hard_reset()
            .map_err(|e| Rc522Error::Transport(format!("{:?}", e)))?;
        if !hard_reset {
            self.soft_reset()?;
        }

        // 106 kBd, CRC handled in software
        self.write_register(Self::TX_MODE_REG, 0x00)?;
        self.write_register(Self::RX_MODE_REG, 0x00)?;
        self.write_register(Self::MOD_WIDTH_REG, 0x26)?;

        // TAuto, f_timer = 13.56 MHz / (2 * 0xA9 + 1) = 40 kHz, reload 1000 ticks = 25 ms
        self.write_register(Self::T_MODE_REG, 0x80)?;
        self.write_register(Self::T_PRESCALER_REG, 0xA9)?;
        self.write_register(Self::T_RELOAD_REG_H, 0x03)?;
        self.write_register(Self::T_RELOAD_REG_L, 0xE8)?;

        // 100 % ASK, CRC preset 0x6363
        self.write_register(Self::TX_ASK_REG, 0x40)?;
        self.write_register(Self::MODE_REG, 0x3D)?;

        self.antenna_on()
    }

    /// Read VersionReg
    pub fn version(&mut self) -> Result<u8, Rc522Error> {
        self.read_register(Self::VERSION_REG)
    }

    /// Send REQA and return the ATQA
    pub fn request_a(&mut self) -> Result<[u8; 2], Rc522Error> {
        self.clear_register_bits(Self::COLL_REG, Self::COLL_VALUES_AFTER_COLL)?;
        let response = self.transceive(&[Self::PICC_REQA], 7, 0)?;
        if response.collision {
            return Err(Rc522Error::Collision);
        }
        match response.data.as_slice() {
            [lo, hi] if response.valid_bits == 0 => Ok([*lo, *hi]),
            other => Err(Rc522Error::InvalidResponse(format!(
                "ATQA: {} ({} valid bits)",
                bytes_to_hex(other),
                response.valid_bits
            ))),
        }
    }

    /// Run the anticollision and select cascade and return the UID with the final SAK
    pub fn select(&mut self) -> Result<CardRead, Rc522Error> {
        self.clear_register_bits(Self::COLL_REG, Self::COLL_VALUES_AFTER_COLL)?;

        let mut uid = Vec::with_capacity(10);
        for &sel in Self::PICC_SEL_CL.iter() {
            let level = self.anticollision(sel)?;
            let sak = self.select_level(sel, &level)?;
            trace!("SEL 0x{:02X}: {} SAK 0x{:02X}", sel, bytes_to_hex(&level), sak);

            if sak & Self::SAK_CASCADE == 0 {
                uid.extend_from_slice(&level);
                return Ok(CardRead::new(Uid::new(uid)?, sak));
            }
            if level[0] != Self::PICC_CT {
                return Err(Rc522Error::InvalidResponse(format!(
                    "cascade bit set without cascade tag: {}",
                    bytes_to_hex(&level)
                )));
            }
            uid.extend_from_slice(&level[1..]);
        }

        Err(Rc522Error::InvalidResponse(
            "UID not complete after cascade level 3".into(),
        ))
    }

    /// Put the selected PICC into HALT. Silence from the PICC is success.
    pub fn hlta(&mut self) -> Result<(), Rc522Error> {
        let mut frame = vec![Self::PICC_HLTA, 0x00];
        let crc = crc_a(&frame);
        frame.extend_from_slice(&crc);

        match self.transceive(&frame, 0, 0) {
            Err(Rc522Error::Timeout) => Ok(()),
            Ok(_) => Err(Rc522Error::InvalidResponse("PICC answered HLTA".into())),
            Err(e) => Err(e),
        }
    }

    /// Leave the MIFARE Crypto1 authenticated state
    pub fn crypto1_off(&mut self) -> Result<(), Rc522Error> {
        self.clear_register_bits(Self::STATUS2_REG, Self::STATUS2_CRYPTO1_ON)
    }

    /// A PICC left in a higher baud rate by a previous session would not hear REQA
    fn reset_baud_rates(&mut self) -> Result<(), Rc522Error> {
        self.write_register(Self::TX_MODE_REG, 0x00)?;
        self.write_register(Self::RX_MODE_REG, 0x00)?;
        self.write_register(Self::MOD_WIDTH_REG, 0x26)
    }

    fn soft_reset(&mut self) -> Result<(), Rc522Error> {
        self.write_register(Self::COMMAND_REG, Self::PCD_SOFT_RESET)?;
        for _ in 0..Self::RESET_ATTEMPTS {
            std::thread::sleep(Self::RESET_SETTLE);
            if self.read_register(Self::COMMAND_REG)? & Self::COMMAND_POWER_DOWN == 0 {
                return Ok(());
            }
        }
        Err(Rc522Error::Timeout)
    }

    fn antenna_on(&mut self) -> Result<(), Rc522Error> {
        let value = self.read_register(Self::TX_CONTROL_REG)?;
        if value & 0x03 != 0x03 {
            self.write_register(Self::TX_CONTROL_REG, value | 0x03)?;
        }
        Ok(())
    }

    /// Resolve the four UID bytes of one cascade level, following the `1` branch on collisions
    fn anticollision(&mut self, sel: u8) -> Result<[u8; 4], Rc522Error> {
        // four UID bytes followed by BCC
        let mut known = [0u8; 5];
        let mut known_bits = 0usize;

        loop {
            let full_bytes = known_bits / 8;
            let extra_bits = (known_bits % 8) as u8;
            let sent = full_bytes + usize::from(extra_bits != 0);
            let nvb = Self::NVB_ANTICOLLISION + ((full_bytes as u8) << 4) + extra_bits;

            let mut frame = Vec::with_capacity(2 + sent);
            frame.push(sel);
            frame.push(nvb);
            frame.extend_from_slice(&known[..sent]);

            let response = self.transceive(&frame, extra_bits, extra_bits)?;

            // the first received byte shares its low bits with the last partial byte sent
            for (i, &byte) in response.data.iter().enumerate() {
                let Some(slot) = known.get_mut(full_bytes + i) else {
                    break;
                };
                if i == 0 && extra_bits != 0 {
                    let mask = 0xFFu8 << extra_bits;
                    *slot = (*slot & !mask) | (byte & mask);
                } else {
                    *slot = byte;
                }
            }

            if response.collision {
                let coll = self.read_register(Self::COLL_REG)?;
                if coll & Self::COLL_POS_NOT_VALID != 0 {
                    return Err(Rc522Error::Collision);
                }
                let position = match usize::from(coll & 0x1F) {
                    0 => 32,
                    n => n,
                };
                if position <= known_bits {
                    return Err(Rc522Error::InvalidResponse(format!(
                        "collision at bit {} does not advance past {}",
                        position, known_bits
                    )));
                }
                debug!("Collision at bit {} on SEL 0x{:02X}", position, sel);
                known_bits = position;
                known[(known_bits - 1) / 8] |= 1 << ((known_bits - 1) % 8);
                continue;
            }

            if full_bytes + response.data.len() < known.len() {
                return Err(Rc522Error::InvalidResponse(format!(
                    "short anticollision response: {}",
                    bytes_to_hex(&response.data)
                )));
            }
            break;
        }

        let bcc = known[..4].iter().fold(0u8, |acc, b| acc ^ b);
        if bcc != known[4] {
            return Err(Rc522Error::Bcc);
        }
        Ok([known[0], known[1], known[2], known[3]])
    }

    /// Select one cascade level and return its SAK
    fn select_level(&mut self, sel: u8, level: &[u8; 4]) -> Result<u8, Rc522Error> {
        let bcc = level.iter().fold(0u8, |acc, b| acc ^ b);
        let mut frame = Vec::with_capacity(9);
        frame.extend_from_slice(&[sel, Self::NVB_SELECT]);
        frame.extend_from_slice(level);
        frame.push(bcc);
        let crc = crc_a(&frame);
        frame.extend_from_slice(&crc);

        let response = self.transceive(&frame, 0, 0)?;
        if response.collision {
            return Err(Rc522Error::Collision);
        }
        match response.data.as_slice() {
            [sak, crc @ ..] if crc.len() == 2 && response.valid_bits == 0 => {
                if crc_a(&[*sak]) != [crc[0], crc[1]] {
                    return Err(Rc522Error::Crc);
                }
                Ok(*sak)
            }
            other => Err(Rc522Error::InvalidResponse(format!(
                "SAK: {} ({} valid bits)",
                bytes_to_hex(other),
                response.valid_bits
            ))),
        }
    }

    fn transceive(&mut self, send: &[u8], tx_last_bits: u8, rx_align: u8) -> Result<Response, Rc522Error> {
        self.write_register(Self::COMMAND_REG, Self::PCD_IDLE)?;
        // clear all interrupt request bits
        self.write_register(Self::COM_IRQ_REG, 0x7F)?;
        // flush the FIFO
        self.write_register(Self::FIFO_LEVEL_REG, 0x80)?;
        self.transport
            .write_registers(Self::FIFO_DATA_REG, send)
            .map_err(|e| Rc522Error::Transport(format!("{:?}", e)))?;
        self.write_register(Self::BIT_FRAMING_REG, (rx_align << 4) | tx_last_bits)?;
        self.write_register(Self::COMMAND_REG, Self::PCD_TRANSCEIVE)?;
        self.set_register_bits(Self::BIT_FRAMING_REG, Self::BIT_FRAMING_START_SEND)?;

        let start = Instant::now();
        loop {
            let irq = self.read_register(Self::COM_IRQ_REG)?;
            if irq & (Self::IRQ_RX | Self::IRQ_IDLE) != 0 {
                break;
            }
            if irq & Self::IRQ_TIMER != 0 || start.elapsed() > Self::COMMAND_TIMEOUT {
                return Err(Rc522Error::Timeout);
            }
        }

        let error = self.read_register(Self::ERROR_REG)?;
        if error & Self::ERR_FATAL != 0 {
            return Err(Rc522Error::Protocol(error));
        }

        let level = usize::from(self.read_register(Self::FIFO_LEVEL_REG)? & 0x7F);
        let mut data = vec![0u8; level];
        self.transport
            .read_registers(Self::FIFO_DATA_REG, &mut data)
            .map_err(|e| Rc522Error::Transport(format!("{:?}", e)))?;
        let valid_bits = self.read_register(Self::CONTROL_REG)? & 0x07;

        Ok(Response {
            data,
            valid_bits,
            collision: error & Self::ERR_COLL != 0,
        })
    }

    fn read_register(&mut self, reg: u8) -> Result<u8, Rc522Error> {
        self.transport
            .read_register(reg)
            .map_err(|e| Rc522Error::Transport(format!("{:?}", e)))
    }

    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), Rc522Error> {
        self.transport
            .write_register(reg, value)
            .map_err(|e| Rc522Error::Transport(format!("{:?}", e)))
    }

    fn set_register_bits(&mut self, reg: u8, mask: u8) -> Result<(), Rc522Error> {
        let value = self.read_register(reg)?;
        self.write_register(reg, value | mask)
    }

    fn clear_register_bits(&mut self, reg: u8, mask: u8) -> Result<(), Rc522Error> {
        let value = self.read_register(reg)?;
        self.write_register(reg, value & !mask)
    }
}

impl<T: PcdTransport> CardReader for Mfrc522<T> {
    fn pcd_init(&mut self) -> Result<(), Rc522Error> {
        self.init()?;
        let version = self.version()?;
        match (version, chip_version_name(version)) {
            (0x00 | 0xFF, _) => warn!(
                "VersionReg reads 0x{:02X}, no MFRC522 is answering; check the wiring",
                version
            ),
            (_, Some(name)) => info!("MFRC522 version 0x{:02X} ({})", version, name),
            (_, None) => info!("MFRC522 version 0x{:02X} (unknown)", version),
        }
        Ok(())
    }

    fn is_new_card_present(&mut self) -> bool {
        let result = self.reset_baud_rates().and_then(|()| self.request_a());
        match result {
            Ok(_) | Err(Rc522Error::Collision) => true,
            Err(Rc522Error::Timeout) => false,
            Err(e) => {
                debug!("REQA failed: {}", e);
                false
            }
        }
    }

    fn read_card_serial(&mut self) -> Result<CardRead, Rc522Error> {
        self.select()
    }

    fn halt_a(&mut self) -> Result<(), Rc522Error> {
        self.hlta()
    }

    fn stop_crypto1(&mut self) -> Result<(), Rc522Error> {
        self.crypto1_off()
    }
}
