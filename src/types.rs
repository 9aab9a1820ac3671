//! Types for MFRC522 card reads

use std::fmt;

/// Unique identifier of a PICC: 4, 7 or 10 bytes (single, double, triple size)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uid(Vec<u8>);

impl Uid {
    pub fn new(bytes: Vec<u8>) -> Result<Self, Rc522Error> {
        match bytes.len() {
            4 | 7 | 10 => Ok(Self(bytes)),
            n => Err(Rc522Error::InvalidParameter(format!(
                "UID must be 4, 7 or 10 bytes, got {}",
                n
            ))),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Each byte as two uppercase hex digits followed by a space, e.g. `04 A3 2B 91 `
impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02X} ", byte)?;
        }
        Ok(())
    }
}

/// A card that answered the full select cascade
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardRead {
    pub uid: Uid,
    pub sak: u8,
}

impl CardRead {
    pub fn new(uid: Uid, sak: u8) -> Self {
        Self { uid, sak }
    }

    pub fn picc_type(&self) -> PiccType {
        PiccType::from_sak(self.sak)
    }
}

/// Card family as declared by the SAK byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PiccType {
    /// Cascade bit set: the UID continues in the next level
    NotComplete,
    MifareMini,
    Mifare1K,
    Mifare4K,
    MifareUltralight,
    MifarePlus,
    /// MIFARE TNP3xxx (toy pads)
    Tnp3xxx,
    Iso14443_4,
    Iso18092,
    Unknown,
}

impl PiccType {
    pub fn from_sak(sak: u8) -> Self {
        // bit 7 is reserved for future use
        match sak & 0x7F {
            0x04 => PiccType::NotComplete,
            0x09 => PiccType::MifareMini,
            0x08 => PiccType::Mifare1K,
            0x18 => PiccType::Mifare4K,
            0x00 => PiccType::MifareUltralight,
            0x10 | 0x11 => PiccType::MifarePlus,
            0x01 => PiccType::Tnp3xxx,
            0x20 => PiccType::Iso14443_4,
            0x40 => PiccType::Iso18092,
            _ => PiccType::Unknown,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PiccType::NotComplete => "SAK indicates UID is not complete.",
            PiccType::MifareMini => "MIFARE Mini, 320 bytes",
            PiccType::Mifare1K => "MIFARE 1KB",
            PiccType::Mifare4K => "MIFARE 4KB",
            PiccType::MifareUltralight => "MIFARE Ultralight or Ultralight C",
            PiccType::MifarePlus => "MIFARE Plus",
            PiccType::Tnp3xxx => "MIFARE TNP3XXX",
            PiccType::Iso14443_4 => "PICC compliant with ISO/IEC 14443-4",
            PiccType::Iso18092 => "PICC compliant with ISO/IEC 18092 (NFC)",
            PiccType::Unknown => "Unknown type",
        }
    }
}

impl fmt::Display for PiccType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors that can occur during MFRC522 operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rc522Error {
    /// Transport layer error (SPI, UART, etc.)
    Transport(String),
    /// No PICC answered before the timer expired
    Timeout,
    /// More than one PICC answered at once
    Collision,
    /// ErrorReg flagged a buffer overflow, parity or protocol error
    Protocol(u8),
    /// CRC_A of a PICC response did not match
    Crc,
    /// Block check character of an anticollision response did not match
    Bcc,
    /// Invalid parameter passed to a function
    InvalidParameter(String),
    /// Invalid response received from the PICC
    InvalidResponse(String),
}

impl fmt::Display for Rc522Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rc522Error::Transport(msg) => write!(f, "transport error: {}", msg),
            Rc522Error::Timeout => f.write_str("timeout waiting for PICC"),
            Rc522Error::Collision => f.write_str("collision between PICCs"),
            Rc522Error::Protocol(bits) => write!(f, "ErrorReg reported 0x{:02X}", bits),
            Rc522Error::Crc => f.write_str("CRC_A mismatch"),
            Rc522Error::Bcc => f.write_str("BCC mismatch"),
            Rc522Error::InvalidParameter(msg) => write!(f, "invalid parameter: {}", msg),
            Rc522Error::InvalidResponse(msg) => write!(f, "invalid response: {}", msg),
        }
    }
}

impl std::error::Error for Rc522Error {}

/// Human readable name for a VersionReg value, if it is a known chip
pub fn chip_version_name(version: u8) -> Option<&'static str> {
    match version {
        0x88 => Some("FM17522 clone"),
        0x90 => Some("v0.0"),
        0x91 => Some("v1.0"),
        0x92 => Some("v2.0"),
        0x12 => Some("counterfeit chip"),
        _ => None,
    }
}

/// CRC_A as defined in ISO/IEC 14443-3, low byte first
pub(crate) fn crc_a(data: &[u8]) -> [u8; 2] {
    let mut crc: u16 = 0x6363;
    for &byte in data {
        let mut b = byte ^ (crc & 0xFF) as u8;
        b ^= b << 4;
        crc = (crc >> 8) ^ (u16::from(b) << 8) ^ (u16::from(b) << 3) ^ (u16::from(b) >> 4);
    }
    crc.to_le_bytes()
}

/// Convert bytes to uppercase hex string
pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}
