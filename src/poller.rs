//! Card polling loop

use log::{debug, warn};
use std::io::{self, Write};
use std::time::Duration;

use crate::types::{CardRead, Rc522Error};

/// The reader operations the polling loop relies on.
pub trait CardReader {
    /// Reset the module and prepare it for REQA
    fn pcd_init(&mut self) -> Result<(), Rc522Error>;

    /// True when a PICC in IDLE state answered REQA
    fn is_new_card_present(&mut self) -> bool;

    /// Select the PICC that answered and return its UID and SAK
    fn read_card_serial(&mut self) -> Result<CardRead, Rc522Error>;

    /// Put the selected PICC into HALT
    fn halt_a(&mut self) -> Result<(), Rc522Error>;

    /// Leave any MIFARE authenticated session
    fn stop_crypto1(&mut self) -> Result<(), Rc522Error>;
}

/// Timing of the polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Wait after an iteration without a card
    pub poll_interval: Duration,
    /// Wait after a card was read, so a card left on the reader is not reported again at once
    pub cooldown: Duration,
}

impl PollConfig {
    pub const fn new(poll_interval: Duration, cooldown: Duration) -> Self {
        Self {
            poll_interval,
            cooldown,
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::new(Duration::from_millis(50), Duration::from_millis(1000))
    }
}

/// Result of one iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Idle,
    CardRead(CardRead),
}

/// Counters kept by the loop. They never show up on the console.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollStats {
    /// Iterations where no card answered
    pub idle_polls: u64,
    /// Iterations where a card answered REQA but could not be selected
    pub read_failures: u64,
    pub cards_read: u64,
}

pub struct Poller<R: CardReader> {
    reader: R,
    config: PollConfig,
    stats: PollStats,
}

impl<R: CardReader> Poller<R> {
    const RULE: &'static str = "=====================================";
    const TITLE: &'static str = "   NodeMCU + RC522 RFID Reader";
    const PROMPT: &'static str = "Place your RFID card near the reader...";
    const SEPARATOR: &'static str = "-------------------------------------";

    pub fn new(reader: R, config: PollConfig) -> Self {
        Self {
            reader,
            config,
            stats: PollStats::default(),
        }
    }

    /// Print the banner, initialize the reader and print the prompt.
    ///
    /// A failed initialization is only logged; it shows up later as every poll coming back idle.
    pub fn start<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        writeln!(out)?;
        writeln!(out, "{}", Self::RULE)?;
        writeln!(out, "{}", Self::TITLE)?;
        writeln!(out, "{}", Self::RULE)?;
        out.flush()?;

        if let Err(e) = self.reader.pcd_init() {
            warn!("Reader initialization failed: {}", e);
        }

        writeln!(out, "{}", Self::PROMPT)?;
        writeln!(out, "{}", Self::SEPARATOR)?;
        out.flush()
    }

    /// Run one iteration without waiting.
    ///
    /// After a card is reported it is always halted and its crypto session stopped,
    /// even when writing the report failed.
    pub fn poll_once<W: Write>(&mut self, out: &mut W) -> io::Result<PollOutcome> {
        if !self.reader.is_new_card_present() {
            self.stats.idle_polls += 1;
            return Ok(PollOutcome::Idle);
        }

        let card = match self.reader.read_card_serial() {
            Ok(card) => card,
            Err(e) => {
                self.stats.read_failures += 1;
                debug!("Card present but serial read failed: {}", e);
                return Ok(PollOutcome::Idle);
            }
        };

        let reported = Self::report(out, &card);

        if let Err(e) = self.reader.halt_a() {
            debug!("HLTA failed: {}", e);
        }
        if let Err(e) = self.reader.stop_crypto1() {
            debug!("Stopping Crypto1 failed: {}", e);
        }
        self.stats.cards_read += 1;

        reported?;
        Ok(PollOutcome::CardRead(card))
    }

    /// How long to wait before the next iteration
    pub fn delay_after(&self, outcome: &PollOutcome) -> Duration {
        match outcome {
            PollOutcome::Idle => self.config.poll_interval,
            PollOutcome::CardRead(_) => self.config.cooldown,
        }
    }

    /// Poll forever. Returns only when writing to `out` fails.
    pub fn run<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        loop {
            let outcome = self.poll_once(out)?;
            std::thread::sleep(self.delay_after(&outcome));
        }
    }

    pub fn stats(&self) -> PollStats {
        self.stats
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn into_reader(self) -> R {
        self.reader
    }

    fn report<W: Write>(out: &mut W, card: &CardRead) -> io::Result<()> {
        writeln!(out, "Card UID: {}", card.uid)?;
        writeln!(out, "Card Type: {}", card.picc_type().name())?;
        out.flush()
    }
}
