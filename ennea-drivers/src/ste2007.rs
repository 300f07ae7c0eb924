//! STE2007 LCD controller driver
//!
//! Drives the 96x68 monochrome panel found in Nokia 1202 class handsets
//! over its 9-bit SPI link. Every frame on the wire is one byte plus a
//! leading tag bit: 0 for a controller command, 1 for DDRAM pixel data.
//! Frames travel as 16-bit words with the tag in bit 8, packed by the
//! [`TxnBuffer`] from `ennea-core`.
//!
//! # Session locking
//!
//! One [`Ste2007`] value is one display session. All state (bus, pins,
//! transaction buffers) lives behind an `embassy-sync` blocking mutex, so
//! every public operation takes `&self` and callers on different threads
//! of control are serialized at operation granularity: the controller
//! observes whole operations in lock-acquisition order, never interleaved
//! words.
//!
//! The lock is not reentrant (the `RefCell` inside it panics on a second
//! borrow). Two operations are therefore structured around a lock
//! release/re-acquire window: [`Ste2007::init`] drops the lock before
//! invoking [`Ste2007::clear`] and re-acquires it afterwards, and
//! [`Ste2007::draw_text`] runs the whole-line clear of the `Both` policy
//! before entering its own lock section. Keep that shape when changing
//! either sequence.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;

use ennea_core::display::control;
use ennea_core::{DisplayError, GlyphTable, LineClearPolicy, MonoDisplay, TxnBuffer};
use ennea_hal::{Mode, OutputPin, SpiConfig, SpiWordBus};

/// Character cells per line
pub const TEXT_COLUMNS: usize = 16;

/// Pixel columns per character cell
pub const GLYPH_STRIDE: usize = crate::font::GLYPH_STRIDE;

/// Pixel columns per line
pub const COLUMNS: usize = TEXT_COLUMNS * GLYPH_STRIDE;

/// Word-rows of display RAM (68 pixel rows, 8 per word-row, last row partial)
pub const PAGES: usize = 9;

/// Tag bit value for command frames
pub const TAG_COMMAND: u8 = 0;

/// Tag bit value for DDRAM data frames
pub const TAG_DATA: u8 = 1;

/// Words in the single-command scratch buffer
const CMD_WORDS: usize = 4;

/// Electronic volume level used until the application picks one
const DEFAULT_CONTRAST: u8 = 16;

/// A command register: base byte plus argument mask.
#[derive(Debug, Clone, Copy)]
struct Reg {
    base: u8,
    mask: u8,
}

/// Full STE2007 command set.
///
/// Simple commands OR the masked argument into the base byte. The entries
/// below the marker are compound: the controller expects the base byte
/// first and the masked argument as a second, separate frame.
#[allow(dead_code)]
mod reg {
    use super::Reg;

    pub const DISPLAY_ON_OFF: Reg = Reg { base: 0xAE, mask: 0x01 };
    pub const DISPLAY_REVERSE: Reg = Reg { base: 0xA6, mask: 0x01 };
    pub const ALL_POINTS_ON: Reg = Reg { base: 0xA4, mask: 0x01 };
    pub const LINE: Reg = Reg { base: 0xB0, mask: 0x0F };
    pub const COLUMN_MSB: Reg = Reg { base: 0x10, mask: 0x07 };
    pub const COLUMN_LSB: Reg = Reg { base: 0x00, mask: 0x0F };
    pub const START_LINE: Reg = Reg { base: 0x40, mask: 0x3F };
    pub const SEGMENT_DIR: Reg = Reg { base: 0xA0, mask: 0x01 };
    pub const COMMON_DIR: Reg = Reg { base: 0xC0, mask: 0x08 };
    pub const POWER_CONTROL: Reg = Reg { base: 0x28, mask: 0x07 };
    pub const VO_RANGE: Reg = Reg { base: 0x40, mask: 0x07 };
    pub const ELECTRONIC_VOLUME: Reg = Reg { base: 0x80, mask: 0x1F };
    pub const BIAS_RATIO: Reg = Reg { base: 0x30, mask: 0x07 };
    pub const NUM_LINES: Reg = Reg { base: 0xD0, mask: 0x07 };
    pub const ICON_MODE: Reg = Reg { base: 0xF8, mask: 0x01 };
    pub const RESET: Reg = Reg { base: 0xE2, mask: 0x00 };
    pub const NOP: Reg = Reg { base: 0xE3, mask: 0x00 };

    // Compound registers: argument travels as its own frame.
    pub const VOP: Reg = Reg { base: 0xE1, mask: 0xFF };
    pub const VLCD_SLOPE: Reg = Reg { base: 0x38, mask: 0x07 };
    pub const CHARGE_PUMP: Reg = Reg { base: 0x3D, mask: 0x03 };
    pub const REFRESH_RATE: Reg = Reg { base: 0xEF, mask: 0x03 };
    pub const N_LINE_INVERSION: Reg = Reg { base: 0xAD, mask: 0x1F };
    pub const IMAGE_LOCATION: Reg = Reg { base: 0xAC, mask: 0x07 };
}

/// Driver configuration, latched at construction.
#[derive(Debug, Clone, Copy)]
pub struct Ste2007Config {
    /// Line blanking applied around every text draw
    pub line_clear: LineClearPolicy,
    /// Contrast (electronic volume) applied during bring-up, 0-31
    pub contrast: u8,
}

impl Default for Ste2007Config {
    fn default() -> Self {
        Self {
            line_clear: LineClearPolicy::None,
            contrast: DEFAULT_CONTRAST,
        }
    }
}

/// Session state guarded by the lock.
struct Shared<BUS, PIN> {
    bus: BUS,
    cs: PIN,
    backlight: Option<PIN>,
    cmd_buf: TxnBuffer<CMD_WORDS>,
    row_buf: TxnBuffer<COLUMNS>,
}

/// An STE2007 display session.
///
/// Generic over the raw mutex flavor (`M`), the word transport (`BUS`),
/// the GPIO pin type (`PIN`, used for chip-select and the optional
/// backlight) and the glyph table (`G`).
pub struct Ste2007<M, BUS, PIN, G>
where
    M: RawMutex,
{
    shared: Mutex<M, RefCell<Shared<BUS, PIN>>>,
    glyphs: G,
    config: Ste2007Config,
}

impl<M, BUS, PIN, G> Ste2007<M, BUS, PIN, G>
where
    M: RawMutex,
    BUS: SpiWordBus,
    PIN: OutputPin,
    G: GlyphTable,
{
    /// Build a session around an already-configured bus and pins.
    ///
    /// Chip-select is parked high (idle) and the backlight, when wired,
    /// starts off. The bus must already be set up per [`Self::bus_config`];
    /// peripheral bring-up is the integrator's job.
    pub fn new(
        bus: BUS,
        mut cs: PIN,
        mut backlight: Option<PIN>,
        glyphs: G,
        config: Ste2007Config,
    ) -> Self {
        cs.set_high();
        if let Some(pin) = backlight.as_mut() {
            pin.set_low();
        }
        Self {
            shared: Mutex::new(RefCell::new(Shared {
                bus,
                cs,
                backlight,
                cmd_buf: TxnBuffer::new(),
                row_buf: TxnBuffer::new(),
            })),
            glyphs,
            config,
        }
    }

    /// Bus settings the STE2007 link requires.
    pub const fn bus_config() -> SpiConfig {
        SpiConfig {
            frequency: 1_000_000,
            mode: Mode::Mode0,
            data_bits: 9,
        }
    }

    /// Run the controller bring-up sequence.
    ///
    /// Any transport failure aborts the sequence; the controller is then
    /// in an undefined intermediate state and a retry starts from the top.
    pub fn init(&self) -> Result<(), DisplayError> {
        self.shared.lock(|cell| {
            let sh = &mut *cell.borrow_mut();
            Self::issue_command(sh, reg::RESET, 0)?;
            Self::issue_command(sh, reg::ALL_POINTS_ON, 0)?;
            Self::issue_command(sh, reg::POWER_CONTROL, 7)?;
            Self::issue_command(sh, reg::DISPLAY_ON_OFF, 1)?;
            Self::issue_command(sh, reg::COMMON_DIR, 0)?;
            Self::issue_command(sh, reg::SEGMENT_DIR, 0)?;
            Self::issue_command(sh, reg::ELECTRONIC_VOLUME, self.config.contrast)
        })?;
        // clear() takes the session lock itself; the lock must stay
        // released across this call (the RefCell panics on re-entry).
        self.clear()?;
        self.shared.lock(|cell| {
            let sh = &mut *cell.borrow_mut();
            Self::issue_compound(sh, reg::REFRESH_RATE, 3)?; // 65 Hz
            Self::issue_compound(sh, reg::CHARGE_PUMP, 0)?; // 5x multiplier
            Self::issue_command(sh, reg::BIAS_RATIO, 6)?; // 1/4 bias
            Self::issue_compound(sh, reg::VOP, 0)?;
            Self::issue_command(sh, reg::DISPLAY_REVERSE, 0)
        })
    }

    /// Blank the entire display RAM and leave the cursor at the origin.
    pub fn clear(&self) -> Result<(), DisplayError> {
        self.shared.lock(|cell| {
            let sh = &mut *cell.borrow_mut();
            Self::load_blank_row(sh);
            Self::jump_to(sh, 0, 0)?;
            sh.cs.set_low();
            let mut res = Ok(());
            for _ in 0..PAGES {
                if sh.bus.transfer(sh.row_buf.words()).is_err() {
                    res = Err(DisplayError::Bus);
                    break;
                }
            }
            sh.cs.set_high();
            res
        })
    }

    /// Blank lines `start..=end` inclusive.
    ///
    /// `end < start` blanks `start` alone: host frameworks clear a single
    /// line by passing `end = 0`, so a reversed range means "just start".
    pub fn clear_lines(&self, start: u8, end: u8) -> Result<(), DisplayError> {
        let end = if end < start { start } else { end };
        self.shared.lock(|cell| {
            let sh = &mut *cell.borrow_mut();
            Self::load_blank_row(sh);
            for line in start..=end {
                Self::jump_to(sh, 0, line)?;
                sh.cs.set_low();
                let res = sh.bus.transfer(sh.row_buf.words());
                sh.cs.set_high();
                res.map_err(|_| DisplayError::Bus)?;
            }
            Ok(())
        })
    }

    /// Move the DDRAM cursor to pixel column `x` on line `y`.
    pub fn set_cursor(&self, x: u8, y: u8) -> Result<(), DisplayError> {
        self.shared
            .lock(|cell| Self::jump_to(&mut cell.borrow_mut(), x, y))
    }

    /// Stream raw pixel bytes into DDRAM at the current cursor.
    ///
    /// Sources longer than one row buffer go out in buffer-sized chunks.
    /// This primitive does not touch chip-select: callers bracket the
    /// electrical session themselves (see [`Self::chip_select`]), which
    /// lets several writes share one bracket.
    pub fn write_bitmap(&self, bytes: &[u8]) -> Result<(), DisplayError> {
        self.shared
            .lock(|cell| Self::write_ddram(&mut cell.borrow_mut(), bytes))
    }

    /// Drive the chip-select line; `active` selects the controller.
    ///
    /// Active-low wiring: selecting drives the pin low.
    pub fn chip_select(&self, active: bool) {
        self.shared
            .lock(|cell| cell.borrow_mut().cs.set_state(!active));
    }

    /// Render `text` at (`col` pixel column, `line`).
    ///
    /// Applies the session's [`LineClearPolicy`] first, then streams each
    /// character's glyph under a single chip-select bracket. Text wider
    /// than the remaining line is neither wrapped nor clipped.
    pub fn draw_text(&self, line: u8, col: u8, text: &str) -> Result<(), DisplayError> {
        if self.config.line_clear == LineClearPolicy::Both {
            // clear_lines() takes the session lock itself, so the Both
            // policy runs before this operation enters its lock section.
            self.clear_lines(line, line)?;
        }
        self.shared.lock(|cell| {
            let sh = &mut *cell.borrow_mut();
            let blank = [0u8; COLUMNS];
            match self.config.line_clear {
                LineClearPolicy::Left if col > 0 => {
                    let width = (col as usize).min(COLUMNS);
                    Self::jump_to(sh, 0, line)?;
                    sh.cs.set_low();
                    let res = Self::write_ddram(sh, &blank[..width]);
                    sh.cs.set_high();
                    res?;
                }
                LineClearPolicy::Right if (col as usize) < COLUMNS => {
                    Self::jump_to(sh, col, line)?;
                    sh.cs.set_low();
                    let res = Self::write_ddram(sh, &blank[..COLUMNS - col as usize]);
                    sh.cs.set_high();
                    res?;
                }
                _ => {}
            }
            Self::jump_to(sh, col, line)?;
            sh.cs.set_low();
            let mut res = Ok(());
            for ch in text.chars() {
                if let Err(e) = Self::write_ddram(sh, self.glyphs.glyph(ch)) {
                    res = Err(e);
                    break;
                }
            }
            sh.cs.set_high();
            res
        })
    }

    /// Set the electronic volume (contrast), 0-31.
    pub fn set_contrast(&self, level: u8) -> Result<(), DisplayError> {
        if level > 31 {
            return Err(DisplayError::OutOfRange);
        }
        self.shared.lock(|cell| {
            Self::issue_command(&mut cell.borrow_mut(), reg::ELECTRONIC_VOLUME, level)
        })
    }

    /// Set the panel refresh rate; `hz` is one of 65, 70, 75 or 80.
    pub fn set_refresh_rate(&self, hz: u8) -> Result<(), DisplayError> {
        let code = match hz {
            80 => 0,
            75 => 1,
            70 => 2,
            65 => 3,
            _ => return Err(DisplayError::OutOfRange),
        };
        self.shared
            .lock(|cell| Self::issue_compound(&mut cell.borrow_mut(), reg::REFRESH_RATE, code))
    }

    /// Invert every pixel (display-reverse mode).
    pub fn set_inverted(&self, inverted: bool) -> Result<(), DisplayError> {
        self.shared
            .lock(|cell| Self::issue_command(&mut cell.borrow_mut(), reg::DISPLAY_REVERSE, inverted as u8))
    }

    /// Enter or leave the controller's power-save mode.
    ///
    /// The datasheet's saver state is all-points-on combined with
    /// display-off; leaving reverses both.
    pub fn set_power_save(&self, on: bool) -> Result<(), DisplayError> {
        self.shared.lock(|cell| {
            let sh = &mut *cell.borrow_mut();
            Self::issue_command(sh, reg::ALL_POINTS_ON, on as u8)?;
            Self::issue_command(sh, reg::DISPLAY_ON_OFF, (!on) as u8)
        })
    }

    /// Switch the backlight LED. A session without a wired backlight pin
    /// accepts the call and does nothing.
    pub fn set_backlight(&self, on: bool) -> Result<(), DisplayError> {
        self.shared.lock(|cell| {
            if let Some(pin) = cell.borrow_mut().backlight.as_mut() {
                pin.set_state(on);
            }
            Ok(())
        })
    }

    /// Dispatch a numeric control command with a one-byte argument.
    ///
    /// Codes come from [`ennea_core::display::control`]; anything else is
    /// [`DisplayError::UnknownCommand`]. Argument validation happens in
    /// the typed setters, before any bus traffic.
    pub fn control(&self, code: u16, arg: u8) -> Result<(), DisplayError> {
        match code {
            control::CONTRAST => self.set_contrast(arg),
            control::REFRESH_RATE => self.set_refresh_rate(arg),
            control::INVERT => self.set_inverted(arg != 0),
            control::POWER_SAVE => self.set_power_save(arg != 0),
            control::BACKLIGHT => self.set_backlight(arg != 0),
            _ => Err(DisplayError::UnknownCommand),
        }
    }

    /// Tear down the session, returning the bus and pins.
    ///
    /// Chip-select is parked high on the way out.
    pub fn release(self) -> (BUS, PIN, Option<PIN>) {
        let mut sh = self.shared.into_inner().into_inner();
        sh.cs.set_high();
        (sh.bus, sh.cs, sh.backlight)
    }

    /// Issue a one-word command: `base | (arg & mask)`.
    fn issue_command(sh: &mut Shared<BUS, PIN>, reg: Reg, arg: u8) -> Result<(), DisplayError> {
        sh.cmd_buf.reset();
        sh.cmd_buf.push(TAG_COMMAND, &[reg.base | (arg & reg.mask)]);
        Self::flush_command(sh)
    }

    /// Issue a two-word compound command as one atomic transfer.
    ///
    /// The controller treats the pair as a unit: splitting it across
    /// transfers would let another command slip between base and argument
    /// and derail its protocol state.
    fn issue_compound(sh: &mut Shared<BUS, PIN>, reg: Reg, arg: u8) -> Result<(), DisplayError> {
        sh.cmd_buf.reset();
        sh.cmd_buf.push(TAG_COMMAND, &[reg.base, arg & reg.mask]);
        Self::flush_command(sh)
    }

    /// Send the command buffer under its own chip-select bracket.
    fn flush_command(sh: &mut Shared<BUS, PIN>) -> Result<(), DisplayError> {
        sh.cs.set_low();
        let res = sh.bus.transfer(sh.cmd_buf.words());
        sh.cs.set_high();
        res.map_err(|_| DisplayError::Bus)
    }

    /// Three-command cursor sequence. The controller latches the row
    /// before it accepts the column halves, so the order is fixed.
    fn jump_to(sh: &mut Shared<BUS, PIN>, x: u8, y: u8) -> Result<(), DisplayError> {
        Self::issue_command(sh, reg::LINE, y)?;
        Self::issue_command(sh, reg::COLUMN_MSB, x >> 4)?;
        Self::issue_command(sh, reg::COLUMN_LSB, x)
    }

    /// Stream `bytes` as data frames, one row-buffer chunk at a time.
    /// Chip-select is the caller's responsibility.
    fn write_ddram(sh: &mut Shared<BUS, PIN>, bytes: &[u8]) -> Result<(), DisplayError> {
        let mut sent = 0;
        while sent < bytes.len() {
            sh.row_buf.reset();
            sent += sh.row_buf.push(TAG_DATA, &bytes[sent..]);
            sh.bus
                .transfer(sh.row_buf.words())
                .map_err(|_| DisplayError::Bus)?;
        }
        Ok(())
    }

    /// Fill the row buffer with one line of blank data frames.
    fn load_blank_row(sh: &mut Shared<BUS, PIN>) {
        sh.row_buf.reset();
        sh.row_buf.push(TAG_DATA, &[0u8; COLUMNS]);
    }
}

impl<M, BUS, PIN, G> MonoDisplay for Ste2007<M, BUS, PIN, G>
where
    M: RawMutex,
    BUS: SpiWordBus,
    PIN: OutputPin,
    G: GlyphTable,
{
    fn init(&self) -> Result<(), DisplayError> {
        Ste2007::init(self)
    }

    fn clear(&self) -> Result<(), DisplayError> {
        Ste2007::clear(self)
    }

    fn clear_lines(&self, start: u8, end: u8) -> Result<(), DisplayError> {
        Ste2007::clear_lines(self, start, end)
    }

    fn draw_text(&self, line: u8, col: u8, text: &str) -> Result<(), DisplayError> {
        Ste2007::draw_text(self, line, col, text)
    }

    fn control(&self, code: u16, arg: u8) -> Result<(), DisplayError> {
        Ste2007::control(self, code, arg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::Font5x7;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use std::sync::{Arc, Mutex as StdMutex};
    use std::thread;
    use std::vec::Vec;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Pin(&'static str, bool),
        Transfer(Vec<u16>),
    }

    #[derive(Clone, Default)]
    struct Log(Arc<StdMutex<Vec<Event>>>);

    impl Log {
        fn record(&self, ev: Event) {
            self.0.lock().unwrap().push(ev);
        }

        fn events(&self) -> Vec<Event> {
            self.0.lock().unwrap().clone()
        }

        fn forget(&self) {
            self.0.lock().unwrap().clear();
        }
    }

    struct MockBus {
        log: Log,
        fail: bool,
    }

    impl SpiWordBus for MockBus {
        type Error = ();

        fn transfer(&mut self, words: &[u16]) -> Result<(), ()> {
            if self.fail {
                return Err(());
            }
            self.log.record(Event::Transfer(words.to_vec()));
            Ok(())
        }
    }

    struct MockPin {
        log: Log,
        name: &'static str,
    }

    impl OutputPin for MockPin {
        fn set_high(&mut self) {
            self.log.record(Event::Pin(self.name, true));
        }

        fn set_low(&mut self) {
            self.log.record(Event::Pin(self.name, false));
        }
    }

    type Display = Ste2007<CriticalSectionRawMutex, MockBus, MockPin, Font5x7>;

    fn display(log: &Log, config: Ste2007Config) -> Display {
        display_with(log, config, false, false)
    }

    fn display_with(log: &Log, config: Ste2007Config, fail: bool, backlight: bool) -> Display {
        let d = Ste2007::new(
            MockBus {
                log: log.clone(),
                fail,
            },
            MockPin {
                log: log.clone(),
                name: "cs",
            },
            backlight.then(|| MockPin {
                log: log.clone(),
                name: "backlight",
            }),
            Font5x7,
            config,
        );
        log.forget(); // drop the pin parking from new()
        d
    }

    fn select() -> Event {
        Event::Pin("cs", false)
    }

    fn deselect() -> Event {
        Event::Pin("cs", true)
    }

    fn xfer(words: &[u16]) -> Event {
        Event::Transfer(words.to_vec())
    }

    fn push_command(out: &mut Vec<Event>, word: u16) {
        out.push(select());
        out.push(xfer(&[word]));
        out.push(deselect());
    }

    fn push_cursor(out: &mut Vec<Event>, x: u8, y: u8) {
        push_command(out, 0x00B0 | u16::from(y & 0x0F));
        push_command(out, 0x0010 | u16::from((x >> 4) & 0x07));
        push_command(out, u16::from(x & 0x0F));
    }

    fn blank_row() -> Vec<u16> {
        vec![0x0100; COLUMNS]
    }

    fn glyph_events(text: &str) -> Vec<Event> {
        text.chars()
            .map(|ch| {
                xfer(
                    &Font5x7
                        .glyph(ch)
                        .iter()
                        .map(|&b| 0x0100 | u16::from(b))
                        .collect::<Vec<u16>>(),
                )
            })
            .collect()
    }

    #[test]
    fn test_simple_command_is_one_masked_word() {
        let log = Log::default();
        let d = display(&log, Ste2007Config::default());
        d.set_contrast(16).unwrap();
        assert_eq!(log.events(), vec![select(), xfer(&[0x0090]), deselect()]);
    }

    #[test]
    fn test_compound_command_is_one_atomic_transfer() {
        let log = Log::default();
        let d = display(&log, Ste2007Config::default());
        d.set_refresh_rate(65).unwrap();
        assert_eq!(
            log.events(),
            vec![select(), xfer(&[0x00EF, 0x0003]), deselect()]
        );
    }

    #[test]
    fn test_cursor_is_three_discrete_commands_row_first() {
        let log = Log::default();
        let d = display(&log, Ste2007Config::default());
        d.set_cursor(0x2A, 3).unwrap();
        let mut expected = Vec::new();
        push_command(&mut expected, 0x00B3);
        push_command(&mut expected, 0x0012);
        push_command(&mut expected, 0x000A);
        assert_eq!(log.events(), expected);
    }

    #[test]
    fn test_bitmap_write_streams_in_row_sized_chunks() {
        let log = Log::default();
        let d = display(&log, Ste2007Config::default());
        let bytes: Vec<u8> = (0..200u16).map(|i| i as u8).collect();
        d.write_bitmap(&bytes).unwrap();

        let events = log.events();
        assert!(events.iter().all(|e| matches!(e, Event::Transfer(_))));
        let chunks: Vec<usize> = events
            .iter()
            .map(|e| match e {
                Event::Transfer(words) => words.len(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(chunks, vec![96, 96, 8]);

        // Every source byte arrives once, in order, tagged as data.
        let words: Vec<u16> = events
            .iter()
            .flat_map(|e| match e {
                Event::Transfer(words) => words.clone(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(words.len(), bytes.len());
        for (word, byte) in words.iter().zip(&bytes) {
            assert_eq!(*word, 0x0100 | u16::from(*byte));
        }
    }

    #[test]
    fn test_chip_select_brackets_batched_bitmap_writes() {
        let log = Log::default();
        let d = display(&log, Ste2007Config::default());
        d.chip_select(true);
        d.write_bitmap(&[0x55]).unwrap();
        d.chip_select(false);
        assert_eq!(
            log.events(),
            vec![select(), xfer(&[0x0155]), deselect()]
        );
    }

    #[test]
    fn test_clear_homes_cursor_then_sends_nine_rows_in_one_bracket() {
        let log = Log::default();
        let d = display(&log, Ste2007Config::default());
        d.clear().unwrap();

        let mut expected = Vec::new();
        push_cursor(&mut expected, 0, 0);
        expected.push(select());
        for _ in 0..PAGES {
            expected.push(xfer(&blank_row()));
        }
        expected.push(deselect());
        assert_eq!(log.events(), expected);
    }

    #[test]
    fn test_clear_lines_walks_the_inclusive_range() {
        let log = Log::default();
        let d = display(&log, Ste2007Config::default());
        d.clear_lines(1, 3).unwrap();

        let mut expected = Vec::new();
        for line in 1..=3 {
            push_cursor(&mut expected, 0, line);
            expected.push(select());
            expected.push(xfer(&blank_row()));
            expected.push(deselect());
        }
        assert_eq!(log.events(), expected);
    }

    #[test]
    fn test_clear_lines_reversed_range_means_single_line() {
        let log_reversed = Log::default();
        display(&log_reversed, Ste2007Config::default())
            .clear_lines(5, 2)
            .unwrap();

        let log_single = Log::default();
        display(&log_single, Ste2007Config::default())
            .clear_lines(5, 5)
            .unwrap();

        assert_eq!(log_reversed.events(), log_single.events());
    }

    #[test]
    fn test_draw_text_streams_glyphs_under_one_bracket() {
        let log = Log::default();
        let d = display(&log, Ste2007Config::default());
        d.draw_text(0, 0, "Hi").unwrap();

        let mut expected = Vec::new();
        push_cursor(&mut expected, 0, 0);
        expected.push(select());
        expected.extend(glyph_events("Hi"));
        expected.push(deselect());
        assert_eq!(log.events(), expected);
    }

    #[test]
    fn test_draw_text_left_policy_blanks_leading_columns() {
        let log = Log::default();
        let d = display(
            &log,
            Ste2007Config {
                line_clear: LineClearPolicy::Left,
                ..Ste2007Config::default()
            },
        );
        d.draw_text(2, 12, "A").unwrap();

        let mut expected = Vec::new();
        push_cursor(&mut expected, 0, 2);
        expected.push(select());
        expected.push(xfer(&vec![0x0100; 12]));
        expected.push(deselect());
        push_cursor(&mut expected, 12, 2);
        expected.push(select());
        expected.extend(glyph_events("A"));
        expected.push(deselect());
        assert_eq!(log.events(), expected);
    }

    #[test]
    fn test_draw_text_right_policy_blanks_to_the_edge() {
        let log = Log::default();
        let d = display(
            &log,
            Ste2007Config {
                line_clear: LineClearPolicy::Right,
                ..Ste2007Config::default()
            },
        );
        d.draw_text(2, 90, "A").unwrap();

        let mut expected = Vec::new();
        push_cursor(&mut expected, 90, 2);
        expected.push(select());
        expected.push(xfer(&vec![0x0100; 6]));
        expected.push(deselect());
        push_cursor(&mut expected, 90, 2);
        expected.push(select());
        expected.extend(glyph_events("A"));
        expected.push(deselect());
        assert_eq!(log.events(), expected);
    }

    #[test]
    fn test_draw_text_both_policy_clears_the_line_first() {
        let log = Log::default();
        let d = display(
            &log,
            Ste2007Config {
                line_clear: LineClearPolicy::Both,
                ..Ste2007Config::default()
            },
        );
        d.draw_text(4, 6, "A").unwrap();

        let mut expected = Vec::new();
        push_cursor(&mut expected, 0, 4);
        expected.push(select());
        expected.push(xfer(&blank_row()));
        expected.push(deselect());
        push_cursor(&mut expected, 6, 4);
        expected.push(select());
        expected.extend(glyph_events("A"));
        expected.push(deselect());
        assert_eq!(log.events(), expected);
    }

    #[test]
    fn test_init_issues_the_bring_up_sequence_in_order() {
        let log = Log::default();
        let d = display(&log, Ste2007Config::default());
        d.init().unwrap();

        let mut expected = Vec::new();
        push_command(&mut expected, 0x00E2); // reset
        push_command(&mut expected, 0x00A4); // all-points-on off
        push_command(&mut expected, 0x002F); // power control max
        push_command(&mut expected, 0x00AF); // display on
        push_command(&mut expected, 0x00C0); // common direction normal
        push_command(&mut expected, 0x00A0); // segment direction normal
        push_command(&mut expected, 0x0090); // contrast 16
        push_cursor(&mut expected, 0, 0); // full clear, lock released
        expected.push(select());
        for _ in 0..PAGES {
            expected.push(xfer(&blank_row()));
        }
        expected.push(deselect());
        expected.push(select()); // refresh rate 65 Hz, compound
        expected.push(xfer(&[0x00EF, 0x0003]));
        expected.push(deselect());
        expected.push(select()); // charge pump 5x, compound
        expected.push(xfer(&[0x003D, 0x0000]));
        expected.push(deselect());
        push_command(&mut expected, 0x0036); // bias 1/4
        expected.push(select()); // VOP, compound
        expected.push(xfer(&[0x00E1, 0x0000]));
        expected.push(deselect());
        push_command(&mut expected, 0x00A6); // display-reverse off
        assert_eq!(log.events(), expected);
    }

    #[test]
    fn test_contrast_out_of_range_is_rejected_before_any_transfer() {
        let log = Log::default();
        let d = display(&log, Ste2007Config::default());
        assert_eq!(d.set_contrast(32), Err(DisplayError::OutOfRange));
        assert!(log.events().is_empty());
    }

    #[test]
    fn test_refresh_rate_outside_the_supported_set_is_rejected() {
        let log = Log::default();
        let d = display(&log, Ste2007Config::default());
        assert_eq!(d.set_refresh_rate(72), Err(DisplayError::OutOfRange));
        assert!(log.events().is_empty());

        d.set_refresh_rate(80).unwrap();
        assert_eq!(
            log.events(),
            vec![select(), xfer(&[0x00EF, 0x0000]), deselect()]
        );
    }

    #[test]
    fn test_control_dispatches_known_codes_and_rejects_the_rest() {
        let log = Log::default();
        let d = display(&log, Ste2007Config::default());

        d.control(control::CONTRAST, 20).unwrap();
        assert_eq!(log.events(), vec![select(), xfer(&[0x0094]), deselect()]);

        log.forget();
        assert_eq!(d.control(0x00FF, 0), Err(DisplayError::UnknownCommand));
        assert!(log.events().is_empty());
    }

    #[test]
    fn test_power_save_pairs_all_points_on_with_display_off() {
        let log = Log::default();
        let d = display(&log, Ste2007Config::default());

        d.set_power_save(true).unwrap();
        let mut expected = Vec::new();
        push_command(&mut expected, 0x00A5);
        push_command(&mut expected, 0x00AE);
        assert_eq!(log.events(), expected);

        log.forget();
        d.set_power_save(false).unwrap();
        let mut expected = Vec::new();
        push_command(&mut expected, 0x00A4);
        push_command(&mut expected, 0x00AF);
        assert_eq!(log.events(), expected);
    }

    #[test]
    fn test_invert_sets_display_reverse() {
        let log = Log::default();
        let d = display(&log, Ste2007Config::default());
        d.set_inverted(true).unwrap();
        d.set_inverted(false).unwrap();
        let mut expected = Vec::new();
        push_command(&mut expected, 0x00A7);
        push_command(&mut expected, 0x00A6);
        assert_eq!(log.events(), expected);
    }

    #[test]
    fn test_backlight_follows_the_argument_when_wired() {
        let log = Log::default();
        let d = display_with(&log, Ste2007Config::default(), false, true);
        d.set_backlight(true).unwrap();
        d.set_backlight(false).unwrap();
        assert_eq!(
            log.events(),
            vec![
                Event::Pin("backlight", true),
                Event::Pin("backlight", false)
            ]
        );
    }

    #[test]
    fn test_backlight_without_a_pin_is_an_accepted_no_op() {
        let log = Log::default();
        let d = display(&log, Ste2007Config::default());
        d.set_backlight(true).unwrap();
        assert!(log.events().is_empty());
    }

    #[test]
    fn test_bus_failure_aborts_init_and_leaves_cs_deselected() {
        let log = Log::default();
        let d = display_with(&log, Ste2007Config::default(), true, false);
        assert_eq!(d.init(), Err(DisplayError::Bus));
        // The first command bracket opened and closed; nothing else ran.
        assert_eq!(log.events(), vec![select(), deselect()]);
    }

    #[test]
    fn test_release_parks_chip_select_high() {
        let log = Log::default();
        let d = display(&log, Ste2007Config::default());
        let (_bus, _cs, backlight) = d.release();
        assert!(backlight.is_none());
        assert_eq!(log.events(), vec![deselect()]);
    }

    #[test]
    fn test_bus_config_describes_the_nine_bit_link() {
        let cfg = Display::bus_config();
        assert_eq!(cfg.data_bits, 9);
        assert_eq!(cfg.frequency, 1_000_000);
        assert_eq!(cfg.mode, Mode::Mode0);
    }

    #[test]
    fn test_concurrent_draws_never_interleave_on_the_wire() {
        fn transcript(line: u8, text: &'static str) -> Vec<Event> {
            let log = Log::default();
            display(&log, Ste2007Config::default())
                .draw_text(line, 0, text)
                .unwrap();
            log.events()
        }

        let expected_a = transcript(1, "aaaa");
        let expected_b = transcript(2, "bbbb");

        let log = Log::default();
        let d = Arc::new(display(&log, Ste2007Config::default()));
        let d1 = Arc::clone(&d);
        let d2 = Arc::clone(&d);
        let t1 = thread::spawn(move || d1.draw_text(1, 0, "aaaa").unwrap());
        let t2 = thread::spawn(move || d2.draw_text(2, 0, "bbbb").unwrap());
        t1.join().unwrap();
        t2.join().unwrap();

        let events = log.events();
        let mut a_then_b = expected_a.clone();
        a_then_b.extend(expected_b.iter().cloned());
        let mut b_then_a = expected_b;
        b_then_a.extend(expected_a);
        assert!(events == a_then_b || events == b_then_a);
    }
}
