//! Display capability trait and shared session types
//!
//! Concrete drivers in `ennea-drivers` implement [`MonoDisplay`]; host
//! frameworks that used to dispatch through a function-pointer table select
//! a driver through this trait instead.

/// Errors reported by display operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayError {
    /// The bus transfer failed; the enclosing operation is abandoned
    Bus,
    /// An argument was rejected before any transfer was attempted
    OutOfRange,
    /// A control code the driver does not recognize
    UnknownCommand,
}

/// How a text draw blanks the rest of its line before rendering.
///
/// Fixed per session: the policy is latched when the driver is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineClearPolicy {
    /// Leave the line as it is
    #[default]
    None,
    /// Blank pixel columns left of the text start
    Left,
    /// Blank pixel columns from the text start to the right edge
    Right,
    /// Blank the whole line before drawing
    Both,
}

/// Control command codes accepted by [`MonoDisplay::control`].
///
/// Codes outside this table are reported as
/// [`DisplayError::UnknownCommand`].
pub mod control {
    /// Set contrast; argument 0-31
    pub const CONTRAST: u16 = 0;
    /// Set refresh rate; argument is one of 65, 70, 75, 80 (Hz)
    pub const REFRESH_RATE: u16 = 1;
    /// Invert the display; argument 0 or nonzero
    pub const INVERT: u16 = 2;
    /// Enter or leave power-save mode; argument 0 or nonzero
    pub const POWER_SAVE: u16 = 3;
    /// Switch the backlight; argument 0 or nonzero
    pub const BACKLIGHT: u16 = 4;
}

/// Fixed-width glyph bitmap lookup.
///
/// An external asset as far as the protocol engine is concerned: the engine
/// streams whatever byte columns the table hands back. Implementations map
/// characters outside their range to the blank glyph rather than failing.
pub trait GlyphTable {
    /// Byte columns for `ch`, left to right.
    fn glyph(&self, ch: char) -> &[u8];
}

/// A text-oriented monochrome display session.
///
/// Methods take `&self`: a session serializes its callers internally behind
/// its own lock, so shared references are the natural calling convention
/// for concurrent use.
pub trait MonoDisplay {
    /// Run the controller bring-up sequence.
    fn init(&self) -> Result<(), DisplayError>;

    /// Blank the entire display RAM.
    fn clear(&self) -> Result<(), DisplayError>;

    /// Blank lines `start..=end`; `end < start` blanks `start` alone.
    fn clear_lines(&self, start: u8, end: u8) -> Result<(), DisplayError>;

    /// Render `text` at (`col` pixel column, `line`), applying the
    /// session's [`LineClearPolicy`] first.
    fn draw_text(&self, line: u8, col: u8, text: &str) -> Result<(), DisplayError>;

    /// Dispatch a numeric control command with a one-byte argument.
    fn control(&self, code: u16, arg: u8) -> Result<(), DisplayError>;
}
