//! The decoding session: writer, tallies, indent, configuration.

use core::fmt::{self, Display, Write};

/// Column at which field values start in the trace output.
const FIELD_COLUMN_WIDTH: usize = 36;

/// Target-architecture compatibility masks.
///
/// Structure types declare the architectures they may appear on as a union
/// of these bits; a session carries the mask of the architecture family it
/// is checking for.
pub mod arch {
    pub const IA32: u8 = 1 << 0;
    pub const X64: u8 = 1 << 1;
    pub const ARM: u8 = 1 << 2;
    pub const AARCH64: u8 = 1 << 3;
    pub const ANY: u8 = IA32 | X64 | ARM | AARCH64;

    /// The compile target's architecture family.
    pub const fn native() -> u8 {
        if cfg!(any(target_arch = "x86", target_arch = "x86_64")) {
            IA32 | X64
        } else if cfg!(any(target_arch = "arm", target_arch = "aarch64")) {
            ARM | AARCH64
        } else {
            ANY
        }
    }
}

/// Per-run configuration, set once when the session is created.
#[derive(Clone, Copy, Debug)]
pub struct Options {
    /// Emit the field-by-field trace.
    pub trace: bool,
    /// Cross-check declared field offsets and run semantic field validators.
    pub consistency_checks: bool,
    /// Architecture mask structures are validated against.
    pub arch: u8,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            trace: true,
            consistency_checks: true,
            arch: arch::native(),
        }
    }
}

/// State shared by every decoding step of one table pass.
///
/// The session owns the trace writer, the error and warning tallies, and the
/// current indent depth. Counters accumulate across calls until explicitly
/// reset, letting the caller total up a table pass before moving to the
/// next buffer.
pub struct Session<'w> {
    out: &'w mut dyn fmt::Write,
    options: Options,
    pub(crate) indent: u32,
    errors: u32,
    warnings: u32,
}

impl<'w> Session<'w> {
    pub fn new(out: &'w mut dyn fmt::Write, options: Options) -> Self {
        Self {
            out,
            options,
            indent: 0,
            errors: 0,
            warnings: 0,
        }
    }

    pub fn options(&self) -> Options {
        self.options
    }

    pub fn error_count(&self) -> u32 {
        self.errors
    }

    pub fn warning_count(&self) -> u32 {
        self.warnings
    }

    pub fn reset_error_count(&mut self) {
        self.errors = 0;
    }

    pub fn reset_warning_count(&mut self) {
        self.warnings = 0;
    }

    /// Tally an error and write it as a line of its own.
    pub fn error(&mut self, message: fmt::Arguments) -> fmt::Result {
        self.errors += 1;
        writeln!(self.out, "ERROR: {message}")
    }

    /// Tally an error and write it into the current trace line.
    pub fn error_inline(&mut self, message: fmt::Arguments) -> fmt::Result {
        self.errors += 1;
        write!(self.out, "\nERROR: {message}")
    }

    /// Tally a warning and write it into the current trace line.
    pub fn warning_inline(&mut self, message: fmt::Arguments) -> fmt::Result {
        self.warnings += 1;
        write!(self.out, "\nWARNING: {message}")
    }

    /// Write an indented field label padded out to the value column,
    /// followed by `" : "`.
    ///
    /// `indent` is added to the session's current indent depth, so the total
    /// indent depends on the nesting level of the enclosing decode.
    pub fn field_name(&mut self, indent: u32, name: &dyn Display) -> fmt::Result {
        self.pad_to_column(self.indent + indent, name)?;
        self.out.write_str(" : ")
    }

    /// Write an indented structure name heading a block of fields.
    pub(crate) fn struct_name(&mut self, name: &dyn Display) -> fmt::Result {
        self.pad_to_column(self.indent, name)?;
        self.out.write_str(" :\n")
    }

    fn pad_to_column(&mut self, lead: u32, name: &dyn Display) -> fmt::Result {
        let lead = lead as usize;
        write!(self.out, "{:lead$}", "")?;

        let mut counted = CountWriter {
            inner: &mut *self.out,
            written: 0,
        };
        write!(counted, "{name}")?;

        let used = lead + counted.written;
        let fill = FIELD_COLUMN_WIDTH.saturating_sub(used);
        write!(self.out, "{:fill$}", "")
    }
}

/// Custom formatters and structure handlers write through the session.
impl fmt::Write for Session<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.out.write_str(s)
    }
}

/// Measures what passes through on the way to the label column.
struct CountWriter<'a> {
    inner: &'a mut dyn fmt::Write,
    written: usize,
}

impl fmt::Write for CountWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.written += s.chars().count();
        self.inner.write_str(s)
    }
}

#[cfg(feature = "std")]
extern crate std;

/// Adapts an `io::Write` sink into the `fmt::Write` the session expects.
///
/// _Requires Cargo feature `std`._
#[cfg(feature = "std")]
pub struct IoWriter<W: std::io::Write>(pub W);

#[cfg(feature = "std")]
impl<W: std::io::Write> fmt::Write for IoWriter<W> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.write_all(s.as_bytes()).map_err(|_| fmt::Error)
    }
}
