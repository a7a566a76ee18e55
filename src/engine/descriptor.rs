//! The declarative field-descriptor model.

use core::fmt;

use zerocopy::FromBytes;

use crate::engine::session::Session;
use crate::engine::validate::FieldValidator;

/// Number of capture slots available to one descriptor table.
pub const CAPTURE_SLOTS: usize = 4;

/// Renders one field itself, for irregular encodings the width-dispatched
/// renderers cannot express.
pub type Formatter = fn(&mut Session<'_>, &[u8]) -> fmt::Result;

/// How a field's bytes are rendered in the trace.
#[derive(Clone, Copy)]
pub enum FieldFormat {
    /// Little-endian unsigned integer, hexadecimal. Field width must be
    /// 1, 2, 4, or 8 bytes.
    Hex,
    /// Little-endian unsigned integer, decimal. Field width must be
    /// 1, 2, 4, or 8 bytes.
    Dec,
    /// A run of characters, printed byte-for-byte. Any width.
    Chars,
    /// Formatter callback owning the rendering of this field.
    Custom(Formatter),
}

/// One fixed-position, fixed-width field within a structure layout.
///
/// Descriptor tables are ordered slices of these, consumed top to bottom.
/// The declared `offset` is used only as a cross-check against the running
/// cursor; addressing is always sequential.
#[derive(Clone, Copy)]
pub struct FieldDescriptor {
    /// Display label. Fields without one are never traced, though they may
    /// still be captured.
    pub name: Option<&'static str>,
    /// Width in bytes. 1, 2, 4, and 8 decode as little-endian integers;
    /// other widths must use [`FieldFormat::Chars`] or a custom formatter.
    pub length: u8,
    /// Offset this field is declared to start at.
    pub offset: u32,
    pub format: FieldFormat,
    /// Capture slot receiving this field's bytes after decoding.
    pub capture: Option<usize>,
    /// Semantic check applied when consistency checking is enabled.
    pub validator: Option<FieldValidator>,
}

impl FieldDescriptor {
    pub const fn new(
        name: &'static str,
        length: u8,
        offset: u32,
        format: FieldFormat,
    ) -> Self {
        Self {
            name: Some(name),
            length,
            offset,
            format,
            capture: None,
            validator: None,
        }
    }

    /// A field that is captured or skipped over but never traced.
    pub const fn unnamed(length: u8, offset: u32) -> Self {
        Self {
            name: None,
            length,
            offset,
            format: FieldFormat::Hex,
            capture: None,
            validator: None,
        }
    }

    pub const fn capture(mut self, slot: usize) -> Self {
        self.capture = Some(slot);
        self
    }

    pub const fn validate(mut self, validator: FieldValidator) -> Self {
        self.validator = Some(validator);
        self
    }
}

/// Field slices captured by one [`decode`](crate::engine::decode) call.
///
/// Slots borrow from the decoded buffer; a slot belonging to a field that
/// fell outside the buffer is absent.
#[derive(Clone, Copy, Default)]
pub struct Captures<'a> {
    slots: [Option<&'a [u8]>; CAPTURE_SLOTS],
}

impl<'a> Captures<'a> {
    pub(crate) fn set(&mut self, slot: usize, bytes: &'a [u8]) {
        if let Some(entry) = self.slots.get_mut(slot) {
            *entry = Some(bytes);
        }
    }

    /// The raw bytes of the field captured into `slot`.
    pub fn bytes(&self, slot: usize) -> Option<&'a [u8]> {
        self.slots.get(slot).copied().flatten()
    }

    pub fn u8(&self, slot: usize) -> Option<u8> {
        match self.bytes(slot)? {
            [b] => Some(*b),
            _ => None,
        }
    }

    pub fn u16(&self, slot: usize) -> Option<u16> {
        let bytes = self.bytes(slot)?;
        Some(zerocopy::little_endian::U16::read_from_bytes(bytes).ok()?.get())
    }

    pub fn u32(&self, slot: usize) -> Option<u32> {
        let bytes = self.bytes(slot)?;
        Some(zerocopy::little_endian::U32::read_from_bytes(bytes).ok()?.get())
    }
}
